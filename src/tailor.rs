// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Line tailoring engine.
//!
//! __Tailoring__ turns one canonical source file into the variant that
//! belongs either in the sync store, or on a specific device. Each line is
//! processed in file order:
//!
//! 1. Variables are substituted, see [`vars`].
//! 2. The line is checked for a directive, see [`directive`].
//! 3. A single-line directive naming the device toggles its own line.
//! 4. Otherwise, a line inside an open region of the device is toggled with
//!    the region's comment token and indentation, see [`region`].
//! 5. Anything else passes through with only its variables substituted.
//!
//! Toward the store, toggling comments lines out. Toward the device,
//! toggling uncomments them. Tailoring toward the store and then back toward
//! the same device reproduces the original text byte for byte.
//!
//! Line endings are preserved exactly as they appear in the source.

pub mod directive;
pub mod region;
pub mod vars;

use crate::tailor::{
    directive::{Directive, DirectiveKind},
    region::{span_indent, toggle, Indent, Region, RegionTracker},
    vars::{ScopedVars, Substitutions, VarTarget},
};

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, warn};

/// Direction of a tailoring operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Backup: abstract values into variables, comment out device lines.
    ToStore,

    /// Restore or status: concretize variables, uncomment device lines.
    ToDevice,
}

impl Display for Direction {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ToStore => fmt.write_str("toward store"),
            Self::ToDevice => fmt.write_str("toward device"),
        }
    }
}

/// Tailor source text for a device.
///
/// Resolves file content variables from `vars`, then tailors `source` in
/// `direction` for `device`.
///
/// # Errors
///
/// - Return [`TailorError::UnterminatedRegion`] if a region of the device is
///   never closed.
/// - Return [`TailorError::UnexpectedRegionEnd`] if a region end of the
///   device shows up with no open region.
pub fn tailor(
    source: &str,
    device: &str,
    direction: Direction,
    vars: &ScopedVars<'_>,
) -> Result<String> {
    Tailor::new(device, direction, vars.resolve(VarTarget::FileContent)).tailor_str(source)
}

/// Output of tailoring raw file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tailored<'a> {
    /// Content was text, and has been tailored.
    Text(String),

    /// Content cannot be decoded as text, and must be copied as is.
    Opaque(&'a [u8]),
}

impl Tailored<'_> {
    /// Treat tailored output as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Opaque(bytes) => bytes,
        }
    }

    /// Check if content was copied without tailoring.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }
}

/// Tailoring pass configured for one device and direction.
///
/// Holds no state between calls, so one instance can tailor any number of
/// files one after another.
#[derive(Debug, Clone)]
pub struct Tailor {
    device: String,
    direction: Direction,
    substitutions: Substitutions,
}

impl Tailor {
    /// Construct new tailoring pass.
    pub fn new(
        device: impl Into<String>,
        direction: Direction,
        substitutions: Substitutions,
    ) -> Self {
        Self {
            device: device.into(),
            direction,
            substitutions,
        }
    }

    /// Tailor raw file content.
    ///
    /// Content that is not valid UTF-8 is handed back untouched as
    /// [`Tailored::Opaque`].
    ///
    /// # Errors
    ///
    /// - Same as [`Tailor::tailor_str`].
    pub fn tailor_bytes<'a>(&self, source: &'a [u8]) -> Result<Tailored<'a>> {
        match std::str::from_utf8(source) {
            Ok(text) => self.tailor_str(text).map(Tailored::Text),
            Err(err) => {
                debug!("content is not text, copy as is: {err}");
                Ok(Tailored::Opaque(source))
            }
        }
    }

    /// Tailor source text.
    ///
    /// # Errors
    ///
    /// - Return [`TailorError::UnterminatedRegion`] if a region of the device
    ///   is never closed.
    /// - Return [`TailorError::UnexpectedRegionEnd`] if a region end of the
    ///   device shows up with no open region.
    pub fn tailor_str(&self, source: &str) -> Result<String> {
        let lines = self.scan(source);
        let mut tracker = RegionTracker::new();
        let mut tailored = String::with_capacity(source.len());

        for (idx, line) in lines.iter().enumerate() {
            let number = idx + 1;
            match &line.active {
                Some(directive) if directive.kind == DirectiveKind::Single => {
                    let indent = Indent::of(&line.content);
                    tailored.push_str(&toggle(
                        &line.content,
                        &directive.token,
                        &indent,
                        self.direction,
                    ));
                }
                Some(directive) if directive.kind == DirectiveKind::Begin => {
                    let span = lines[idx..]
                        .iter()
                        .map(|line| (line.content.as_str(), line.active_kind()));
                    let indent =
                        span_indent(span).ok_or_else(|| TailorError::UnterminatedRegion {
                            line: number,
                            token: directive.token.clone(),
                        })?;
                    let column = indent.width();
                    tracker.enter(Region {
                        token: directive.token.clone(),
                        indent,
                        begin_line: number,
                    });
                    debug!(
                        "line {number}: enter region {:?} at column {column}, depth {}",
                        directive.token,
                        tracker.depth()
                    );
                    tailored.push_str(&line.content);
                }
                Some(directive) => {
                    if tracker.leave().is_none() {
                        return Err(TailorError::UnexpectedRegionEnd {
                            line: number,
                            token: directive.token.clone(),
                        });
                    }
                    debug!(
                        "line {number}: leave region {:?}, depth {}",
                        directive.token,
                        tracker.depth()
                    );
                    tailored.push_str(&line.content);
                }
                None => match tracker.current() {
                    Some(region) => tailored.push_str(&toggle(
                        &line.content,
                        &region.token,
                        &region.indent,
                        self.direction,
                    )),
                    None => tailored.push_str(&line.content),
                },
            }
            tailored.push_str(line.ending);
        }

        if let Some(region) = tracker.unterminated() {
            return Err(TailorError::UnterminatedRegion {
                line: region.begin_line,
                token: region.token.clone(),
            });
        }

        Ok(tailored)
    }

    /// Substitute variables and classify every line of source text.
    fn scan<'s>(&self, source: &'s str) -> Vec<ScannedLine<'s>> {
        split_lines(source)
            .enumerate()
            .map(|(idx, (content, ending))| {
                let content = self
                    .substitutions
                    .apply(content, self.direction)
                    .into_owned();
                let active = Directive::parse(&content, &self.substitutions)
                    .filter(|directive| {
                        if directive.is_inert() {
                            warn!("line {}: directive names no device, ignoring it", idx + 1);
                            return false;
                        }
                        directive.applies_to(&self.device)
                    });

                ScannedLine {
                    content,
                    ending,
                    active,
                }
            })
            .collect()
    }
}

/// Line with variables substituted, and its directive if it names the device.
#[derive(Debug)]
struct ScannedLine<'s> {
    content: String,
    ending: &'s str,
    active: Option<Directive>,
}

impl ScannedLine<'_> {
    fn active_kind(&self) -> Option<DirectiveKind> {
        self.active.as_ref().map(|directive| directive.kind)
    }
}

/// Split text into line content and line ending pairs.
///
/// Recognizes `\n` and `\r\n` endings. The last line may have no ending.
fn split_lines(source: &str) -> impl Iterator<Item = (&str, &str)> {
    source.split_inclusive('\n').map(|line| {
        if let Some(content) = line.strip_suffix("\r\n") {
            (content, "\r\n")
        } else if let Some(content) = line.strip_suffix('\n') {
            (content, "\n")
        } else {
            (line, "")
        }
    })
}

/// Tailoring error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TailorError {
    /// Region begun but never ended.
    #[error("region {token:?} begun at line {line} but not ended")]
    UnterminatedRegion { line: usize, token: String },

    /// Region ended without being begun.
    #[error("region {token:?} ended at line {line} but never begun")]
    UnexpectedRegionEnd { line: usize, token: String },
}

impl TailorError {
    /// One-based line number the error points at.
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedRegion { line, .. } | Self::UnexpectedRegionEnd { line, .. } => *line,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = TailorError> = std::result::Result<T, E>;
