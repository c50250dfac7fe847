// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Inline directive parsing.
//!
//! A __directive__ is a marker embedded in an ordinary line of a tracked file
//! that tells filetailor which devices a line, or a range of lines, belongs
//! to. Directives hide inside the comment syntax of whatever file they live
//! in, so the comment token is whatever run of non-whitespace characters sits
//! right before the opening brace:
//!
//! ```text
//! alias ls='ls --color' #{filetailor laptop desktop}
//! //{begin filetailor laptop}
//! ...
//! //{end filetailor laptop}
//! ```
//!
//! The first line is a single-line directive using `#` as its comment token.
//! The last two lines delimit a region using `//` as its comment token.
//!
//! Only the first directive on a line is recognized.

use crate::tailor::vars::Substitutions;

use regex::Regex;
use std::sync::LazyLock;

/// Directive grammar.
///
/// - Group 1: comment token.
/// - Group 2: region keyword, i.e., `begin `, `end `, or nothing.
/// - Group 3: device list, up to the first closing brace.
static DIRECTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\S*)\{(begin |end |)filetailor (.*?)\}").expect("invalid directive regex")
});

/// What a directive does to the lines it guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Toggle the directive's own line only.
    Single,

    /// Open a region that toggles every line up to its matching end.
    Begin,

    /// Close the innermost open region.
    End,
}

/// Directive parsed from a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Literal text preceding the opening brace, e.g., `//` or `#`.
    pub token: String,

    /// Kind of directive.
    pub kind: DirectiveKind,

    /// Devices the directive applies to, with variables concretized.
    pub devices: Vec<String>,
}

impl Directive {
    /// Parse first directive found in line.
    ///
    /// Device names may be given through variables, so each device token is
    /// concretized through `substitutions` and split on whitespace again,
    /// which lets one variable expand into several devices.
    ///
    /// Returns `None` if line carries no directive.
    pub fn parse(line: &str, substitutions: &Substitutions) -> Option<Self> {
        let captures = DIRECTIVE_PATTERN.captures(line)?;
        let token = captures.get(1).map_or("", |m| m.as_str()).to_owned();
        let kind = match captures.get(2).map_or("", |m| m.as_str()) {
            "begin " => DirectiveKind::Begin,
            "end " => DirectiveKind::End,
            _ => DirectiveKind::Single,
        };
        let devices = captures
            .get(3)
            .map_or("", |m| m.as_str())
            .split_whitespace()
            .flat_map(|device| {
                substitutions
                    .concretize(device)
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect();

        Some(Self {
            token,
            kind,
            devices,
        })
    }

    /// Check if directive names target device.
    ///
    /// Matching is exact string membership.
    pub fn applies_to(&self, device: &str) -> bool {
        self.devices.iter().any(|name| name == device)
    }

    /// Check if directive lists no device at all.
    pub fn is_inert(&self) -> bool {
        self.devices.is_empty()
    }
}
