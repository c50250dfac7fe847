// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Variable resolution.
//!
//! Tracked files can abstract device specific values into __variables__. A
//! variable is just a name that stands in for a concrete value, e.g.,
//! `HOME_DIR` standing in for `/home/alice`. The sync store only ever holds
//! the variable name, while each device holds its own concrete value.
//!
//! # Variable Scopes
//!
//! Variables are declared in three scopes: the global default scope, the
//! device scope, and the file scope. Each scope carries three tables:
//!
//! - `vars`: common variables applied to both file content and configuration
//!   values.
//! - `file_only`: variables applied to file content only.
//! - `config_only`: variables applied to configuration values only.
//!
//! Lookup precedence is file scope over device scope over default scope.
//! Common variables are always layered beneath the target specific tables.

use crate::tailor::Direction;

use serde::Deserialize;
use std::{borrow::Cow, collections::BTreeMap};
use tracing::trace;

/// Mapping of variable name to its concrete value.
pub type VarTable = BTreeMap<String, String>;

/// Variable tables of a single scope.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default)]
pub struct VarScope {
    /// Common variables.
    pub vars: VarTable,

    /// Variables applied to file content only.
    pub file_only: VarTable,

    /// Variables applied to configuration values only.
    pub config_only: VarTable,
}

impl VarScope {
    /// Construct new scope with common variables only.
    pub fn with_vars(
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ..Default::default()
        }
    }

    fn target_table(&self, target: VarTarget) -> &VarTable {
        match target {
            VarTarget::FileContent => &self.file_only,
            VarTarget::Config => &self.config_only,
        }
    }
}

/// What resolved variables will be substituted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarTarget {
    /// Lines of a tracked file.
    FileContent,

    /// String values of the configuration file.
    Config,
}

/// The three variable scopes of one tailoring operation.
///
/// Any scope may be absent, which simply contributes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopedVars<'a> {
    pub default: Option<&'a VarScope>,
    pub device: Option<&'a VarScope>,
    pub file: Option<&'a VarScope>,
}

impl<'a> ScopedVars<'a> {
    /// Construct new scope triple.
    pub fn new(
        default: Option<&'a VarScope>,
        device: Option<&'a VarScope>,
        file: Option<&'a VarScope>,
    ) -> Self {
        Self {
            default,
            device,
            file,
        }
    }

    /// Merge all scopes into one effective substitution mapping.
    ///
    /// Common tables go first from lowest to highest precedence, then the
    /// tables specific to `target` follow in the same order. Later entries
    /// overwrite earlier ones with the same name.
    pub fn resolve(&self, target: VarTarget) -> Substitutions {
        let scopes = [self.default, self.device, self.file];
        let mut merged = VarTable::new();

        for scope in scopes.iter().flatten() {
            merged.extend(scope.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        for scope in scopes.iter().flatten() {
            merged.extend(
                scope
                    .target_table(target)
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        Substitutions::new(merged)
    }
}

/// Ordered substitution pairs ready to be applied to text.
///
/// # Invariant
///
/// - Each needle is replaced in a single pass, so a value that contains its
///   own variable name cannot cause repeated expansion.
/// - Longer needles are applied first, ties are broken by variable name.
/// - Pairs whose needle would be empty are never applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Substitutions {
    concretize: Vec<(String, String)>,
    abstracted: Vec<(String, String)>,
}

impl Substitutions {
    /// Construct new substitutions from variable name to value pairs.
    pub fn new(table: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let pairs: Vec<(String, String)> = table
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let mut concretize: Vec<(String, String)> = pairs
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .cloned()
            .collect();
        concretize.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut abstracted: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (value, key))
            .collect();
        abstracted.sort_by(|(a, ak), (b, bk)| {
            b.len().cmp(&a.len()).then_with(|| ak.cmp(bk))
        });

        Self {
            concretize,
            abstracted,
        }
    }

    /// Check if there is nothing to substitute.
    pub fn is_empty(&self) -> bool {
        self.concretize.is_empty() && self.abstracted.is_empty()
    }

    /// Apply substitutions to text in the polarity of `direction`.
    ///
    /// Toward the store, concrete values are abstracted into their variable
    /// names. Toward the device, variable names are concretized into values.
    pub fn apply<'t>(&self, text: &'t str, direction: Direction) -> Cow<'t, str> {
        match direction {
            Direction::ToStore => replace_all(text, &self.abstracted),
            Direction::ToDevice => replace_all(text, &self.concretize),
        }
    }

    /// Replace variable names with their values regardless of direction.
    pub fn concretize<'t>(&self, text: &'t str) -> Cow<'t, str> {
        replace_all(text, &self.concretize)
    }
}

fn replace_all<'t>(text: &'t str, pairs: &[(String, String)]) -> Cow<'t, str> {
    let mut text = Cow::Borrowed(text);
    for (needle, replacement) in pairs {
        if text.contains(needle.as_str()) {
            trace!("substitute {needle:?} with {replacement:?}");
            text = Cow::Owned(text.replace(needle.as_str(), replacement));
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("export H=HOME_DIR", Direction::ToDevice, "export H=/home/alice"; "concretize")]
    #[test_case("export H=/home/alice", Direction::ToStore, "export H=HOME_DIR"; "abstracted")]
    #[test_case("no variables here", Direction::ToStore, "no variables here"; "untouched")]
    #[test]
    fn substitutions_apply(line: &str, direction: Direction, expect: &str) {
        let subs = Substitutions::new([("HOME_DIR", "/home/alice")]);
        pretty_assertions::assert_eq!(subs.apply(line, direction), expect);
    }

    #[test]
    fn substitutions_round_trip() {
        let subs = Substitutions::new([
            ("HOME_DIR", "/home/alice"),
            ("CODE_DIR", "/home/alice/code"),
            ("EDITOR_CMD", "nvim"),
        ]);
        let line = "cd /home/alice/code && nvim /home/alice/.bashrc\n";

        let stored = subs.apply(line, Direction::ToStore);
        pretty_assertions::assert_eq!(stored, "cd CODE_DIR && EDITOR_CMD HOME_DIR/.bashrc\n");

        let restored = subs.apply(&stored, Direction::ToDevice);
        pretty_assertions::assert_eq!(restored, line);
    }

    #[test]
    fn substitutions_prefer_longer_names() {
        let subs = Substitutions::new([("HOME", "/home/alice"), ("HOME_DIR", "/srv/alice")]);
        let result = subs.apply("HOME_DIR and HOME", Direction::ToDevice);
        pretty_assertions::assert_eq!(result, "/srv/alice and /home/alice");
    }

    #[test]
    fn substitutions_single_pass_per_name() {
        let subs = Substitutions::new([("NAME", "NAME NAME")]);
        let result = subs.apply("hello NAME", Direction::ToDevice);
        pretty_assertions::assert_eq!(result, "hello NAME NAME");
    }

    #[test]
    fn substitutions_skip_empty_needles() {
        let subs = Substitutions::new([("EMPTY", "")]);
        pretty_assertions::assert_eq!(subs.apply("abc", Direction::ToStore), "abc");
        pretty_assertions::assert_eq!(subs.apply("EMPTY abc", Direction::ToDevice), " abc");
    }

    #[test]
    fn scoped_vars_precedence() {
        let default = VarScope {
            vars: VarTable::from([
                ("SHELL_RC".into(), "default-rc".into()),
                ("USER".into(), "nobody".into()),
            ]),
            file_only: VarTable::from([("FONT".into(), "mono".into())]),
            config_only: VarTable::from([("ROOT".into(), "/".into())]),
        };
        let device = VarScope {
            vars: VarTable::from([("USER".into(), "alice".into())]),
            file_only: VarTable::from([("FONT".into(), "iosevka".into())]),
            ..Default::default()
        };
        let file = VarScope::with_vars([("SHELL_RC", "file-rc")]);

        let scoped = ScopedVars::new(Some(&default), Some(&device), Some(&file));
        let result = scoped.resolve(VarTarget::FileContent);
        let expect = Substitutions::new([
            ("SHELL_RC", "file-rc"),
            ("USER", "alice"),
            ("FONT", "iosevka"),
        ]);
        pretty_assertions::assert_eq!(result, expect);

        let result = scoped.resolve(VarTarget::Config);
        let expect = Substitutions::new([
            ("SHELL_RC", "file-rc"),
            ("USER", "alice"),
            ("ROOT", "/"),
        ]);
        pretty_assertions::assert_eq!(result, expect);
    }

    #[test]
    fn scoped_vars_target_table_beats_common() {
        let default = VarScope {
            file_only: VarTable::from([("USER".into(), "from-default-file-only".into())]),
            ..Default::default()
        };
        let device = VarScope::with_vars([("USER", "from-device-vars")]);

        let scoped = ScopedVars::new(Some(&default), Some(&device), None);
        let result = scoped.resolve(VarTarget::FileContent);
        let expect = Substitutions::new([("USER", "from-default-file-only")]);
        pretty_assertions::assert_eq!(result, expect);
    }

    #[test]
    fn scoped_vars_absent_scopes() {
        let result = ScopedVars::default().resolve(VarTarget::FileContent);
        assert!(result.is_empty());
    }
}
