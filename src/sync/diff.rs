// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Show differences between a destination and its staged replacement.

use crate::sync::hooks::{syscall_interactive, HookError};

use similar::TextDiff;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Render unified diff between two texts.
pub fn unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}

/// Show what copying `new` over `old` would change.
///
/// Hand both paths to `program` if given, or render a unified diff
/// otherwise. The program may carry its own arguments, e.g.,
/// `code --wait --diff`.
///
/// # Errors
///
/// - Return [`DiffError::Read`] if either file cannot be read.
/// - Return [`DiffError::Program`] if external diff program fails.
pub fn show(old: impl AsRef<Path>, new: impl AsRef<Path>, program: Option<&str>) -> Result<()> {
    let (old, new) = (old.as_ref(), new.as_ref());
    if let Some(program) = program {
        let mut words = program.split_whitespace();
        if let Some(cmd) = words.next() {
            let args = words
                .map(OsStr::new)
                .chain([old.as_os_str(), new.as_os_str()]);
            return Ok(syscall_interactive(cmd, args)?);
        }
    }

    let old_text = read_lossy(old)?;
    let new_text = read_lossy(new)?;
    let diff = unified(
        &old_text,
        &new_text,
        &old.display().to_string(),
        &new.display().to_string(),
    );
    info!("\n{diff}");

    Ok(())
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|err| DiffError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Diff error types.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Failed to read file to diff.
    #[error("failed to read {:?} for diff", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// External diff program failed.
    #[error(transparent)]
    Program(#[from] HookError),
}

/// Friendly result alias :3
type Result<T, E = DiffError> = std::result::Result<T, E>;
