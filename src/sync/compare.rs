// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Byte-exact comparison of staged output against its destination.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Result of comparing staged output with destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Destination holds exactly the same bytes.
    Identical,

    /// Destination exists but holds different bytes.
    Different,

    /// Destination does not exist.
    TargetMissing,
}

/// Compare bytes with whatever is at `target`.
///
/// # Errors
///
/// - Return [`CompareError`] if target exists but cannot be read.
pub fn compare_with(contents: &[u8], target: impl AsRef<Path>) -> Result<Comparison> {
    let target = target.as_ref();
    match fs::read(target) {
        Ok(existing) if existing == contents => Ok(Comparison::Identical),
        Ok(_) => Ok(Comparison::Different),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Comparison::TargetMissing),
        Err(err) => Err(CompareError {
            source: err,
            path: target.to_path_buf(),
        }),
    }
}

/// Target cannot be read for comparison.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {:?} for comparison", path.display())]
pub struct CompareError {
    #[source]
    source: std::io::Error,
    path: PathBuf,
}

/// Friendly result alias :3
type Result<T, E = CompareError> = std::result::Result<T, E>;
