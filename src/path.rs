// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations of the files and directories filetailor
//! manages for itself, i.e., its configuration file, sync directory, and
//! staging area.

use std::path::PathBuf;

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/filetailor/filetailor.toml`
/// as the default. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("filetailor").join("filetailor.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to sync directory.
///
/// Uses `$XDG_DATA_HOME/filetailor/sync` as the default. Only used to fill
/// in the starter configuration file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_sync_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("filetailor").join("sync"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to staging directory.
///
/// Uses `$XDG_CACHE_HOME/filetailor/in-progress` as the default. Does not
/// check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_staging_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|path| path.join("filetailor").join("in-progress"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
