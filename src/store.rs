// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Sync store management.
//!
//! Filetailor keeps the device-independent variant of every tracked file in
//! one place called the __sync store__. The sync store is meant to be shared
//! between devices by some external means, e.g., a cloud drive or a git
//! repository, so filetailor never does anything fancier than reading and
//! writing plain files inside of it.
//!
//! # Sync Store Layout
//!
//! Each tracked file is stored at the top-level of the sync directory under
//! its store identifier. The store identifier is just the file identifier,
//! unless the file is unique to each device, in which case the device
//! identifier is appended to it, e.g., `nvim_laptop`. A tracked directory is
//! stored as a directory of the same name.
//!
//! # Staging Area
//!
//! Tailored output is never written straight to its destination. It is first
//! written into the __staging area__, compared against its destination, and
//! only copied over once the user agrees to it. The staging area mirrors the
//! sync store layout, and is cleared out after each tracked file is handled.

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Sync directory paired with its staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    sync_dir: PathBuf,
    staging_dir: PathBuf,
}

impl Store {
    /// Open sync store, creating its directories if they do not exist.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateDir`] if a directory cannot be created.
    pub fn open(sync_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            sync_dir: sync_dir.into(),
            staging_dir: staging_dir.into(),
        };

        for dir in [&store.sync_dir, &store.staging_dir] {
            mkdirp::mkdirp(dir).map_err(|err| StoreError::CreateDir {
                source: err,
                path: dir.clone(),
            })?;
        }
        debug!("open sync store at {:?}", store.sync_dir.display());

        Ok(store)
    }

    pub fn sync_dir(&self) -> &Path {
        self.sync_dir.as_path()
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging_dir.as_path()
    }

    /// Path of tracked file inside of sync directory.
    pub fn sync_path(&self, store_id: impl AsRef<str>) -> PathBuf {
        self.sync_dir.join(store_id.as_ref())
    }

    /// Path of staged output for tracked file.
    ///
    /// Give `entry` to address a file inside of a tracked directory.
    pub fn staged_path(&self, store_id: impl AsRef<str>, entry: Option<&str>) -> PathBuf {
        let path = self.staging_dir.join(store_id.as_ref());
        match entry {
            Some(entry) => path.join(entry),
            None => path,
        }
    }

    /// Write tailored output into staging area.
    ///
    /// Returns path of staged file.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateDir`] if parent directory cannot be made.
    /// - Return [`StoreError::Stage`] if staged file cannot be written.
    pub fn stage(
        &self,
        store_id: impl AsRef<str>,
        entry: Option<&str>,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        let path = self.staged_path(store_id, entry);
        if let Some(parent) = path.parent() {
            mkdirp::mkdirp(parent).map_err(|err| StoreError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        fs::write(&path, contents).map_err(|err| StoreError::Stage {
            source: err,
            path: path.clone(),
        })?;
        debug!("stage {:?}", path.display());

        Ok(path)
    }

    /// Remove everything staged for tracked file.
    ///
    /// Does nothing if nothing was staged.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Unstage`] if staged output cannot be removed.
    pub fn unstage(&self, store_id: impl AsRef<str>) -> Result<()> {
        let path = self.staged_path(store_id, None);
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else if path.exists() {
            fs::remove_file(&path)
        } else {
            return Ok(());
        };

        result.map_err(|err| StoreError::Unstage { source: err, path })
    }
}

/// All possible error types for sync store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to create directory.
    #[error("failed to create directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to write staged output.
    #[error("failed to stage file at {:?}", path.display())]
    Stage {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to clear staged output.
    #[error("failed to clear staged output at {:?}", path.display())]
    Unstage {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn store_open_creates_directories() -> anyhow::Result<()> {
        let store = Store::open("sync", "cache/in-progress")?;
        assert!(store.sync_dir().is_dir());
        assert!(store.staging_dir().is_dir());
        assert_eq!(store.sync_path("bashrc"), PathBuf::from("sync/bashrc"));

        Ok(())
    }

    #[sealed_test]
    fn store_stage_and_unstage_file() -> anyhow::Result<()> {
        let store = Store::open("sync", "staging")?;
        let path = store.stage("bashrc", None, "alias ls='ls -la'\n")?;
        assert_eq!(path, PathBuf::from("staging/bashrc"));
        assert_eq!(fs::read_to_string(&path)?, "alias ls='ls -la'\n");

        store.unstage("bashrc")?;
        assert!(!path.exists());

        Ok(())
    }

    #[sealed_test]
    fn store_stage_and_unstage_directory() -> anyhow::Result<()> {
        let store = Store::open("sync", "staging")?;
        let init = store.stage("nvim", Some("init.lua"), "vim.o.number = true\n")?;
        let keys = store.stage("nvim", Some("keys.lua"), "")?;
        assert_eq!(init, PathBuf::from("staging/nvim/init.lua"));
        assert!(keys.is_file());

        store.unstage("nvim")?;
        assert!(!store.staged_path("nvim", None).exists());

        // Nothing left to remove.
        store.unstage("nvim")?;

        Ok(())
    }
}
