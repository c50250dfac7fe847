// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod integration;

use anyhow::Result;
use filetailor::{
    config::{SyncOptions, TailorConfig},
    store::Store,
    sync::{prompt::FixedAnswer, Operation, RunReport, Syncer},
};
use std::{fs, path::Path};

/// Configuration plus a throwaway file tree to sync in.
///
/// Meant to be used inside of a sealed test, so every path is relative to
/// the temporary working directory of the test.
pub(crate) struct SyncFixture {
    config: TailorConfig,
}

impl SyncFixture {
    pub(crate) fn new(config: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            config: config.as_ref().parse()?,
        })
    }

    pub(crate) fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;

        Ok(())
    }

    pub(crate) fn read(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    /// Sync every tracked file, agreeing to everything.
    pub(crate) fn sync(
        &self,
        device: &str,
        operation: Operation,
        overrides: SyncOptions,
    ) -> Result<RunReport> {
        let device = self.config.device(device)?;
        let store = Store::open(
            &self.config.paths.sync_dir,
            self.config.paths.staging_dir()?,
        )?;
        let mut syncer = Syncer::new(
            &self.config,
            device,
            operation,
            store,
            overrides,
            FixedAnswer::new(true),
        );

        Ok(syncer.run(&[]))
    }
}
