// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Sync orchestration.
//!
//! Drive the tailoring engine over every tracked file of the configuration
//! for one device. There are three operations:
//!
//! - __status__: tailor toward the device, and report how local files
//!   differ without touching anything.
//! - __backup__: tailor local files toward the store, and copy the result
//!   into the sync directory.
//! - __restore__: tailor stored files toward the device, and copy the result
//!   to its local path.
//!
//! # Per-File Flow
//!
//! Each tracked file is handled on its own. A file that fails to sync is
//! reported, but never stops the rest of the run:
//!
//! 1. Skip the file if the device is not included.
//! 2. Run the file's before script.
//! 3. Tailor the source into the staging area, and compare it against the
//!    target byte for byte.
//! 4. For backup and restore, show a diff, confirm, then copy the staged
//!    output over the target.
//! 5. Clear the staging area, and run the file's after script.
//!
//! Tracked directories are handled one level deep. Each regular file inside
//! of them goes through the same flow, filtered by content globs.

pub mod compare;
pub mod diff;
pub mod hooks;
pub mod prompt;

use crate::{
    config::{ConfigError, DeviceProfile, FileProfile, Scripts, SyncOptions, TailorConfig},
    store::{Store, StoreError},
    sync::{
        compare::{compare_with, CompareError, Comparison},
        diff::DiffError,
        hooks::HookError,
        prompt::{Prompt, PromptError, TerminalPrompt},
    },
    tailor::{Direction, Tailor, TailorError},
};

use std::{
    collections::BTreeSet,
    error::Error as StdError,
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

/// Suffix of copies kept of files replaced during restore.
pub const BACKUP_SUFFIX: &str = ".filetailor_backup";

/// Sync operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Status,
    Backup,
    Restore,
}

impl Operation {
    /// Direction to tailor in.
    pub fn direction(self) -> Direction {
        match self {
            Self::Backup => Direction::ToStore,
            Self::Status | Self::Restore => Direction::ToDevice,
        }
    }

    fn before_script(self, scripts: &Scripts) -> Option<&str> {
        match self {
            Self::Status | Self::Backup => scripts.before_backup.as_deref(),
            Self::Restore => scripts.before_restore.as_deref(),
        }
    }

    fn after_script(self, scripts: &Scripts) -> Option<&str> {
        match self {
            Self::Status => None,
            Self::Backup => scripts.after_backup.as_deref(),
            Self::Restore => scripts.after_restore.as_deref(),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Status => fmt.write_str("status"),
            Self::Backup => fmt.write_str("backup"),
            Self::Restore => fmt.write_str("restore"),
        }
    }
}

/// How a tracked file relates to its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Tailored source matches target exactly.
    Same,

    /// Tailored source differs from target.
    Different,

    /// Source exists but target does not.
    MissingTarget,

    /// Target exists but source does not.
    MissingSource,

    /// Neither source nor target exist.
    MissingBoth,

    /// File is not synced on this device.
    Skip,

    /// One side is a file while the other is a directory.
    TypeConflict,
}

impl Display for FileStatus {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Same => fmt.write_str("no change"),
            Self::Different => fmt.write_str("modified"),
            Self::MissingTarget => fmt.write_str("target missing"),
            Self::MissingSource => fmt.write_str("source missing"),
            Self::MissingBoth => fmt.write_str("source and target missing"),
            Self::Skip => fmt.write_str("skipped"),
            Self::TypeConflict => fmt.write_str("file and directory conflict"),
        }
    }
}

/// Entry names of a tracked directory that differ from the target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirChanges {
    /// Present on both sides, but with different content.
    pub changed: Vec<String>,

    /// Present in source only.
    pub new: Vec<String>,

    /// Present in target only.
    pub deleted: Vec<String>,
}

impl DirChanges {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.new.is_empty() && self.deleted.is_empty()
    }
}

/// What happened to one tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file_id: String,
    pub status: FileStatus,

    /// Entry changes, only filled in for tracked directories.
    pub changes: DirChanges,

    /// Number of files copied or removed.
    pub applied: usize,
}

impl FileReport {
    fn new(file_id: impl Into<String>, status: FileStatus) -> Self {
        Self {
            file_id: file_id.into(),
            status,
            changes: DirChanges::default(),
            applied: 0,
        }
    }
}

/// Result of syncing one tracked file.
#[derive(Debug)]
pub struct FileOutcome {
    pub file_id: String,
    pub result: Result<FileReport>,
}

/// Results of a whole sync run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    /// Outcomes of files that failed to sync.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    /// Check if every file synced without error.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Report of file that synced, if any.
    pub fn report(&self, file_id: &str) -> Option<&FileReport> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.file_id == file_id)
            .and_then(|outcome| outcome.result.as_ref().ok())
    }
}

/// Sync tracked files of one device.
#[derive(Debug)]
pub struct Syncer<'c, P = TerminalPrompt>
where
    P: Prompt,
{
    config: &'c TailorConfig,
    device: DeviceProfile<'c>,
    operation: Operation,
    store: Store,
    overrides: SyncOptions,
    prompt: P,
}

impl<'c, P> Syncer<'c, P>
where
    P: Prompt,
{
    /// Construct new syncer.
    ///
    /// Options set in `overrides` take precedence over anything the
    /// configuration says.
    pub fn new(
        config: &'c TailorConfig,
        device: DeviceProfile<'c>,
        operation: Operation,
        store: Store,
        overrides: SyncOptions,
        prompt: P,
    ) -> Self {
        Self {
            config,
            device,
            operation,
            store,
            overrides,
            prompt,
        }
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    /// Sync selected tracked files, or every tracked file if none selected.
    ///
    /// Files are handled in order of selection, or sorted by file identifier
    /// when syncing everything. A failing file is logged and recorded in the
    /// report, and the run moves on to the next file.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&mut self, selection: &[String]) -> RunReport {
        let file_ids: Vec<String> = if selection.is_empty() {
            self.config.files.keys().cloned().collect()
        } else {
            selection.to_vec()
        };

        info!(
            "{} {} file(s) for device {:?}",
            self.operation,
            file_ids.len(),
            self.device.id
        );

        let mut report = RunReport::default();
        for file_id in file_ids {
            let result = self.sync_file(&file_id);
            if let Err(err) = &result {
                error!("{file_id}: {}", error_chain(err));
            }
            report.outcomes.push(FileOutcome { file_id, result });
        }

        report
    }

    /// Sync one tracked file.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Config`] if file cannot be resolved.
    /// - Return [`SyncError::Tailor`] if file content cannot be tailored.
    /// - Return [`SyncError::Hook`] if a script fails.
    /// - Return any I/O related variant of [`SyncError`] if reading,
    ///   staging, or copying fails.
    #[instrument(skip(self), level = "debug")]
    pub fn sync_file(&mut self, file_id: &str) -> Result<FileReport> {
        let profile = self
            .config
            .file_profile(&self.device, file_id, &self.overrides)?;

        if !profile.includes_device(self.device.id) {
            info!("{file_id}: {}", FileStatus::Skip);
            return Ok(FileReport::new(file_id, FileStatus::Skip));
        }

        self.run_script(&profile, self.operation.before_script(&profile.scripts))?;

        let local = profile.local_path();
        let synced = self.store.sync_path(&profile.store_id);
        let (source, target) = match self.operation.direction() {
            Direction::ToStore => (local, synced),
            Direction::ToDevice => (synced, local),
        };
        debug!("sync {:?} to {:?}", source.display(), target.display());

        let tailor = Tailor::new(
            self.device.id,
            self.operation.direction(),
            profile.substitutions.clone(),
        );
        let result = self.sync_path(&profile, &tailor, &source, &target);
        let unstaged = self.store.unstage(&profile.store_id);
        let report = first_error(file_id, result, unstaged)?;

        self.run_script(&profile, self.operation.after_script(&profile.scripts))?;

        Ok(report)
    }

    fn sync_path(
        &mut self,
        profile: &FileProfile,
        tailor: &Tailor,
        source: &Path,
        target: &Path,
    ) -> Result<FileReport> {
        let status = if source.is_file() {
            if !target.is_dir() {
                return self.sync_single(profile, tailor, source, target);
            }
            FileStatus::TypeConflict
        } else if source.is_dir() {
            if !target.is_file() {
                return self.sync_dir(profile, tailor, source, target);
            }
            FileStatus::TypeConflict
        } else if target.exists() {
            FileStatus::MissingSource
        } else {
            FileStatus::MissingBoth
        };

        warn!("{}: {status}", profile.file_id);
        Ok(FileReport::new(&profile.file_id, status))
    }

    fn sync_single(
        &mut self,
        profile: &FileProfile,
        tailor: &Tailor,
        source: &Path,
        target: &Path,
    ) -> Result<FileReport> {
        let (staged, comparison) = self.stage_entry(profile, tailor, source, target, None)?;
        let status = match comparison {
            Comparison::Identical => FileStatus::Same,
            Comparison::Different => FileStatus::Different,
            Comparison::TargetMissing => FileStatus::MissingTarget,
        };
        info!("{}: {status}", profile.file_id);

        let mut report = FileReport::new(&profile.file_id, status);
        if self.operation != Operation::Status && status != FileStatus::Same {
            let show_diff = status == FileStatus::Different;
            if self.copy_staged(profile, source, &staged, target, show_diff)? {
                report.applied += 1;
            }
        }

        Ok(report)
    }

    fn sync_dir(
        &mut self,
        profile: &FileProfile,
        tailor: &Tailor,
        source: &Path,
        target: &Path,
    ) -> Result<FileReport> {
        let mut names = list_files(source)?;
        if target.is_dir() {
            names.extend(list_files(target)?);
        }
        names.retain(|name| !name.ends_with(BACKUP_SUFFIX) && profile.includes_entry(name));

        let mut changes = DirChanges::default();
        for name in names {
            let (entry_source, entry_target) = (source.join(&name), target.join(&name));
            if entry_source.is_file() {
                if entry_target.is_dir() {
                    warn!("{}/{name}: {}", profile.file_id, FileStatus::TypeConflict);
                    continue;
                }

                let (_, comparison) = self.stage_entry(
                    profile,
                    tailor,
                    &entry_source,
                    &entry_target,
                    Some(name.as_str()),
                )?;
                match comparison {
                    Comparison::Identical => {}
                    Comparison::Different => changes.changed.push(name),
                    Comparison::TargetMissing => changes.new.push(name),
                }
            } else if !entry_source.exists() && entry_target.is_file() {
                changes.deleted.push(name);
            }
        }

        let status = if !target.exists() {
            FileStatus::MissingTarget
        } else if changes.is_empty() {
            FileStatus::Same
        } else {
            FileStatus::Different
        };
        info!("{}: {status}", profile.file_id);
        for (names, label) in [
            (&changes.changed, "modified"),
            (&changes.new, "new"),
            (&changes.deleted, "deleted"),
        ] {
            for name in names {
                info!("{}/{name}: {label}", profile.file_id);
            }
        }

        let mut report = FileReport::new(&profile.file_id, status);
        if self.operation != Operation::Status {
            report.applied = self.apply_dir_changes(profile, source, target, &changes)?;
        }
        report.changes = changes;

        Ok(report)
    }

    fn apply_dir_changes(
        &mut self,
        profile: &FileProfile,
        source: &Path,
        target: &Path,
        changes: &DirChanges,
    ) -> Result<usize> {
        let mut applied = 0;
        let updates = changes
            .changed
            .iter()
            .map(|name| (name, true))
            .chain(changes.new.iter().map(|name| (name, false)));

        for (name, show_diff) in updates {
            let staged = self.store.staged_path(&profile.store_id, Some(name.as_str()));
            let copied = self.copy_staged(
                profile,
                &source.join(name),
                &staged,
                &target.join(name),
                show_diff,
            )?;
            if copied {
                applied += 1;
            }
        }

        for name in &changes.deleted {
            let path = target.join(name);
            if !self.confirm(profile, &format!("delete {:?}?", path.display()))? {
                continue;
            }

            if profile.dry_run {
                info!("dry run, would delete {:?}", path.display());
                continue;
            }

            fs::remove_file(&path).map_err(|err| SyncError::Remove {
                source: err,
                path: path.clone(),
            })?;
            info!("deleted {:?}", path.display());
            applied += 1;
        }

        Ok(applied)
    }

    /// Tailor source into staging area, and compare it against target.
    fn stage_entry(
        &self,
        profile: &FileProfile,
        tailor: &Tailor,
        source: &Path,
        target: &Path,
        entry: Option<&str>,
    ) -> Result<(PathBuf, Comparison)> {
        let contents = fs::read(source).map_err(|err| SyncError::Read {
            source: err,
            path: source.to_path_buf(),
        })?;
        let tailored = tailor
            .tailor_bytes(&contents)
            .map_err(|err| SyncError::Tailor {
                file_id: profile.file_id.clone(),
                path: source.to_path_buf(),
                source: err,
            })?;
        if tailored.is_opaque() {
            debug!("{:?} is not text, copy as is", source.display());
        }

        let comparison = compare_with(tailored.as_bytes(), target)?;
        let staged = self
            .store
            .stage(&profile.store_id, entry, tailored.as_bytes())?;

        Ok((staged, comparison))
    }

    /// Copy staged output over target after confirmation.
    ///
    /// Returns `false` if nothing was copied.
    fn copy_staged(
        &mut self,
        profile: &FileProfile,
        source: &Path,
        staged: &Path,
        target: &Path,
        show_diff: bool,
    ) -> Result<bool> {
        if show_diff && !profile.no_diff {
            diff::show(target, staged, self.config.tools.diff_program.as_deref())?;
        }

        if !self.confirm(profile, &format!("update {:?}?", target.display()))? {
            info!("leave {:?} as is", target.display());
            return Ok(false);
        }

        if let Some(parent) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !parent.exists() {
                let message = format!("create missing directory {:?}?", parent.display());
                if !self.confirm(profile, &message)? {
                    return Ok(false);
                }

                if !profile.dry_run {
                    mkdirp::mkdirp(parent).map_err(|err| SyncError::CreateDir {
                        source: err,
                        path: parent.to_path_buf(),
                    })?;
                }
            }
        }

        if profile.dry_run {
            info!("dry run, would update {:?}", target.display());
            return Ok(false);
        }

        if self.operation == Operation::Restore && !profile.no_backup && target.is_file() {
            let backup = backup_path(target);
            copy_file(target, &backup)?;
            debug!("keep backup at {:?}", backup.display());
        }

        copy_file(staged, target)?;
        let permissions = fs::metadata(source)
            .map_err(|err| SyncError::Read {
                source: err,
                path: source.to_path_buf(),
            })?
            .permissions();
        fs::set_permissions(target, permissions).map_err(|err| SyncError::Copy {
            source: err,
            from: source.to_path_buf(),
            to: target.to_path_buf(),
        })?;
        info!("updated {:?}", target.display());

        Ok(true)
    }

    fn confirm(&mut self, profile: &FileProfile, message: &str) -> Result<bool> {
        if profile.yes {
            return Ok(true);
        }

        Ok(self.prompt.confirm(message, true)?)
    }

    fn run_script(&self, profile: &FileProfile, script: Option<&str>) -> Result<()> {
        let Some(script) = script else {
            return Ok(());
        };

        if profile.dry_run {
            info!("dry run, would run {script:?}");
            return Ok(());
        }

        Ok(hooks::run_script(script)?)
    }
}

/// Path to keep a copy of `target` at before it is replaced.
pub fn backup_path(target: &Path) -> PathBuf {
    let mut path = OsString::from(target.as_os_str());
    path.push(BACKUP_SUFFIX);
    PathBuf::from(path)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|err| SyncError::Copy {
        source: err,
        from: from.to_path_buf(),
        to: to.to_path_buf(),
    })?;

    Ok(())
}

/// Names of regular files directly inside of directory.
fn list_files(dir: &Path) -> Result<BTreeSet<String>> {
    let read_err = |err| SyncError::Read {
        source: err,
        path: dir.to_path_buf(),
    };

    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if !entry.file_type().map_err(read_err)?.is_file() {
            debug!("skip {:?}, not a regular file", entry.path().display());
            continue;
        }
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }

    Ok(names)
}

/// Merge outcome of a sync with the removal of its staged output.
///
/// A failed sync keeps its own error. A failure to unstage after it is only
/// logged.
fn first_error(
    file_id: &str,
    result: Result<FileReport>,
    unstaged: Result<(), StoreError>,
) -> Result<FileReport> {
    match (result, unstaged) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(unstage_err)) => {
            warn!("{file_id}: {}", error_chain(&unstage_err));
            Err(err)
        }
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }

    message
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Tracked file cannot be resolved from configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tracked file content cannot be tailored.
    #[error("failed to tailor {:?} of {file_id:?}", path.display())]
    Tailor {
        file_id: String,
        path: PathBuf,
        #[source]
        source: TailorError,
    },

    /// Sync store cannot be used.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Target cannot be compared.
    #[error(transparent)]
    Compare(#[from] CompareError),

    /// Differences cannot be shown.
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// Script or external command failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// User could not be asked for confirmation.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Failed to read source.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to copy file.
    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Failed to remove file.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to create directory.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = SyncError> = std::result::Result<T, E>;
