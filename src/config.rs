// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that filetailor uses to
//! simplify the process of deserialization. The configuration file is a
//! single TOML document named `filetailor.toml`.
//!
//! # General Layout
//!
//! The configuration is composed of five sections:
//!
//! - `[paths]`: location of the sync directory and the staging area.
//! - `[tools]`: optional external programs, e.g., a diff viewer.
//! - `[default]`: global default variables and options.
//! - `[device.<id>]`: variables and options of a single device.
//! - `[file.<id>]`: a tracked file, its local path, and its own variables
//!   and options.
//!
//! ```toml
//! [paths]
//! sync_dir = "~/Sync/filetailor"
//!
//! [default]
//! vars = { EDITOR_CMD = "vim" }
//!
//! [device.laptop]
//! hostname = "alice-xps"
//! vars = { HOME_DIR = "/home/alice" }
//!
//! [file.bashrc]
//! path = "HOME_DIR/.bashrc"
//! exclude_devices = ["server"]
//! ```

use crate::{
    path::default_staging_dir,
    tailor::vars::{ScopedVars, Substitutions, VarScope, VarTarget},
};

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{self, read_to_string},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;

/// Render starter configuration file with `sync_dir` as sync directory.
pub fn starter_config(sync_dir: impl AsRef<Path>) -> String {
    let sync_dir = toml::Value::String(sync_dir.as_ref().to_string_lossy().into_owned());
    format!(
        r#"# Tracked files go in [file.<id>] sections, devices in [device.<id>]
# sections. Variables are swapped for their values on restore, and back
# again on backup.

[paths]
sync_dir = {sync_dir}
# staging_dir = "~/.cache/filetailor/in-progress"

[tools]
# diff_program = "delta"

[default]
# vars = {{ EDITOR_CMD = "vim" }}

# [device.laptop]
# hostname = "my-laptop"
# vars = {{ HOME_DIR = "/home/me" }}

# [file.bashrc]
# path = "HOME_DIR/.bashrc"
"#
    )
}

/// Whole configuration file.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct TailorConfig {
    /// Locations used by sync operations.
    #[serde(default)]
    pub paths: PathSettings,

    /// External programs.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Global default scope.
    #[serde(default)]
    pub default: ScopeSettings,

    /// Device scopes keyed by device identifier.
    #[serde(default, rename = "device")]
    pub devices: BTreeMap<String, DeviceSettings>,

    /// Tracked files keyed by file identifier.
    #[serde(default, rename = "file")]
    pub files: BTreeMap<String, FileSettings>,
}

impl TailorConfig {
    /// Load configuration from file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if configuration file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if configuration is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if path expansion fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = read_to_string(path.as_ref()).map_err(|err| ConfigError::Read {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;

        data.parse()
    }

    /// Write starter configuration file at `path`, then load it.
    ///
    /// Parent directories of `path` are created as needed.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::AlreadyExists`] if `path` already exists.
    /// - Return [`ConfigError::CreateDir`] if parent directory cannot be
    ///   created.
    /// - Return [`ConfigError::Write`] if configuration cannot be written.
    pub fn init(path: impl AsRef<Path>, sync_dir: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            mkdirp::mkdirp(parent).map_err(|err| ConfigError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        fs::write(path, starter_config(sync_dir)).map_err(|err| ConfigError::Write {
            source: err,
            path: path.to_path_buf(),
        })?;
        info!("created configuration file at {:?}", path.display());

        Self::load(path)
    }

    /// Every location used with this configuration loaded from `config_path`.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default staging directory
    ///   cannot be determined.
    pub fn locations(&self, config_path: impl Into<PathBuf>) -> Result<Locations> {
        Ok(Locations {
            config: config_path.into(),
            sync_dir: self.paths.sync_dir.clone(),
            staging_dir: self.paths.staging_dir()?,
        })
    }

    /// Determine device identifier from device name or hostname.
    ///
    /// A name that is not a device identifier is matched against the
    /// `hostname` alias of every device.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::UnknownDevice`] if nothing matches.
    pub fn device(&self, name: impl AsRef<str>) -> Result<DeviceProfile<'_>> {
        let name = name.as_ref();
        if let Some((id, settings)) = self.devices.get_key_value(name) {
            return Ok(DeviceProfile { id, settings });
        }

        self.devices
            .iter()
            .find(|(_, settings)| settings.hostname.as_deref() == Some(name))
            .map(|(id, settings)| DeviceProfile { id, settings })
            .ok_or_else(|| ConfigError::UnknownDevice(name.to_owned()))
    }

    /// Resolve everything needed to sync one tracked file for a device.
    ///
    /// Options given in `overrides` take precedence over the file, device,
    /// and default scopes, in that order.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::UnknownFile`] if file is not configured.
    /// - Return [`ConfigError::ShellExpansion`] if path expansion fails.
    /// - Return [`ConfigError::Pattern`] if a content filter is not a valid
    ///   glob.
    pub fn file_profile(
        &self,
        device: &DeviceProfile<'_>,
        file_id: impl AsRef<str>,
        overrides: &SyncOptions,
    ) -> Result<FileProfile> {
        let file_id = file_id.as_ref();
        let file = self
            .files
            .get(file_id)
            .ok_or_else(|| ConfigError::UnknownFile(file_id.to_owned()))?;

        let scoped = ScopedVars::new(
            Some(&self.default.vars),
            Some(&device.settings.scope.vars),
            Some(&file.scope.vars),
        );
        let config_vars = scoped.resolve(VarTarget::Config);
        let options = [
            overrides,
            &file.scope.options,
            &device.settings.scope.options,
            &self.default.options,
        ];

        let staging = options
            .iter()
            .find_map(|opts| opts.staging.as_deref())
            .map(|staging| expand_path(&config_vars, staging))
            .transpose()?;
        let store_id = if file.unique {
            format!("{file_id}_{}", device.id)
        } else {
            file_id.to_owned()
        };

        Ok(FileProfile {
            file_id: file_id.to_owned(),
            store_id,
            path: expand_path(&config_vars, &file.path)?,
            staging,
            include_devices: file.include_devices.clone(),
            exclude_devices: file.exclude_devices.clone(),
            include_contents: compile_pattern(file.include_contents.as_deref())?,
            exclude_contents: compile_pattern(file.exclude_contents.as_deref())?,
            scripts: file.scripts.concretize(&config_vars),
            no_diff: resolve_flag(&options, |opts| opts.no_diff),
            no_backup: resolve_flag(&options, |opts| opts.no_backup),
            dry_run: resolve_flag(&options, |opts| opts.dry_run),
            yes: resolve_flag(&options, |opts| opts.yes),
            substitutions: scoped.resolve(VarTarget::FileContent),
        })
    }
}

impl FromStr for TailorConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: TailorConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path settings.
        config.paths.sync_dir = shell_expand(&config.paths.sync_dir.to_string_lossy())?;
        config.paths.staging_dir = config
            .paths
            .staging_dir
            .take()
            .map(|path| shell_expand(&path.to_string_lossy()))
            .transpose()?;

        Ok(config)
    }
}

/// Location settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct PathSettings {
    /// Directory holding the store variant of every tracked file.
    pub sync_dir: PathBuf,

    /// Directory to stage tailored output in before comparison.
    pub staging_dir: Option<PathBuf>,
}

impl PathSettings {
    /// Staging directory, or the default one if not configured.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default cannot be determined.
    pub fn staging_dir(&self) -> Result<PathBuf> {
        match &self.staging_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(default_staging_dir()?),
        }
    }
}

/// Resolved locations of configuration, sync directory, and staging area.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Locations {
    pub config: PathBuf,
    pub sync_dir: PathBuf,
    pub staging_dir: PathBuf,
}

impl Display for Locations {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "config: {}", self.config.display())?;
        writeln!(fmt, "sync_dir: {}", self.sync_dir.display())?;
        write!(fmt, "staging_dir: {}", self.staging_dir.display())
    }
}

/// External program settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct ToolSettings {
    /// Program to show differences with, called as `<program> <old> <new>`.
    pub diff_program: Option<String>,
}

/// Options that can be set at any scope, or on the command line.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Do not show differences before copying.
    pub no_diff: Option<bool>,

    /// Do not keep a backup of files replaced during restore.
    pub no_backup: Option<bool>,

    /// Do not modify any tracked file.
    pub dry_run: Option<bool>,

    /// Assume yes to every confirmation.
    pub yes: Option<bool>,

    /// Restore into a staging tree instead of the real local paths.
    pub staging: Option<String>,
}

/// Variables and options of one scope.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct ScopeSettings {
    #[serde(flatten)]
    pub vars: VarScope,

    #[serde(flatten)]
    pub options: SyncOptions,
}

/// Device scope.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct DeviceSettings {
    /// Hostname that identifies this device.
    pub hostname: Option<String>,

    #[serde(flatten)]
    pub scope: ScopeSettings,
}

/// Tracked file.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct FileSettings {
    /// Local path of the file or directory.
    pub path: String,

    /// Store a separate variant for every device.
    #[serde(default)]
    pub unique: bool,

    /// Only sync on these devices.
    pub include_devices: Option<Vec<String>>,

    /// Never sync on these devices.
    pub exclude_devices: Option<Vec<String>>,

    /// Only sync directory entries matching this glob.
    pub include_contents: Option<String>,

    /// Never sync directory entries matching this glob.
    pub exclude_contents: Option<String>,

    /// Commands to run around sync operations.
    #[serde(default)]
    pub scripts: Scripts,

    #[serde(flatten)]
    pub scope: ScopeSettings,
}

/// Shell commands to run before and after syncing a file.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct Scripts {
    pub before_backup: Option<String>,
    pub after_backup: Option<String>,
    pub before_restore: Option<String>,
    pub after_restore: Option<String>,
}

impl Scripts {
    fn concretize(&self, vars: &Substitutions) -> Self {
        let apply = |script: &Option<String>| {
            script
                .as_deref()
                .map(|script| vars.concretize(script).into_owned())
        };

        Self {
            before_backup: apply(&self.before_backup),
            after_backup: apply(&self.after_backup),
            before_restore: apply(&self.before_restore),
            after_restore: apply(&self.after_restore),
        }
    }
}

/// Device identifier with its settings.
#[derive(Debug, Clone, Copy)]
pub struct DeviceProfile<'a> {
    pub id: &'a str,
    pub settings: &'a DeviceSettings,
}

/// Everything needed to sync one tracked file for one device.
#[derive(Debug, Clone)]
pub struct FileProfile {
    /// Identifier of file in configuration.
    pub file_id: String,

    /// Name of file in the sync directory.
    pub store_id: String,

    /// Local path with variables concretized and shell expansion applied.
    pub path: PathBuf,

    /// Staging root to restore into instead of `path`.
    pub staging: Option<PathBuf>,

    pub include_devices: Option<Vec<String>>,
    pub exclude_devices: Option<Vec<String>>,
    pub include_contents: Option<glob::Pattern>,
    pub exclude_contents: Option<glob::Pattern>,
    pub scripts: Scripts,
    pub no_diff: bool,
    pub no_backup: bool,
    pub dry_run: bool,
    pub yes: bool,

    /// Substitutions for file content.
    pub substitutions: Substitutions,
}

impl FileProfile {
    /// Check if file should be synced on device.
    pub fn includes_device(&self, device: &str) -> bool {
        if let Some(include) = &self.include_devices {
            return include.iter().any(|name| name == device);
        }

        if let Some(exclude) = &self.exclude_devices {
            return !exclude.iter().any(|name| name == device);
        }

        true
    }

    /// Check if directory entry passes content filters.
    pub fn includes_entry(&self, name: &str) -> bool {
        if let Some(include) = &self.include_contents {
            if !include.matches(name) {
                return false;
            }
        }

        if let Some(exclude) = &self.exclude_contents {
            if exclude.matches(name) {
                return false;
            }
        }

        true
    }

    /// Local path to sync with, accounting for staging.
    pub fn local_path(&self) -> PathBuf {
        match &self.staging {
            Some(root) => {
                let name = self.path.file_name().map(PathBuf::from).unwrap_or_default();
                root.join(&self.file_id).join(name)
            }
            None => self.path.clone(),
        }
    }
}

fn resolve_flag(options: &[&SyncOptions], flag: impl Fn(&SyncOptions) -> Option<bool>) -> bool {
    options.iter().find_map(|opts| flag(opts)).unwrap_or(false)
}

fn expand_path(vars: &Substitutions, path: &str) -> Result<PathBuf> {
    shell_expand(&vars.concretize(path))
}

fn shell_expand(path: &str) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path)
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<glob::Pattern>> {
    pattern
        .map(|pattern| glob::Pattern::new(pattern).map_err(ConfigError::Pattern))
        .transpose()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Content filter is not a valid glob.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Default directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Configuration file is already there.
    #[error("configuration file already exists at {:?}", .0.display())]
    AlreadyExists(PathBuf),

    /// Failed to create directory of configuration file.
    #[error("failed to create directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to write configuration file.
    #[error("failed to write configuration file at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Device is neither a device identifier nor a known hostname.
    #[error("device {0:?} is not configured, add a [device.{0}] section")]
    UnknownDevice(String),

    /// Tracked file is not configured.
    #[error("file {0:?} is not configured")]
    UnknownFile(String),
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tailor::vars::VarTable;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    const CONFIG: &str = r#"
        [paths]
        sync_dir = "$SYNC/filetailor"

        [tools]
        diff_program = "delta"

        [default]
        vars = { EDITOR_CMD = "vim" }
        no_diff = true

        [device.laptop]
        hostname = "alice-xps"
        vars = { HOME_DIR = "/home/alice" }
        config_only = { CONF = "/home/alice/.config" }
        dry_run = true

        [device.server]
        vars = { HOME_DIR = "/root" }

        [file.bashrc]
        path = "HOME_DIR/.bashrc"
        exclude_devices = ["server"]
        vars = { EDITOR_CMD = "nvim" }
        no_diff = false

        [file.nvim]
        path = "CONF/nvim"
        unique = true
        include_devices = ["laptop"]
        include_contents = "*.lua"
        scripts = { after_restore = "ls CONF" }
    "#;

    #[sealed_test(env = [("SYNC", "/mnt/sync")])]
    fn deserialize_config() -> anyhow::Result<()> {
        let config: TailorConfig = CONFIG.parse()?;

        assert_eq!(config.paths.sync_dir, PathBuf::from("/mnt/sync/filetailor"));
        assert_eq!(config.paths.staging_dir, None);
        assert_eq!(config.tools.diff_program.as_deref(), Some("delta"));
        assert_eq!(
            config.default.vars.vars,
            VarTable::from([("EDITOR_CMD".into(), "vim".into())])
        );
        assert_eq!(config.default.options.no_diff, Some(true));
        assert_eq!(
            config.devices["laptop"].hostname.as_deref(),
            Some("alice-xps")
        );
        assert_eq!(config.devices["laptop"].scope.options.dry_run, Some(true));
        assert_eq!(config.files["bashrc"].path, "HOME_DIR/.bashrc");
        assert_eq!(
            config.files["nvim"].scripts.after_restore.as_deref(),
            Some("ls CONF")
        );

        Ok(())
    }

    #[sealed_test(env = [("SYNC", "/mnt/sync")])]
    fn resolve_device_by_id_or_hostname() -> anyhow::Result<()> {
        let config: TailorConfig = CONFIG.parse()?;

        assert_eq!(config.device("laptop")?.id, "laptop");
        assert_eq!(config.device("alice-xps")?.id, "laptop");
        assert!(matches!(
            config.device("toaster"),
            Err(ConfigError::UnknownDevice(name)) if name == "toaster"
        ));

        Ok(())
    }

    #[sealed_test(env = [("SYNC", "/mnt/sync")])]
    fn resolve_file_profile() -> anyhow::Result<()> {
        let config: TailorConfig = CONFIG.parse()?;
        let laptop = config.device("laptop")?;

        let bashrc = config.file_profile(&laptop, "bashrc", &SyncOptions::default())?;
        assert_eq!(bashrc.store_id, "bashrc");
        assert_eq!(bashrc.path, PathBuf::from("/home/alice/.bashrc"));
        assert!(!bashrc.no_diff);
        assert!(bashrc.dry_run);
        assert!(!bashrc.yes);
        assert!(bashrc.includes_device("laptop"));
        assert!(!bashrc.includes_device("server"));
        assert_eq!(
            bashrc.substitutions,
            Substitutions::new([("EDITOR_CMD", "nvim"), ("HOME_DIR", "/home/alice")])
        );

        let nvim = config.file_profile(&laptop, "nvim", &SyncOptions::default())?;
        assert_eq!(nvim.store_id, "nvim_laptop");
        assert_eq!(nvim.path, PathBuf::from("/home/alice/.config/nvim"));
        assert_eq!(
            nvim.scripts.after_restore.as_deref(),
            Some("ls /home/alice/.config")
        );
        assert!(nvim.no_diff);
        assert!(nvim.includes_entry("init.lua"));
        assert!(!nvim.includes_entry("init.vim"));
        assert!(!nvim.includes_device("server"));

        Ok(())
    }

    #[sealed_test(env = [("SYNC", "/mnt/sync")])]
    fn command_line_overrides_win() -> anyhow::Result<()> {
        let config: TailorConfig = CONFIG.parse()?;
        let laptop = config.device("laptop")?;
        let overrides = SyncOptions {
            no_diff: Some(true),
            dry_run: Some(false),
            staging: Some("/tmp/stage".into()),
            ..Default::default()
        };

        let bashrc = config.file_profile(&laptop, "bashrc", &overrides)?;
        assert!(bashrc.no_diff);
        assert!(!bashrc.dry_run);
        assert_eq!(
            bashrc.local_path(),
            PathBuf::from("/tmp/stage/bashrc/.bashrc")
        );

        Ok(())
    }

    #[sealed_test(env = [("SYNC", "/mnt/sync")])]
    fn unknown_file_profile() -> anyhow::Result<()> {
        let config: TailorConfig = CONFIG.parse()?;
        let laptop = config.device("laptop")?;
        let result = config.file_profile(&laptop, "zshrc", &SyncOptions::default());
        assert!(matches!(result, Err(ConfigError::UnknownFile(name)) if name == "zshrc"));

        Ok(())
    }

    #[test]
    fn reject_malformed_config() {
        let result = "[file.bashrc]\nunique = \"yes\"\n".parse::<TailorConfig>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn starter_config_is_valid() -> anyhow::Result<()> {
        let config: TailorConfig = starter_config("/mnt/sync/filetailor").parse()?;
        assert_eq!(config.paths.sync_dir, PathBuf::from("/mnt/sync/filetailor"));
        assert_eq!(config.paths.staging_dir, None);
        assert!(config.devices.is_empty());
        assert!(config.files.is_empty());

        Ok(())
    }

    #[sealed_test]
    fn init_writes_config_once() -> anyhow::Result<()> {
        let config = TailorConfig::init("conf/filetailor/filetailor.toml", "sync")?;
        assert_eq!(config.paths.sync_dir, PathBuf::from("sync"));
        assert_eq!(
            fs::read_to_string("conf/filetailor/filetailor.toml")?,
            starter_config("sync")
        );

        let result = TailorConfig::init("conf/filetailor/filetailor.toml", "elsewhere");
        assert!(matches!(result, Err(ConfigError::AlreadyExists(_))));
        assert_eq!(TailorConfig::load("conf/filetailor/filetailor.toml")?, config);

        Ok(())
    }

    #[test]
    fn locations_of_config() -> anyhow::Result<()> {
        let config: TailorConfig = indoc! {r#"
            [paths]
            sync_dir = "/mnt/sync"
            staging_dir = "/tmp/staging"
        "#}
        .parse()?;
        let locations = config.locations("/etc/filetailor.toml")?;
        assert_eq!(locations.staging_dir, PathBuf::from("/tmp/staging"));
        assert_eq!(
            locations.to_string(),
            indoc! {"
                config: /etc/filetailor.toml
                sync_dir: /mnt/sync
                staging_dir: /tmp/staging"
            }
        );

        Ok(())
    }
}
