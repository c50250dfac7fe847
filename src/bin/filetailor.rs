// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use filetailor::{
    config::{SyncOptions, TailorConfig},
    path::{default_config_path, default_sync_dir},
    store::Store,
    sync::{
        hooks::hostname,
        prompt::{Prompt, TerminalPrompt},
        Operation, Syncer,
    },
};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "filetailor [options] <command> [<file_id>]...",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Show debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    fn run(self) -> Result<()> {
        match self.command {
            Command::Init(opts) => run_init(self.config, opts.yes),
            Command::Paths => run_paths(self.config),
            Command::Status(opts) => run_sync(
                self.config,
                Operation::Status,
                opts.files,
                opts.device,
                SyncOptions::default(),
            ),
            Command::Backup(opts) => {
                let overrides = opts.transfer.overrides();
                run_sync(
                    self.config,
                    Operation::Backup,
                    opts.transfer.files,
                    opts.transfer.device,
                    overrides,
                )
            }
            Command::Restore(opts) => {
                let overrides = SyncOptions {
                    no_backup: flag(opts.no_backup),
                    staging: opts.staging,
                    ..opts.transfer.overrides()
                };
                run_sync(
                    self.config,
                    Operation::Restore,
                    opts.transfer.files,
                    opts.transfer.device,
                    overrides,
                )
            }
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create configuration file, or the directories it names.
    #[command(override_usage = "filetailor init [options]")]
    Init(InitOptions),

    /// Show where configuration and synced files live.
    #[command(override_usage = "filetailor paths [options]")]
    Paths,

    /// Show how tracked files differ from the sync directory.
    #[command(override_usage = "filetailor status [options] [<file_id>]...")]
    Status(StatusOptions),

    /// Copy tracked files of this device into the sync directory.
    #[command(override_usage = "filetailor backup [options] [<file_id>]...")]
    Backup(BackupOptions),

    /// Copy tracked files from the sync directory onto this device.
    #[command(override_usage = "filetailor restore [options] [<file_id>]...")]
    Restore(RestoreOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Create configuration file without asking.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct StatusOptions {
    /// Tracked files to check, all of them if none given.
    #[arg(value_name = "file_id")]
    pub files: Vec<String>,

    /// Device to check for instead of the one named by hostname.
    #[arg(short, long, value_name = "device")]
    pub device: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BackupOptions {
    #[command(flatten)]
    pub transfer: TransferOptions,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RestoreOptions {
    #[command(flatten)]
    pub transfer: TransferOptions,

    /// Do not keep a backup of replaced files.
    #[arg(long)]
    pub no_backup: bool,

    /// Restore into this directory instead of each file's local path.
    #[arg(long, value_name = "dir")]
    pub staging: Option<String>,
}

/// Options shared by every command that copies files.
#[derive(Args, Clone, Debug)]
struct TransferOptions {
    /// Tracked files to sync, all of them if none given.
    #[arg(value_name = "file_id")]
    pub files: Vec<String>,

    /// Device to sync for instead of the one named by hostname.
    #[arg(short, long, value_name = "device")]
    pub device: Option<String>,

    /// Do not show differences before copying.
    #[arg(long)]
    pub no_diff: bool,

    /// Show what would happen without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Assume yes to every confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

impl TransferOptions {
    fn overrides(&self) -> SyncOptions {
        SyncOptions {
            no_diff: flag(self.no_diff),
            dry_run: flag(self.dry_run),
            yes: flag(self.yes),
            ..Default::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.log_level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

/// Command line flags only ever override configuration when given.
fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

fn resolve_config_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => Ok(default_config_path()?),
    }
}

fn open_store(config: &TailorConfig) -> Result<Store> {
    Ok(Store::open(&config.paths.sync_dir, config.paths.staging_dir()?)?)
}

fn run_init(config_path: Option<PathBuf>, yes: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = if config_path.exists() {
        info!("configuration file exists at {:?}", config_path.display());
        TailorConfig::load(&config_path)?
    } else {
        let message = format!("Create {:?}?", config_path.display());
        if !yes && !TerminalPrompt.confirm(&message, true)? {
            info!("nothing created");
            return Ok(());
        }
        TailorConfig::init(&config_path, default_sync_dir()?)?
    };

    let store = open_store(&config)?;
    info!("sync directory ready at {:?}", store.sync_dir().display());

    Ok(())
}

fn run_paths(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = TailorConfig::load(&config_path)?;
    info!("\n{}", config.locations(config_path)?);

    Ok(())
}

fn run_sync(
    config_path: Option<PathBuf>,
    operation: Operation,
    files: Vec<String>,
    device: Option<String>,
    overrides: SyncOptions,
) -> Result<()> {
    let config = TailorConfig::load(resolve_config_path(config_path)?)?;

    let name = match device {
        Some(name) => name,
        None => hostname()?,
    };
    let device = config.device(&name)?;
    let store = open_store(&config)?;

    let mut syncer = Syncer::new(&config, device, operation, store, overrides, TerminalPrompt);
    let report = syncer.run(&files);

    let failed = report.failures().count();
    if failed > 0 {
        bail!(
            "{failed} of {} tracked file(s) failed to {operation}",
            report.outcomes.len()
        );
    }

    Ok(())
}
