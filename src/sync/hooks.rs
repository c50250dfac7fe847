// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External commands.
//!
//! Filetailor shells out for the few things it does not do itself: running
//! the user's hook scripts, asking the system for its hostname, and handing
//! files to an external diff program.

use std::{ffi::OsStr, process::Command};
use tracing::{debug, info};

/// Run user script through the system shell.
///
/// The script inherits standard input and output so it can interact with the
/// user.
///
/// # Errors
///
/// - Return [`HookError`] if shell cannot be spawned, or script fails.
pub fn run_script(script: impl AsRef<str>) -> Result<()> {
    let script = script.as_ref();
    info!("run script {script:?}");

    #[cfg(windows)]
    return syscall_interactive("cmd", ["/C", script]);

    #[cfg(not(windows))]
    syscall_interactive("sh", ["-c", script])
}

/// Determine hostname of current system.
///
/// # Errors
///
/// - Return [`HookError`] if `hostname` program cannot be run.
pub fn hostname() -> Result<String> {
    let name = syscall_non_interactive("hostname", [] as [&str; 0])?;
    let name = name.trim().to_owned();
    debug!("hostname is {name:?}");

    Ok(name)
}

pub(crate) fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref()).args(args).spawn()?.wait()?;
    if !status.success() {
        return Err(HookError(std::io::Error::other(format!(
            "command {:?} failed with {status}",
            cmd.as_ref()
        ))));
    }

    Ok(())
}

pub(crate) fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(output.stderr.as_slice());
        return Err(HookError(std::io::Error::other(format!(
            "command {:?} failed:\n{}",
            cmd.as_ref(),
            stderr.trim_end()
        ))));
    }

    // INVARIANT: Chomp trailing newlines.
    let stdout = stdout
        .strip_suffix("\r\n")
        .or(stdout.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(stdout);

    Ok(stdout)
}

/// External command could not be run, or reported failure.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HookError(#[from] std::io::Error);

/// Friendly result alias :3
type Result<T, E = HookError> = std::result::Result<T, E>;
