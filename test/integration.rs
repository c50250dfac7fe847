// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::SyncFixture;

use filetailor::{
    config::SyncOptions,
    sync::{FileStatus, Operation},
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::fs;

const CONFIG: &str = indoc! {r#"
    [paths]
    sync_dir = "sync"
    staging_dir = "staging"

    [device.laptop]
    vars = { HOME_DIR = "/home/alice" }
    config_only = { LOCAL_ROOT = "laptop-home" }

    [device.desk]
    hostname = "alice-imac"
    vars = { HOME_DIR = "/Users/alice" }
    config_only = { LOCAL_ROOT = "desk-home" }

    [file.gitconfig]
    path = "LOCAL_ROOT/gitconfig"
"#};

const LAPTOP_GITCONFIG: &str = indoc! {r#"
    [user]
        name = Alice
    [core]
        #{begin filetailor laptop}
        editor = nvim
        excludesfile = /home/alice/.gitignore
        #{end filetailor laptop}
        #{begin filetailor desk}
        # editor = code --wait
        # excludesfile = /home/alice/.gitignore
        #{end filetailor desk}
"#};

const STORED_GITCONFIG: &str = indoc! {r#"
    [user]
        name = Alice
    [core]
        #{begin filetailor laptop}
        # editor = nvim
        # excludesfile = HOME_DIR/.gitignore
        #{end filetailor laptop}
        #{begin filetailor desk}
        # editor = code --wait
        # excludesfile = HOME_DIR/.gitignore
        #{end filetailor desk}
"#};

const DESK_GITCONFIG: &str = indoc! {r#"
    [user]
        name = Alice
    [core]
        #{begin filetailor laptop}
        # editor = nvim
        # excludesfile = /Users/alice/.gitignore
        #{end filetailor laptop}
        #{begin filetailor desk}
        editor = code --wait
        excludesfile = /Users/alice/.gitignore
        #{end filetailor desk}
"#};

fn status_of(report: &filetailor::sync::RunReport, file_id: &str) -> Option<FileStatus> {
    report.report(file_id).map(|report| report.status)
}

#[sealed_test]
fn two_devices_share_one_store() -> anyhow::Result<()> {
    let fixture = SyncFixture::new(CONFIG)?;
    fixture.write("laptop-home/gitconfig", LAPTOP_GITCONFIG)?;

    let report = fixture.sync("laptop", Operation::Backup, SyncOptions::default())?;
    assert!(report.is_success());
    assert_eq!(fixture.read("sync/gitconfig")?, STORED_GITCONFIG);

    let report = fixture.sync("alice-imac", Operation::Restore, SyncOptions::default())?;
    assert_eq!(status_of(&report, "gitconfig"), Some(FileStatus::MissingTarget));
    assert_eq!(fixture.read("desk-home/gitconfig")?, DESK_GITCONFIG);

    let report = fixture.sync("desk", Operation::Backup, SyncOptions::default())?;
    assert_eq!(status_of(&report, "gitconfig"), Some(FileStatus::Same));
    assert_eq!(fixture.read("sync/gitconfig")?, STORED_GITCONFIG);

    let report = fixture.sync("laptop", Operation::Status, SyncOptions::default())?;
    assert_eq!(status_of(&report, "gitconfig"), Some(FileStatus::Same));

    Ok(())
}

#[sealed_test]
fn restore_into_staging_tree() -> anyhow::Result<()> {
    let fixture = SyncFixture::new(CONFIG)?;
    fixture.write("sync/gitconfig", STORED_GITCONFIG)?;

    let overrides = SyncOptions {
        staging: Some("preview".into()),
        ..Default::default()
    };
    let report = fixture.sync("laptop", Operation::Restore, overrides)?;
    assert!(report.is_success());
    assert_eq!(fixture.read("preview/gitconfig/gitconfig")?, LAPTOP_GITCONFIG);
    assert!(!fs::exists("laptop-home/gitconfig")?);

    Ok(())
}

#[sealed_test]
fn line_endings_survive_round_trip() -> anyhow::Result<()> {
    let fixture = SyncFixture::new(CONFIG)?;
    let local = "[core]\r\n    autocrlf = true #{filetailor laptop}\r\n[user]";
    fixture.write("laptop-home/gitconfig", local)?;

    fixture.sync("laptop", Operation::Backup, SyncOptions::default())?;
    assert_eq!(
        fixture.read("sync/gitconfig")?,
        "[core]\r\n    # autocrlf = true #{filetailor laptop}\r\n[user]"
    );

    fs::remove_file("laptop-home/gitconfig")?;
    fixture.sync("laptop", Operation::Restore, SyncOptions::default())?;
    assert_eq!(fixture.read("laptop-home/gitconfig")?, local);

    Ok(())
}

#[sealed_test]
fn binary_content_is_copied_as_is() -> anyhow::Result<()> {
    let fixture = SyncFixture::new(CONFIG)?;
    let bytes = [0xff, 0xfe, 0x00, b'#', b'{', 0x80];
    fixture.write("laptop-home/gitconfig", bytes)?;

    let report = fixture.sync("laptop", Operation::Backup, SyncOptions::default())?;
    assert!(report.is_success());
    assert_eq!(fs::read("sync/gitconfig")?, bytes);

    Ok(())
}

#[sealed_test]
fn unknown_device_is_rejected() -> anyhow::Result<()> {
    let fixture = SyncFixture::new(CONFIG)?;
    let result = fixture.sync("toaster", Operation::Status, SyncOptions::default());
    assert!(result.is_err());

    Ok(())
}
