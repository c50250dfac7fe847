// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tailor one canonical file to many devices.
//!
//! Filetailor keeps a single device-independent copy of each tracked file in
//! a __sync store__, and derives the variant that belongs on each device from
//! it. Device specific lines are marked with __directives__ hidden inside the
//! file's own comment syntax, and device specific values are abstracted into
//! __variables__. Backing up comments out the lines of the current device and
//! abstracts its values. Restoring does the reverse for whatever device it
//! runs on.
//!
//! # Layout
//!
//! 1. [`tailor`]: line tailoring engine.
//! 2. [`sync`]: status, backup, and restore over configured files.
//! 3. [`store`]: sync directory and staging area.
//! 4. [`config`]: configuration file layout.
//! 5. [`path`]: default paths.

pub mod config;
pub mod path;
pub mod store;
pub mod sync;
pub mod tailor;
