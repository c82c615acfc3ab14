/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/cli.rs
* Command-line surface of the `key_rotator` binary. Options live in
* `config::Settings` so that every one of them can also come from the
* environment; this file only adds the subcommands.
* SPDX-License-Identifier: Apache-2.0 */

use clap::{Parser, Subcommand};

use crate::config::Settings;

/// Rotates FlashBlade object-store access keys and publishes the newest
/// credentials for AWS `credential_process` consumers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    /// The command to execute. Defaults to `rotate`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run one rotation pass over every configured identity.
    Rotate,

    /// Check that the binary starts and logging works, without touching the array.
    Smoketest,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Rotate)
    }
}
