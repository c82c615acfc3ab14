/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/main.rs
*
* Entry point. Parses the command line, installs logging and runs a single
* rotation pass. The exit status is non-zero when the run could not start or
* when any identity failed.
*
* SPDX-License-Identifier: Apache-2.0 */

use anyhow::{bail, Context, Result};
use clap::Parser;

use key_rotator::cli::{Cli, Commands};
use key_rotator::runner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_layer::init(&cli.settings.log_level, cli.settings.log_format)
        .context("Failed to initialise logging")?;

    match cli.command() {
        Commands::Rotate => {
            tracing::info!("FlashBlade Credentials Rotator starting...");
            let summary = runner::rotate(&cli.settings)
                .await
                .context("Key rotation run failed")?;
            if !summary.is_success() {
                bail!("{} identity(ies) failed during key rotation", summary.failed);
            }
        }
        Commands::Smoketest => runner::smoketest(&cli.settings),
    }

    Ok(())
}
