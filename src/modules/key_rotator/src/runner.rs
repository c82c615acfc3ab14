/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/runner.rs
*
* One batch run: validate the configuration, build the sink, open a FlashBlade
* session, resolve the identities and rotate each of them. Configuration and
* connection problems abort the run; per-identity problems are counted in
* the returned `RunSummary`.
*
* SPDX-License-Identifier: Apache-2.0 */

use crate::config::Settings;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::policy::RotationPolicy;
use crate::providers::{FlashBladeClient, StorageClient};
use crate::rotation_logic::{Rotator, RunSummary};
use crate::sinks::{self, SecretSink};

/// Runs one complete rotation pass.
///
/// # Arguments
/// * `settings` - The run configuration; it is validated before any I/O.
///
/// # Returns
/// The per-identity counters, or an error when the configuration is invalid,
/// the sink cannot be built or the array session cannot be opened.
pub async fn rotate(settings: &Settings) -> Result<RunSummary> {
    settings.validate()?;

    let resolver = IdentityResolver::from_settings(settings);
    if resolver.is_empty() {
        tracing::error!("No Interesting Users are configured, exiting...");
        return Ok(RunSummary::default());
    }

    // A sink that cannot be built must fail the run before any key changes.
    let sink = sinks::from_settings(settings).await?;
    let storage = FlashBladeClient::connect(&settings.flashblade()?).await?;

    let result = execute(&storage, sink.as_ref(), &resolver, settings.policy()?).await;
    storage.logout().await;
    result
}

/// Resolves the identities and rotates them against already built clients.
///
/// # Arguments
/// * `storage` - Client for the array holding the keys.
/// * `sink` - Destination for newly minted credentials.
/// * `resolver` - Decides which users are managed.
/// * `policy` - Key-age thresholds and credential lifetime.
///
/// # Returns
/// A `RunSummary`; only a failed identity resolution is returned as an error.
pub async fn execute(
    storage: &dyn StorageClient,
    sink: &dyn SecretSink,
    resolver: &IdentityResolver,
    policy: RotationPolicy,
) -> Result<RunSummary> {
    let identities = resolver.resolve(storage).await?;
    if identities.is_empty() {
        tracing::warn!("No interesting users found");
        return Ok(RunSummary::default());
    }

    tracing::info!(
        identities = identities.len(),
        destination = %sink.describe(),
        min_age = policy.min_age,
        variance = policy.variance,
        "Rotating access keys"
    );

    let summary = Rotator::new(storage, sink, policy).run(&identities).await;

    tracing::info!(
        created = summary.created,
        rotated = summary.rotated,
        skipped = summary.skipped,
        unknown = summary.unknown,
        anomalies = summary.anomalies,
        failed = summary.failed,
        "Rotation run finished"
    );
    Ok(summary)
}

/// Verifies the image starts and logging is wired; makes no network calls.
pub fn smoketest(settings: &Settings) {
    tracing::debug!(?settings, "Running smoketest function");
    tracing::info!("Smoketest OK");
}
