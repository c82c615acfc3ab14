/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/rotation_logic.rs
*
* Per-identity rotation. The array allows at most two access keys per user,
* so each run looks at the current key set and does one of:
*
*   0 keys            create a key and publish it
*   1 key, old enough create a second key and publish it
*   2 keys, old enough delete the oldest, then create and publish
*   1-2 keys, too young leave everything alone
*   more than 2       warn and leave everything alone
*
* Consumers therefore always have the previous key valid while the new one
* propagates. `plan_action` is the pure decision; `Rotator` carries it out
* against a `StorageClient` and a `SecretSink`.
*
* SPDX-License-Identifier: Apache-2.0 */

use chrono::{DateTime, Utc};

use crate::credentials::materialize;
use crate::error::{Error, Result};
use crate::models::{AccessKey, Identity};
use crate::policy::{is_too_recent, RotationPolicy};
use crate::providers::StorageClient;
use crate::sinks::SecretSink;

/// What should happen to one identity's key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Create,
    /// Delete `retire`, then create.
    Rotate { retire: String },
    Skip,
    Anomaly { count: usize },
}

/// What actually happened to one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Created { key: String },
    Rotated { retired: String, key: String },
    SkippedTooRecent,
    SkippedUnknownIdentity,
    Anomaly { count: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub rotated: usize,
    pub skipped: usize,
    pub unknown: usize,
    pub anomalies: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &RotationOutcome) {
        match outcome {
            RotationOutcome::Created { .. } => self.created += 1,
            RotationOutcome::Rotated { .. } => self.rotated += 1,
            RotationOutcome::SkippedTooRecent => self.skipped += 1,
            RotationOutcome::SkippedUnknownIdentity => self.unknown += 1,
            RotationOutcome::Anomaly { .. } => self.anomalies += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Decides what to do with one identity's current key set.
///
/// # Arguments
/// * `keys` - The identity's keys as listed by the array.
/// * `now` - Reference time for the age check.
/// * `policy` - Age thresholds.
///
/// # Returns
/// The `KeyAction` to carry out. Pure; no I/O.
pub fn plan_action(keys: &[AccessKey], now: DateTime<Utc>, policy: &RotationPolicy) -> KeyAction {
    match keys.len() {
        0 => KeyAction::Create,
        1 | 2 if is_too_recent(keys, now, policy) => KeyAction::Skip,
        1 => KeyAction::Create,
        2 => {
            // Identical timestamps retire the first key listed.
            let oldest = if keys[1].created_ms < keys[0].created_ms {
                &keys[1]
            } else {
                &keys[0]
            };
            KeyAction::Rotate {
                retire: oldest.name.clone(),
            }
        }
        count => KeyAction::Anomaly { count },
    }
}

pub struct Rotator<'a> {
    storage: &'a dyn StorageClient,
    sink: &'a dyn SecretSink,
    policy: RotationPolicy,
}

impl<'a> Rotator<'a> {
    pub fn new(storage: &'a dyn StorageClient, sink: &'a dyn SecretSink, policy: RotationPolicy) -> Self {
        Self {
            storage,
            sink,
            policy,
        }
    }

    /// Runs every identity in order. A failure is logged and counted, and
    /// the remaining identities are still processed.
    pub async fn run(&self, identities: &[Identity]) -> RunSummary {
        let mut summary = RunSummary::default();

        for identity in identities {
            tracing::info!("Begin key operations. User: {}", identity);
            match self.rotate_identity(identity, Utc::now()).await {
                Ok(outcome) => {
                    tracing::debug!(user = %identity, ?outcome, "Finished key operations");
                    summary.record(&outcome);
                }
                Err(e) => {
                    tracing::error!(user = %identity, error = %e, "Key operations failed");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Inspects one identity's keys and carries out the planned action.
    ///
    /// A rotation deletes the oldest key before creating the new one, and
    /// every created key is published exactly once.
    ///
    /// # Arguments
    /// * `identity` - The user whose keys are managed.
    /// * `now` - Reference time for the age check and the credential expiry.
    ///
    /// # Returns
    /// What happened, or the first error hit. A key already created or
    /// deleted is not rolled back when a later step fails.
    pub async fn rotate_identity(&self, identity: &Identity, now: DateTime<Utc>) -> Result<RotationOutcome> {
        if !self.storage.user_exists(&identity.name).await? {
            tracing::error!("User {} does not appear to be a valid user...", identity);
            return Ok(RotationOutcome::SkippedUnknownIdentity);
        }

        let keys = self.storage.list_keys(identity).await?;
        match keys.len() {
            0 => tracing::info!("No keys found. User: {}", identity),
            1 => tracing::info!("One key found. User: {}", identity),
            2 => tracing::info!("Two keys found. User: {}", identity),
            _ => {}
        }

        match plan_action(&keys, now, &self.policy) {
            KeyAction::Create => {
                let key = self.issue(identity, now).await?;
                Ok(RotationOutcome::Created { key })
            }
            KeyAction::Rotate { retire } => {
                if !self.storage.delete_keys(std::slice::from_ref(&retire)).await? {
                    return Err(Error::DeleteRejected(vec![retire]));
                }
                tracing::info!("Oldest key deleted. User: {}, Key: {}", identity, retire);

                let key = self.issue(identity, now).await?;
                Ok(RotationOutcome::Rotated { retired: retire, key })
            }
            KeyAction::Skip => {
                tracing::warn!("Keys are too young, ignoring. User: {}", identity);
                Ok(RotationOutcome::SkippedTooRecent)
            }
            KeyAction::Anomaly { count } => {
                tracing::warn!(count, "More than two keys found. User: {}", identity);
                Ok(RotationOutcome::Anomaly { count })
            }
        }
    }

    /// Creates a key and publishes it. Returns the new key's name.
    async fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String> {
        let key = self
            .storage
            .create_key(identity)
            .await?
            .ok_or_else(|| Error::CreateRejected(identity.name.clone()))?;
        tracing::info!("New key created. User: {}, Key: {}", identity, key.name);

        let document = materialize(&key, &self.policy, now)?;
        self.sink.publish(&document).await?;
        tracing::info!("Published new credentials. User: {}", identity);

        Ok(key.name)
    }
}
