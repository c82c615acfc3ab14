/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/credentials.rs
*
* Turns a freshly created access key into the document the AWS SDKs accept
* from a `credential_process`. The field names and their order are part of
* the consumer-facing contract:
*
*   {"Version":1,"AccessKeyId":..,"SecretAccessKey":..,"SessionToken":"","Expiration":"..Z"}
*
* SPDX-License-Identifier: Apache-2.0 */

use std::fmt;

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::AccessKey;
use crate::policy::RotationPolicy;

pub const CREDENTIAL_VERSION: u8 = 1;

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialDocument {
    pub version: u8,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Static keys have no session; always empty.
    pub session_token: String,
    pub expiration: String,
}

impl fmt::Debug for CredentialDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDocument")
            .field("version", &self.version)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl CredentialDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The JSON document, base64 encoded, as stored in `Secret.data`.
    pub fn to_base64(&self) -> Result<String> {
        Ok(encode(&self.to_json()?))
    }
}

pub fn encode(input: &str) -> String {
    B64.encode(input.as_bytes())
}

/// Expiry timestamp: `now` truncated to whole seconds plus the policy offset,
/// naive UTC with a literal `Z`. Fails with `Error::Config` when the offset
/// is not positive or the timestamp cannot be represented.
pub fn expiration_for(policy: &RotationPolicy, now: DateTime<Utc>) -> Result<String> {
    let lifetime = policy.expiry_delta()?;
    let expires_at = now
        .trunc_subsecs(0)
        .checked_add_signed(lifetime)
        .ok_or_else(|| {
            Error::Config(format!(
                "credential expiry {} seconds after {} is out of range",
                lifetime.num_seconds(),
                now
            ))
        })?;
    Ok(format!("{}Z", expires_at.format("%Y-%m-%dT%H:%M:%S")))
}

/// Builds the credential document for a freshly created key.
///
/// # Arguments
/// * `key` - The key returned by the create call; it must carry its secret.
/// * `policy` - Supplies the credential lifetime.
/// * `now` - Reference time for the expiry.
///
/// # Returns
/// The document, `Error::MissingSecret` for a key without secret material, or
/// `Error::Config` when the expiry cannot be computed.
pub fn materialize(
    key: &AccessKey,
    policy: &RotationPolicy,
    now: DateTime<Utc>,
) -> Result<CredentialDocument> {
    let secret = key
        .secret
        .clone()
        .ok_or_else(|| Error::MissingSecret(key.name.clone()))?;

    let expiration = expiration_for(policy, now)?;
    tracing::debug!(expiration = %expiration, "Credentials will expire at {}.", expiration);

    Ok(CredentialDocument {
        version: CREDENTIAL_VERSION,
        access_key_id: key.name.clone(),
        secret_access_key: secret,
        session_token: String::new(),
        expiration,
    })
}
