/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/config.rs
*
* Run configuration. Every option can be given as a flag or through the
* environment variable named next to it; in a container the environment is
* the usual source. The value is built once in `main` and handed by reference
* to whatever needs it.
*
* SPDX-License-Identifier: Apache-2.0 */

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use tracing_layer::LogFormat;

use crate::credentials::expiration_for;
use crate::error::{Error, Result};
use crate::identity::IdentitySource;
use crate::policy::RotationPolicy;
use crate::providers::FlashBladeSettings;

pub const DEFAULT_MIN_AGE_SECS: u64 = 43_200;
pub const DEFAULT_AGE_VARIANCE_SECS: u64 = 900;

/// A set of names given either as a JSON array (`["a","b"]`) or as a comma
/// separated list (`a,b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList(pub BTreeSet<String>);

impl NameList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for NameList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        NameList(iter.into_iter().map(Into::into).collect())
    }
}

pub fn parse_name_list(raw: &str) -> std::result::Result<NameList, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(NameList::default());
    }
    if raw.starts_with('[') {
        let names: Vec<String> =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON list '{}': {}", raw, e))?;
        return Ok(names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect());
    }
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect())
}

fn parse_log_format(raw: &str) -> std::result::Result<LogFormat, String> {
    raw.parse().map_err(|e: tracing_layer::InitError| e.to_string())
}

#[derive(Args, Clone)]
pub struct Settings {
    /// Default log level; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format: `json` or `text`.
    #[arg(long, env = "LOG_FORMAT", default_value_t = LogFormat::Json, value_parser = parse_log_format, global = true)]
    pub log_format: LogFormat,

    /// FlashBlade management address.
    #[arg(long, env = "FB_URL")]
    pub fb_url: Option<String>,

    /// FlashBlade API token.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Validate the FlashBlade TLS certificate. The environment value may be
    /// any of `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`.
    #[arg(long, env = "VERIFY_FB_TLS", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub verify_fb_tls: bool,

    /// Timeout, in seconds, for each FlashBlade request.
    #[arg(long, env = "FB_TIMEOUT", default_value_t = 15)]
    pub fb_timeout: u64,

    /// Where the managed users come from.
    #[arg(long, env = "IDENTITY_SOURCE", value_enum, default_value_t = IdentitySource::Users)]
    pub identity_source: IdentitySource,

    /// Users whose keys are rotated (`users` source).
    #[arg(long, env = "INTERESTING_USERS", value_parser = parse_name_list, default_value = "")]
    pub interesting_users: NameList,

    /// Accounts whose users are rotated (`accounts` source).
    #[arg(long, env = "INTERESTING_OBJECT_ACCOUNTS", value_parser = parse_name_list, default_value = "")]
    pub interesting_object_accounts: NameList,

    /// Users skipped even though their account is selected (`accounts` source).
    #[arg(long, env = "EXCLUDED_USER_NAMES", value_parser = parse_name_list, default_value = "")]
    pub excluded_user_names: NameList,

    /// Minimum age, in seconds, before a key may be replaced.
    #[arg(long, env = "ACCESS_KEY_MIN_AGE", default_value_t = DEFAULT_MIN_AGE_SECS)]
    pub access_key_min_age: u64,

    /// Scheduling tolerance, in seconds, subtracted from the minimum age.
    #[arg(long, env = "ACCESS_KEY_AGE_VARIANCE", default_value_t = DEFAULT_AGE_VARIANCE_SECS)]
    pub access_key_age_variance: u64,

    /// Publish to a Kubernetes Secret instead of a local file.
    #[arg(long, env = "K8S_MODE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub k8s_mode: bool,

    #[arg(long, env = "CREDENTIALS_OUTPUT_PATH", default_value = "/output/credentials.json")]
    pub credentials_output_path: PathBuf,

    #[arg(long, env = "K8S_NAMESPACE")]
    pub k8s_namespace: Option<String>,

    #[arg(long, env = "K8S_SECRET_NAME")]
    pub k8s_secret_name: Option<String>,

    /// Key inside the Secret's `data` that receives the document.
    #[arg(long, env = "K8S_SECRET_KEY")]
    pub k8s_secret_key: Option<String>,

    /// Kubeconfig file. In-cluster configuration is used when unset.
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("fb_url", &self.fb_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("verify_fb_tls", &self.verify_fb_tls)
            .field("fb_timeout", &self.fb_timeout)
            .field("identity_source", &self.identity_source)
            .field("interesting_users", &self.interesting_users)
            .field("interesting_object_accounts", &self.interesting_object_accounts)
            .field("excluded_user_names", &self.excluded_user_names)
            .field("access_key_min_age", &self.access_key_min_age)
            .field("access_key_age_variance", &self.access_key_age_variance)
            .field("k8s_mode", &self.k8s_mode)
            .field("credentials_output_path", &self.credentials_output_path)
            .field("k8s_namespace", &self.k8s_namespace)
            .field("k8s_secret_name", &self.k8s_secret_name)
            .field("k8s_secret_key", &self.k8s_secret_key)
            .field("kubeconfig", &self.kubeconfig)
            .finish()
    }
}

impl Settings {
    /// Checks everything a rotation run needs before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.fb_url.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config("FB_URL must be set".to_string()));
        }
        if self.api_token.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config("API_TOKEN must be set".to_string()));
        }
        if self.fb_timeout == 0 {
            return Err(Error::Config("FB_TIMEOUT must be greater than zero".to_string()));
        }
        if self.access_key_min_age == 0 {
            return Err(Error::Config(
                "ACCESS_KEY_MIN_AGE must be greater than zero".to_string(),
            ));
        }
        if self.access_key_age_variance > self.access_key_min_age {
            return Err(Error::Config(format!(
                "ACCESS_KEY_AGE_VARIANCE ({}) must not exceed ACCESS_KEY_MIN_AGE ({})",
                self.access_key_age_variance, self.access_key_min_age
            )));
        }
        let policy = self.policy()?;
        expiration_for(&policy, Utc::now())?;
        if self.k8s_mode {
            for (value, name) in [
                (&self.k8s_namespace, "K8S_NAMESPACE"),
                (&self.k8s_secret_name, "K8S_SECRET_NAME"),
                (&self.k8s_secret_key, "K8S_SECRET_KEY"),
            ] {
                if value.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::Config(format!("{} must be set in k8s mode", name)));
                }
            }
        }
        Ok(())
    }

    pub fn policy(&self) -> Result<RotationPolicy> {
        RotationPolicy::from_secs(self.access_key_min_age, self.access_key_age_variance)
    }

    pub fn flashblade(&self) -> Result<FlashBladeSettings> {
        let url = self
            .fb_url
            .clone()
            .ok_or_else(|| Error::Config("FB_URL must be set".to_string()))?;
        let api_token = self
            .api_token
            .clone()
            .ok_or_else(|| Error::Config("API_TOKEN must be set".to_string()))?;
        Ok(FlashBladeSettings {
            url,
            api_token,
            verify_tls: self.verify_fb_tls,
            timeout: Duration::from_secs(self.fb_timeout),
        })
    }
}
