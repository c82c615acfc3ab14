/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/sinks/mod.rs
*
* Destinations for a freshly minted credential document. The sink target is
* fixed when the sink is built; `publish` only receives the document.
*
* SPDX-License-Identifier: Apache-2.0 */

pub mod kubernetes;
pub mod local;

use async_trait::async_trait;

use crate::config::Settings;
use crate::credentials::CredentialDocument;
use crate::error::{Error, Result};

pub use kubernetes::{KubernetesSecretSink, SecretTarget};
pub use local::LocalFileSink;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretSink: Send + Sync {
    /// Short description of the destination, for logs.
    fn describe(&self) -> String;

    async fn publish(&self, document: &CredentialDocument) -> Result<()>;
}

/// Builds the sink selected by `K8S_MODE`.
pub async fn from_settings(settings: &Settings) -> Result<Box<dyn SecretSink>> {
    if settings.k8s_mode {
        let target = SecretTarget {
            namespace: required(&settings.k8s_namespace, "K8S_NAMESPACE")?,
            name: required(&settings.k8s_secret_name, "K8S_SECRET_NAME")?,
            key: required(&settings.k8s_secret_key, "K8S_SECRET_KEY")?,
        };
        let client = kubernetes::initialize_client(settings.kubeconfig.as_deref()).await?;
        Ok(Box::new(KubernetesSecretSink::new(client, target)))
    } else {
        Ok(Box::new(LocalFileSink::new(&settings.credentials_output_path)))
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} must be set in k8s mode", name)))
}
