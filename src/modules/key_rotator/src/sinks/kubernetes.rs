/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/sinks/kubernetes.rs
*
* Publishes the credential document into one key of an existing Kubernetes
* `Secret`. The Secret is never created here: it is expected to be managed
* alongside the consuming workload, and a missing Secret is an error.
*
* The document is JSON-serialized, base64 encoded and written with a JSON
* merge patch on `data.<key>`, leaving any other keys in the Secret intact.
*
* SPDX-License-Identifier: Apache-2.0 */

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Api, Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use serde_json::json;

use crate::credentials::CredentialDocument;
use crate::error::{Error, Result};
use crate::sinks::SecretSink;

/// Coordinates of the Secret key receiving the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretTarget {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// Builds a client from an explicit kubeconfig file, or from the in-cluster
/// service account when no path is given.
pub async fn initialize_client(kubeconfig_path: Option<&str>) -> Result<Client> {
    let config = match kubeconfig_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| Error::KubeConfig(format!("reading '{}': {}", path, e)))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::KubeConfig(format!("loading '{}': {}", path, e)))?
        }
        None => Config::incluster().map_err(|e| Error::KubeConfig(e.to_string()))?,
    };
    Ok(Client::try_from(config)?)
}

pub struct KubernetesSecretSink {
    client: Client,
    target: SecretTarget,
}

impl KubernetesSecretSink {
    pub fn new(client: Client, target: SecretTarget) -> Self {
        Self { client, target }
    }

    async fn secret_exists(&self, api: &Api<Secret>) -> Result<bool> {
        let secret = api.get_opt(&self.target.name).await?;
        tracing::debug!(found = secret.is_some(), secret = %self.target.name, "Looked up target Secret");
        Ok(secret.is_some())
    }
}

#[async_trait]
impl SecretSink for KubernetesSecretSink {
    fn describe(&self) -> String {
        format!(
            "secret {}/{} key {}",
            self.target.namespace, self.target.name, self.target.key
        )
    }

    async fn publish(&self, document: &CredentialDocument) -> Result<()> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.target.namespace);

        if !self.secret_exists(&api).await? {
            tracing::error!(
                namespace = %self.target.namespace,
                secret = %self.target.name,
                "Specified secret does not exist"
            );
            return Err(Error::SecretNotFound {
                namespace: self.target.namespace.clone(),
                name: self.target.name.clone(),
            });
        }

        let mut data = BTreeMap::new();
        data.insert(self.target.key.clone(), document.to_base64()?);
        let patch = json!({ "data": data });

        api.patch(&self.target.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        tracing::info!(
            namespace = %self.target.namespace,
            secret = %self.target.name,
            key = %self.target.key,
            "Updated Kubernetes secret"
        );
        Ok(())
    }
}
