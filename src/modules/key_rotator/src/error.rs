/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/error.rs
*
* Error type shared by the rotation engine and its collaborators.
*
* SPDX-License-Identifier: Apache-2.0 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("FlashBlade request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FlashBlade API error ({status}) during {operation}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("FlashBlade login did not return an x-auth-token header")]
    MissingAuthToken,

    #[error("FlashBlade does not advertise a supported 2.x REST API version")]
    UnsupportedApiVersion,

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubernetes client configuration error: {0}")]
    KubeConfig(String),

    #[error("Secret '{namespace}/{name}' does not exist; it must be created before rotation")]
    SecretNotFound { namespace: String, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Access key '{0}' carries no secret; only freshly created keys can be published")]
    MissingSecret(String),

    #[error("Deleting access key(s) {0:?} was rejected by the array")]
    DeleteRejected(Vec<String>),

    #[error("Creating an access key for user '{0}' was rejected by the array")]
    CreateRejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
