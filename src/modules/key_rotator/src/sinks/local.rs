/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/sinks/local.rs
*
* Writes the credential document to a file, replacing whatever was there.
*
* SPDX-License-Identifier: Apache-2.0 */

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::credentials::CredentialDocument;
use crate::error::Result;
use crate::sinks::SecretSink;

pub struct LocalFileSink {
    path: PathBuf,
}

impl LocalFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretSink for LocalFileSink {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn publish(&self, document: &CredentialDocument) -> Result<()> {
        tokio::fs::write(&self.path, document.to_json()?).await?;
        tracing::info!(path = %self.path.display(), "Updated local credentials file");
        Ok(())
    }
}
