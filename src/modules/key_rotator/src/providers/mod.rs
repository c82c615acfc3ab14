/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/providers/mod.rs
*
* The `StorageClient` trait is the seam between the rotation engine and the
* storage array. The engine only ever sees typed records; the FlashBlade
* implementation lives in `flashblade.rs`.
*
* SPDX-License-Identifier: Apache-2.0 */

pub mod flashblade;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AccessKey, Identity, ObjectStoreAccount};

pub use flashblade::{FlashBladeClient, FlashBladeSettings};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Whether an object-store user with this name exists. A non-2xx reply
    /// is logged and reported as `false`; transport and decoding failures
    /// are returned as `Err`.
    async fn user_exists(&self, name: &str) -> Result<bool>;

    /// All keys currently held by `identity`; empty when it has none.
    async fn list_keys(&self, identity: &Identity) -> Result<Vec<AccessKey>>;

    /// Creates a key. `None` means the array refused; the response carries
    /// the secret only in the `Some` case.
    async fn create_key(&self, identity: &Identity) -> Result<Option<AccessKey>>;

    /// Deletes the named keys. `false` means the array refused.
    async fn delete_keys(&self, names: &[String]) -> Result<bool>;

    async fn list_accounts(&self) -> Result<Vec<ObjectStoreAccount>>;

    async fn list_users(&self) -> Result<Vec<Identity>>;
}
