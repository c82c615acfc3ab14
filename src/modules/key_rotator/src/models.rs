/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/models.rs
*
* Typed records for the objects the rotator reads from the array. FlashBlade
* responses are mapped into these at the client boundary; nothing past the
* client touches raw JSON.
*
* SPDX-License-Identifier: Apache-2.0 */

use std::fmt;

use serde::{Deserialize, Serialize};

/// A back-reference to another FlashBlade object (`{"id": .., "name": ..}`).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One object-store access key.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct AccessKey {
    /// The access key id, as assigned by the array.
    pub name: String,

    /// Only present on the response to a create call.
    #[serde(rename = "secret_access_key", default)]
    pub secret: Option<String>,

    /// Issuance time, epoch milliseconds.
    #[serde(rename = "created", default)]
    pub created_ms: i64,

    #[serde(rename = "user", default)]
    pub owner: Reference,

    #[serde(default)]
    pub enabled: Option<bool>,
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKey")
            .field("name", &self.name)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("created_ms", &self.created_ms)
            .field("owner", &self.owner)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// An object-store user whose keys are managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name, `account/user`.
    pub name: String,
    /// Opaque array id. Known when the user was resolved by listing.
    pub id: Option<String>,
    /// Owning account name, when known.
    pub account: Option<String>,
}

impl Identity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            account: None,
        }
    }

    /// How the array should be addressed for this user: by id when we have
    /// one, otherwise by name.
    pub fn user_ref(&self) -> UserRef<'_> {
        match &self.id {
            Some(id) => UserRef::Id(id),
            None => UserRef::Name(&self.name),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRef<'a> {
    Id(&'a str),
    Name(&'a str),
}

/// Raw user record as listed by the array.
#[derive(Deserialize, Debug, Clone)]
pub struct ObjectStoreUser {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub account: Option<Reference>,
}

impl From<ObjectStoreUser> for Identity {
    fn from(user: ObjectStoreUser) -> Self {
        Identity {
            name: user.name,
            id: user.id,
            account: user.account.and_then(|a| a.name),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreAccount {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}
