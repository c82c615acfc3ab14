/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/lib.rs
*
* Rotation engine for FlashBlade object-store access keys. Each run looks at
* the keys of every configured user, replaces the ones that are old enough
* while never holding more than two, and publishes the newest key as an AWS
* `credential_process` document to a local file or a Kubernetes Secret.
*
* Module map:
* - `policy`, `credentials`: pure age checks and the credential document.
* - `rotation_logic`: per-user decision and its execution.
* - `identity`: which users are managed.
* - `providers`: the `StorageClient` seam and the FlashBlade REST client.
* - `sinks`: the `SecretSink` seam, local file and Kubernetes Secret.
* - `config`, `cli`, `runner`: settings, command line and the batch run.
*
* SPDX-License-Identifier: Apache-2.0 */

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod models;
pub mod policy;
pub mod providers;
pub mod rotation_logic;
pub mod runner;
pub mod sinks;

pub use config::Settings;
pub use error::{Error, Result};
pub use rotation_logic::{RotationOutcome, Rotator, RunSummary};
