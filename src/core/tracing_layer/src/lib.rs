/*
* Copyright (C) 2025 Pedro Henrique / phkaiser13
*
* File: src/core/tracing_layer/src/lib.rs
*
* Installs the process-wide `tracing` subscriber. `RUST_LOG` always wins when
* it is set; otherwise the level handed in by the caller (usually taken from
* the `LOG_LEVEL` environment variable) becomes the default directive.
*
* JSON output keeps every record, errors included, on a single line so that
* log collectors never split one event across several entries.
*
* SPDX-License-Identifier: Apache-2.0
*/

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format of the log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human readable lines.
    Text,
}

impl FromStr for LogFormat {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "plain" => Ok(LogFormat::Text),
            other => Err(InitError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("unknown log format '{0}', expected 'json' or 'text'")]
    UnknownFormat(String),

    #[error("invalid log level '{level}': {source}")]
    InvalidLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Builds the filter: `RUST_LOG` if present and valid, else `default_level`.
pub fn build_filter(default_level: &str) -> Result<EnvFilter, InitError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = default_level.trim().to_ascii_lowercase();
    EnvFilter::try_new(&level).map_err(|source| InitError::InvalidLevel { level, source })
}

/// Installs the global subscriber. Must be called once, before any logging.
pub fn init(default_level: &str, format: LogFormat) -> Result<(), InitError> {
    let filter = build_filter(default_level)?;

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}
