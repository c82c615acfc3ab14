/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/policy.rs
*
* Key-age policy. A key set is only touched once every key in it is at least
* `min_age - variance` seconds old; the variance absorbs scheduler jitter so a
* job firing a few minutes early does not flip the decision.
*
* SPDX-License-Identifier: Apache-2.0 */

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{Error, Result};
use crate::models::AccessKey;

/// Age thresholds, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub min_age: i64,
    pub variance: i64,
}

impl RotationPolicy {
    pub fn new(min_age: i64, variance: i64) -> Self {
        Self { min_age, variance }
    }

    /// Builds a policy from configured second counts.
    ///
    /// # Arguments
    /// * `min_age` - Minimum key age before replacement, in seconds.
    /// * `variance` - Scheduling tolerance subtracted from `min_age`.
    ///
    /// # Returns
    /// The policy, or `Error::Config` when either value does not fit in an
    /// `i64` or the resulting credential lifetime is not a valid `TimeDelta`.
    pub fn from_secs(min_age: u64, variance: u64) -> Result<Self> {
        let min_age = i64::try_from(min_age).map_err(|_| {
            Error::Config(format!("ACCESS_KEY_MIN_AGE ({}) is out of range", min_age))
        })?;
        let variance = i64::try_from(variance).map_err(|_| {
            Error::Config(format!("ACCESS_KEY_AGE_VARIANCE ({}) is out of range", variance))
        })?;

        let policy = Self::new(min_age, variance);
        policy.expiry_delta()?;
        Ok(policy)
    }

    pub fn min_allowable_age(&self) -> i64 {
        self.min_age - self.variance
    }

    /// Lifetime advertised on a freshly published credential: the minimum
    /// age, half of it again, plus the variance. Integer division matches
    /// truncating the fractional half. `None` on overflow.
    pub fn expiry_offset(&self) -> Option<i64> {
        self.min_age
            .checked_add(self.min_age / 2)?
            .checked_add(self.variance)
    }

    /// `expiry_offset` as a positive `TimeDelta`.
    pub fn expiry_delta(&self) -> Result<TimeDelta> {
        self.expiry_offset()
            .filter(|offset| *offset > 0)
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                Error::Config(format!(
                    "credential lifetime for ACCESS_KEY_MIN_AGE={} and ACCESS_KEY_AGE_VARIANCE={} is out of range",
                    self.min_age, self.variance
                ))
            })
    }
}

/// Age of `key` in seconds at `now`. `now` is truncated to whole seconds first.
pub fn key_age_seconds(key: &AccessKey, now: DateTime<Utc>) -> f64 {
    now.timestamp() as f64 - key.created_ms as f64 / 1000.0
}

/// True when any key in `keys` is younger than the minimum allowable age.
pub fn is_too_recent(keys: &[AccessKey], now: DateTime<Utc>, policy: &RotationPolicy) -> bool {
    let min_allowable_age = policy.min_allowable_age() as f64;
    tracing::debug!(min_allowable_age, "Checking key ages");
    keys.iter()
        .any(|key| key_age_seconds(key, now) < min_allowable_age)
}
