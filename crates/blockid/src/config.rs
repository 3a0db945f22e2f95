//! Generator configuration.
//!
//! All values have production-ready defaults and can be overridden in code,
//! through environment variables ([`GeneratorConfig::from_env`]) or, with the
//! `serde` feature, deserialized from any serde format.
//!
//! ## Environment variables
//! - `BLOCKID_BATCH_SIZE`: ids reserved per store round trip (default: 100)
//! - `BLOCKID_INITIAL_VALUE`: counter assumed for unseen scopes (default: 0)
//! - `BLOCKID_MAX_ATTEMPTS`: conditional writes before giving up (default: 16)
//! - `BLOCKID_INITIAL_BACKOFF_MS`: first conflict backoff (default: 1)
//! - `BLOCKID_MAX_BACKOFF_MS`: backoff ceiling (default: 100)

use core::{str::FromStr, time::Duration};

use rand::Rng;

use crate::{Error, Result};

/// Default number of ids reserved per batch.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Counter value assumed for a scope that has no record in the store yet.
pub const DEFAULT_INITIAL_VALUE: u64 = 0;

/// Default number of conditional writes attempted per batch acquisition.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Default delay before the first retry after a write conflict.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1;

/// Default upper bound on the delay between retries.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 100;

/// Bounds the optimistic retry loop that runs when another instance wins the
/// race to extend a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    /// Maximum number of conditional writes per batch acquisition, including
    /// the first one.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Ceiling for the exponential backoff, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries up to `max_attempts` times without sleeping.
    ///
    /// Useful in tests and for in-process stores where a conflict resolves
    /// as soon as the winner's write is visible.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Returns the delay to wait after the `attempt`-th conflicting write
    /// (1-based).
    ///
    /// The base delay doubles with every attempt up to `max_backoff_ms`; the
    /// returned value is drawn uniformly from `[base / 2, base]` so that
    /// losers of the same round do not retry in lockstep.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63);
        let base = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        if base == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(base / 2..=base))
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid("max_attempts must be greater than 0"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::invalid(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Per-instance generator settings.
///
/// `batch_size` need not match across instances sharing a store; each
/// instance advances the shared counter by its own batch size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    /// Number of ids reserved per successful conditional write.
    pub batch_size: u64,
    /// Counter value used when the store has no record for a scope.
    pub initial_value: u64,
    /// Conflict retry bounds.
    pub retry: RetryPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            initial_value: DEFAULT_INITIAL_VALUE,
            retry: RetryPolicy::default(),
        }
    }
}

impl GeneratorConfig {
    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the counter value assumed for unseen scopes.
    #[must_use]
    pub const fn with_initial_value(mut self, initial_value: u64) -> Self {
        self.initial_value = initial_value;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks that the configuration can drive a generator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a zero batch size, a zero retry
    /// budget or an initial backoff larger than the backoff ceiling.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid("batch_size must be greater than 0"));
        }
        self.retry.validate()
    }

    /// Builds a configuration from `BLOCKID_*` environment variables.
    ///
    /// Unset variables fall back to their defaults. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a variable is set but cannot be
    /// parsed, or if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            batch_size: parse_var(&lookup, "BLOCKID_BATCH_SIZE", defaults.batch_size)?,
            initial_value: parse_var(&lookup, "BLOCKID_INITIAL_VALUE", defaults.initial_value)?,
            retry: RetryPolicy {
                max_attempts: parse_var(
                    &lookup,
                    "BLOCKID_MAX_ATTEMPTS",
                    defaults.retry.max_attempts,
                )?,
                initial_backoff_ms: parse_var(
                    &lookup,
                    "BLOCKID_INITIAL_BACKOFF_MS",
                    defaults.retry.initial_backoff_ms,
                )?,
                max_backoff_ms: parse_var(
                    &lookup,
                    "BLOCKID_MAX_BACKOFF_MS",
                    defaults.retry.max_backoff_ms,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::invalid(format!("{key}={raw:?}: {e}"))),
    }
}
