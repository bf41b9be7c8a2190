//! Sync engine configuration.
//!
//! Defaults are suitable for interactive clients; every value can be
//! overridden through `QUIRE_SYNC_*` environment variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::sync::RetryPolicy;

const DEFAULT_MAX_NETWORK_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY_MS: u64 = 100;
const DEFAULT_MAX_DELAY_MS: u64 = 2_000;
const DEFAULT_MAX_REVISION_RETRIES: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Retry budgets for one sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Backoff for transient store failures
    pub network: RetryPolicy,
    /// Restarts allowed after the remote revision moved during a push.
    /// Counted separately from network retries.
    pub max_revision_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            network: RetryPolicy::new(
                DEFAULT_MAX_NETWORK_ATTEMPTS,
                Duration::from_millis(DEFAULT_BASE_DELAY_MS),
                Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            ),
            max_revision_retries: DEFAULT_MAX_REVISION_RETRIES,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_attempts = parse_or_default(
            &lookup,
            "QUIRE_SYNC_MAX_NETWORK_ATTEMPTS",
            DEFAULT_MAX_NETWORK_ATTEMPTS,
        )?;
        if !(1..=10).contains(&max_attempts) {
            return Err(ConfigError::Invalid(
                "QUIRE_SYNC_MAX_NETWORK_ATTEMPTS must be in [1, 10]".to_string(),
            ));
        }

        let base_delay_ms =
            parse_or_default(&lookup, "QUIRE_SYNC_BASE_DELAY_MS", DEFAULT_BASE_DELAY_MS)?;
        if !(1..=60_000).contains(&base_delay_ms) {
            return Err(ConfigError::Invalid(
                "QUIRE_SYNC_BASE_DELAY_MS must be in [1, 60000]".to_string(),
            ));
        }

        let max_delay_ms = parse_or_default(
            &lookup,
            "QUIRE_SYNC_MAX_DELAY_MS",
            DEFAULT_MAX_DELAY_MS.max(base_delay_ms),
        )?;
        if max_delay_ms < base_delay_ms {
            return Err(ConfigError::Invalid(
                "QUIRE_SYNC_MAX_DELAY_MS must be >= QUIRE_SYNC_BASE_DELAY_MS".to_string(),
            ));
        }

        let max_revision_retries = parse_or_default(
            &lookup,
            "QUIRE_SYNC_MAX_REVISION_RETRIES",
            DEFAULT_MAX_REVISION_RETRIES,
        )?;
        if max_revision_retries > 10 {
            return Err(ConfigError::Invalid(
                "QUIRE_SYNC_MAX_REVISION_RETRIES must be in [0, 10]".to_string(),
            ));
        }

        Ok(Self {
            network: RetryPolicy::new(
                max_attempts,
                Duration::from_millis(base_delay_ms),
                Duration::from_millis(max_delay_ms),
            ),
            max_revision_retries,
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    let Some(raw) = lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Ok(default);
    };

    raw.parse::<T>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.network.max_attempts(), 4);
        assert_eq!(config.max_revision_retries, 3);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("QUIRE_SYNC_MAX_NETWORK_ATTEMPTS", "6"),
            ("QUIRE_SYNC_BASE_DELAY_MS", " 50 "),
            ("QUIRE_SYNC_MAX_DELAY_MS", "400"),
            ("QUIRE_SYNC_MAX_REVISION_RETRIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.network.max_attempts(), 6);
        assert_eq!(config.network.delay_for(1), Duration::from_millis(50));
        assert_eq!(config.network.delay_for(10), Duration::from_millis(400));
        assert_eq!(config.max_revision_retries, 0);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(SyncConfig::from_lookup(lookup_from(&[(
            "QUIRE_SYNC_MAX_NETWORK_ATTEMPTS",
            "0"
        )]))
        .is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(
            "QUIRE_SYNC_MAX_REVISION_RETRIES",
            "11"
        )]))
        .is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[
            ("QUIRE_SYNC_BASE_DELAY_MS", "500"),
            ("QUIRE_SYNC_MAX_DELAY_MS", "100"),
        ]))
        .is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(
            "QUIRE_SYNC_BASE_DELAY_MS",
            "fast"
        )]))
        .is_err());
    }
}
