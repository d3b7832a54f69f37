//! Environment-driven configuration.
//!
//! Only the table name is mandatory. Everything else falls back to a
//! default, and unparseable values are logged and replaced rather than
//! aborting startup.

use std::time::Duration;

use tracing::warn;

use crate::domain::ConfigError;

pub const DEFAULT_NAMESPACE: &str = "ipfs";
pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CONCURRENCY: usize = 1;
/// Fallback when a concurrency value is present but unparseable.
pub const FALLBACK_CONCURRENCY: usize = 5;
/// The single lease window governing every expiry decision.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct Config {
    /// Table (or equivalent) holding both queue items and metadata records.
    pub table: String,
    /// Queue namespace; items live under the id prefix `queue-{namespace}-`.
    pub namespace: String,
    pub gateway_url: String,
    pub poll_interval: Duration,
    pub concurrency: usize,
    pub lease_duration: Duration,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an injectable lookup, so tests do not
    /// touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table = lookup("SKIFF_TABLE").ok_or(ConfigError::MissingVar("SKIFF_TABLE"))?;

        let namespace =
            non_empty(lookup("SKIFF_QUEUE_NAMESPACE")).unwrap_or_else(|| DEFAULT_NAMESPACE.into());
        let gateway_url =
            non_empty(lookup("SKIFF_GATEWAY_URL")).unwrap_or_else(|| DEFAULT_GATEWAY_URL.into());

        let poll_interval = duration_secs(
            lookup("SKIFF_POLL_INTERVAL_SECS"),
            "SKIFF_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL,
        );
        let lease_duration = duration_secs(
            lookup("SKIFF_LEASE_DURATION_SECS"),
            "SKIFF_LEASE_DURATION_SECS",
            DEFAULT_LEASE_DURATION,
        );

        let concurrency = match lookup("SKIFF_CONCURRENCY") {
            None => DEFAULT_CONCURRENCY,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(value = %raw, "failed to parse SKIFF_CONCURRENCY, using fallback");
                    FALLBACK_CONCURRENCY
                }
            },
        };

        Ok(Self {
            table,
            namespace,
            gateway_url,
            poll_interval,
            concurrency,
            lease_duration,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn duration_secs(value: Option<String>, key: &str, default: Duration) -> Duration {
    match value {
        None => default,
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(key, value = %raw, "failed to parse duration, using default");
                default
            }
        },
    }
}
