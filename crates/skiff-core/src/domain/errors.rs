//! Error taxonomy, one enum per concern.

use thiserror::Error;

/// Lease store adapter failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional update found the stored record no longer matching the
    /// guard. For claims this means another claimant won the race.
    #[error("conditional update failed")]
    ConditionFailed,

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Queue-level outcomes.
///
/// `ClaimConflict` and `ClaimUnavailable` are normal control flow for the
/// dispatch loop, not faults; it logs them and waits for the next tick.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Another claimant locked the candidate between scan and update.
    #[error("another claimant won the lock")]
    ClaimConflict,

    /// No unlocked or lease-expired item in the queue's namespace.
    #[error("no items available in queue")]
    ClaimUnavailable,

    /// The store write for a new item failed; the caller holds no item.
    #[error("failed to persist queue item: {0}")]
    Persist(#[source] StoreError),

    /// Any other adapter failure during claim/complete/release.
    #[error("lease store error: {0}")]
    Store(#[from] StoreError),
}

/// Gateway fetch failures for a single CID.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid gateway base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("failed to decode metadata body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Metadata store failures.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("metadata store error: {0}")]
    Backend(String),
}

/// Aggregated outcome of processing one item.
///
/// Per-CID failures are collected, never raised mid-item, so sibling CIDs
/// still get their chance. A non-empty list blocks completion and leaves the
/// item to be reclaimed whole once its lease expires.
#[derive(Debug, Error)]
#[error("failed to resolve cids: {}", failures.join(", "))]
pub struct WorkError {
    pub failures: Vec<String>,
}

/// Fatal startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),
}
