//! Queue items and their persisted layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of a queue item.
///
/// Rendered as `queue-{namespace}-{ulid}`. The namespace prefix is what the
/// claim scan keys on, so every item of one queue shares it; the ULID tail
/// keeps ids unique without coordination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh id for `namespace`, stamped with `now`.
    pub fn generate(namespace: &str, now: DateTime<Utc>) -> Self {
        let timestamp_ms = now.timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        Self(format!("queue-{namespace}-{ulid}"))
    }

    /// The id prefix shared by every item of `namespace`.
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("queue-{namespace}-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Work payload carried by a queue item.
///
/// One required field: the ordered batch of content identifiers to resolve.
/// Modelled as a struct instead of an open map so a malformed payload fails
/// at decode time, not deep inside a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub cids: Vec<String>,
}

impl Payload {
    pub fn new(cids: Vec<String>) -> Self {
        Self { cids }
    }
}

/// One unit of work as handed to a claimant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub payload: Payload,
    /// Creation time, unix seconds.
    pub created_at: i64,
}

/// Persisted layout of an item plus its lease, as stored by a [`LeaseStore`].
///
/// Lease invariant: `lock_time` is `Some` iff `locked` is true. The only
/// writers are [`ItemRecord::new`] and the store's conditional lease update,
/// both of which keep the pair in step.
///
/// [`LeaseStore`]: crate::ports::LeaseStore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub payload: Payload,
    pub created_at: i64,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lock_time: Option<i64>,
}

impl ItemRecord {
    /// A fresh, unlocked record.
    pub fn new(id: ItemId, payload: Payload, created_at: i64) -> Self {
        Self {
            id,
            payload,
            created_at,
            locked: false,
            lock_time: None,
        }
    }

    /// View of the record as the item a claimant receives.
    pub fn item(&self) -> QueueItem {
        QueueItem {
            id: self.id.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_the_namespace_prefix() {
        let id = ItemId::generate("ipfs", Utc::now());
        assert!(id.as_str().starts_with(&ItemId::namespace_prefix("ipfs")));
    }

    #[test]
    fn generated_ids_are_unique() {
        let now = Utc::now();
        let a = ItemId::generate("ipfs", now);
        let b = ItemId::generate("ipfs", now);
        assert_ne!(a, b);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = ItemRecord::new(
            ItemId::generate("ipfs", Utc::now()),
            Payload::new(vec!["Qm1".into()]),
            1_700_000_000,
        );
        let json = serde_json::to_string(&record).unwrap();
        // Unlocked records must not serialize a lease time at all.
        assert!(!json.contains("lock_time"));
        let back: ItemRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
