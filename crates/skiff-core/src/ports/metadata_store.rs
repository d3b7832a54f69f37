//! Metadata store port.

use async_trait::async_trait;

use crate::domain::{Metadata, PersistError};

/// Durable home of the per-CID metadata records.
///
/// `create` and `update` are both upsert-by-id. The engine retries whole
/// items after lease expiry, so a CID that already succeeded once simply
/// gets written again; the store must treat that as an overwrite, never a
/// duplicate.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create(&self, record: Metadata) -> Result<(), PersistError>;

    async fn read(&self, id: &str) -> Result<Metadata, PersistError>;

    async fn update(&self, record: Metadata) -> Result<(), PersistError>;

    async fn delete(&self, id: &str) -> Result<(), PersistError>;

    /// All records whose id begins with `prefix`.
    async fn scan(&self, prefix: &str) -> Result<Vec<Metadata>, PersistError>;
}
