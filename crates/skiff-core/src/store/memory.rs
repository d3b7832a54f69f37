//! In-memory store implementations.
//!
//! Development and test doubles for the store ports. A single async mutex
//! guards each map, which makes `update_lease` genuinely atomic: the guard
//! condition is re-evaluated against current state under the same lock that
//! applies the write, exactly the compare-and-swap a real backend provides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ItemId, ItemRecord, Metadata, PersistError, StoreError};
use crate::ports::{Filter, LeaseStore, LeaseUpdate, MetadataStore};

/// Map-backed [`LeaseStore`].
#[derive(Default)]
pub struct InMemoryLeaseStore {
    records: Arc<Mutex<HashMap<ItemId, ItemRecord>>>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (test visibility).
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn put(&self, record: ItemRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.get(id).cloned())
    }

    async fn scan(&self, filter: &Filter, limit: usize) -> Result<Vec<ItemRecord>, StoreError> {
        let records = self.records.lock().await;
        // HashMap iteration order stands in for a real backend's arbitrary
        // scan order.
        Ok(records
            .values()
            .filter(|record| filter.matches(record))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_lease(
        &self,
        id: &ItemId,
        condition: &Filter,
        update: LeaseUpdate,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !condition.matches(record) {
            return Err(StoreError::ConditionFailed);
        }
        record.locked = update.locked;
        record.lock_time = update.lock_time;
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.remove(id);
        Ok(())
    }
}

/// Map-backed [`MetadataStore`]. Create and update are both upserts.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: Arc<Mutex<HashMap<String, Metadata>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create(&self, record: Metadata) -> Result<(), PersistError> {
        let mut records = self.records.lock().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Metadata, PersistError> {
        let records = self.records.lock().await;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(id.to_string()))
    }

    async fn update(&self, record: Metadata) -> Result<(), PersistError> {
        self.create(record).await
    }

    async fn delete(&self, id: &str) -> Result<(), PersistError> {
        let mut records = self.records.lock().await;
        records.remove(id);
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<Metadata>, PersistError> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|record| record.id.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Payload;

    fn record(id: &str) -> ItemRecord {
        ItemRecord::new(
            ItemId::from(id.to_string()),
            Payload::new(vec!["Qm1".to_string()]),
            0,
        )
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_guard() {
        let store = InMemoryLeaseStore::new();
        store.put(record("queue-ipfs-a")).await.unwrap();
        let id = ItemId::from("queue-ipfs-a".to_string());

        store
            .update_lease(&id, &Filter::LockedEq(false), LeaseUpdate::lock(10))
            .await
            .unwrap();

        // Second claimant with the same guard loses.
        let err = store
            .update_lease(&id, &Filter::LockedEq(false), LeaseUpdate::lock(20))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed));

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.lock_time, Some(10));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let store = InMemoryLeaseStore::new();
        let err = store
            .update_lease(
                &ItemId::from("queue-ipfs-gone".to_string()),
                &Filter::LockedEq(false),
                LeaseUpdate::lock(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn scan_honors_filter_and_limit() {
        let store = InMemoryLeaseStore::new();
        store.put(record("queue-ipfs-a")).await.unwrap();
        store.put(record("queue-ipfs-b")).await.unwrap();
        store.put(record("queue-other-c")).await.unwrap();

        let hits = store
            .scan(&Filter::IdBeginsWith("queue-ipfs-".to_string()), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let limited = store
            .scan(&Filter::IdBeginsWith("queue-ipfs-".to_string()), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryLeaseStore::new();
        store.put(record("queue-ipfs-a")).await.unwrap();
        let id = ItemId::from("queue-ipfs-a".to_string());

        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn metadata_create_overwrites_by_id() {
        let store = InMemoryMetadataStore::new();
        store
            .create(Metadata {
                id: "Qm1".to_string(),
                name: "first".to_string(),
                ..Metadata::default()
            })
            .await
            .unwrap();
        store
            .create(Metadata {
                id: "Qm1".to_string(),
                name: "second".to_string(),
                ..Metadata::default()
            })
            .await
            .unwrap();

        assert_eq!(store.scan("Qm").await.unwrap().len(), 1);
        assert_eq!(store.read("Qm1").await.unwrap().name, "second");
    }
}
