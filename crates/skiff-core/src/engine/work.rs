//! Per-item work function.

use std::sync::Arc;

use tracing::error;

use crate::domain::{QueueItem, WorkError};
use crate::ports::{Gateway, MetadataStore};

/// Resolves every CID of an item and upserts one metadata record each.
///
/// Failures are collected per CID, not raised, so one bad identifier never
/// starves its siblings. The aggregated [`WorkError`] is what stops the
/// worker pool from completing the item; the whole batch then comes back
/// after lease expiry, which is why the metadata writes must be idempotent.
pub struct ItemProcessor {
    gateway: Arc<dyn Gateway>,
    metadata_store: Arc<dyn MetadataStore>,
}

impl ItemProcessor {
    pub fn new(gateway: Arc<dyn Gateway>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self {
            gateway,
            metadata_store,
        }
    }

    pub async fn process(&self, item: &QueueItem) -> Result<(), WorkError> {
        let mut failures = Vec::new();

        for cid in &item.payload.cids {
            let metadata = match self.gateway.fetch(cid).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    error!(cid = %cid, error = %err, "failed to fetch cid metadata");
                    failures.push(cid.clone());
                    continue;
                }
            };

            if let Err(err) = self.metadata_store.create(metadata).await {
                error!(cid = %cid, error = %err, "failed to persist cid metadata");
                failures.push(cid.clone());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(WorkError { failures })
        }
    }
}
