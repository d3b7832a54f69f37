//! Lease-based queue over a conditional key-value store.
//!
//! Design intent:
//! - The store's conditional write is the only concurrency primitive. A
//!   claim is scan-then-compare-and-swap; losing the swap is normal control
//!   flow ([`QueueError::ClaimConflict`]), and the caller retries on a later
//!   poll tick, never inside the call.
//! - Expiry is judged by the claimant at read time. Nothing sweeps leases in
//!   the background; an expired lease just makes the item eligible again for
//!   whoever scans next.
//! - Selection among eligible items is whatever order the store scans in.
//!   No FIFO.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{ItemId, ItemRecord, Payload, QueueError, QueueItem, StoreError};
use crate::ports::{Clock, Filter, LeaseStore, LeaseUpdate};

/// Queue contract: add, claim, complete.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Persist a new item, unlocked. On store failure the caller holds no
    /// item.
    async fn add_item(&self, payload: Payload) -> Result<ItemId, QueueError>;

    /// Claim one eligible item, taking its lease.
    ///
    /// Errors [`QueueError::ClaimUnavailable`] when nothing is eligible and
    /// [`QueueError::ClaimConflict`] when another claimant locked the
    /// candidate first.
    async fn claim_next(&self) -> Result<QueueItem, QueueError>;

    /// Remove a finished item. Idempotent: completing an id that no longer
    /// exists is a successful no-op.
    async fn complete(&self, id: &ItemId) -> Result<(), QueueError>;

    /// Hand a held lease back without completing the item, making it
    /// immediately claimable again.
    async fn release(&self, id: &ItemId) -> Result<(), QueueError>;
}

/// The unlocked-or-expired predicate every claim is guarded by.
///
/// An item is claimable when it is unlocked, or locked with a lease stamped
/// before `now - lease_duration`. A locked record missing its stamp counts
/// as expired.
fn claimable(now_nanos: i64, lease_duration: Duration) -> Filter {
    let cutoff = now_nanos.saturating_sub(lease_duration.as_nanos() as i64);
    Filter::or(vec![
        Filter::LockedEq(false),
        Filter::and(vec![
            Filter::LockedEq(true),
            Filter::or(vec![
                Filter::LockTimeLessThan(cutoff),
                Filter::LockTimeAbsent,
            ]),
        ]),
    ])
}

fn timestamp_nanos(at: DateTime<Utc>) -> i64 {
    // i64 nanoseconds represent dates through 2262.
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Queue implementation over a [`LeaseStore`].
///
/// Items live under the id prefix `queue-{namespace}-`, so several queues
/// can share one table without seeing each other's work.
pub struct LeaseQueue<S, C> {
    namespace: String,
    lease_duration: Duration,
    store: S,
    clock: C,
}

impl<S, C> LeaseQueue<S, C>
where
    S: LeaseStore,
    C: Clock,
{
    pub fn new(namespace: impl Into<String>, lease_duration: Duration, store: S, clock: C) -> Self {
        Self {
            namespace: namespace.into(),
            lease_duration,
            store,
            clock,
        }
    }

    fn eligible_filter(&self, now_nanos: i64) -> Filter {
        Filter::and(vec![
            Filter::IdBeginsWith(ItemId::namespace_prefix(&self.namespace)),
            claimable(now_nanos, self.lease_duration),
        ])
    }
}

#[async_trait]
impl<S, C> Queue for LeaseQueue<S, C>
where
    S: LeaseStore,
    C: Clock,
{
    async fn add_item(&self, payload: Payload) -> Result<ItemId, QueueError> {
        let now = self.clock.now();
        let id = ItemId::generate(&self.namespace, now);
        let record = ItemRecord::new(id.clone(), payload, now.timestamp());

        self.store.put(record).await.map_err(QueueError::Persist)?;
        info!(id = %id, "item added to queue");
        Ok(id)
    }

    async fn claim_next(&self) -> Result<QueueItem, QueueError> {
        let now_nanos = timestamp_nanos(self.clock.now());

        let mut candidates = self.store.scan(&self.eligible_filter(now_nanos), 1).await?;
        let Some(record) = candidates.pop() else {
            debug!(namespace = %self.namespace, "no items available in queue");
            return Err(QueueError::ClaimUnavailable);
        };

        // The store re-checks the claimable condition inside the update, so
        // a racing claimant cannot slip in between the scan and the lock.
        let guard = claimable(now_nanos, self.lease_duration);
        match self
            .store
            .update_lease(&record.id, &guard, LeaseUpdate::lock(now_nanos))
            .await
        {
            Ok(()) => {
                info!(id = %record.id, "claimed item");
                Ok(record.item())
            }
            Err(StoreError::ConditionFailed) | Err(StoreError::NotFound(_)) => {
                warn!(id = %record.id, "something beat us to the lock, moving on");
                Err(QueueError::ClaimConflict)
            }
            Err(err) => Err(QueueError::Store(err)),
        }
    }

    async fn complete(&self, id: &ItemId) -> Result<(), QueueError> {
        self.store.delete(id).await?;
        info!(id = %id, "item completed and removed from queue");
        Ok(())
    }

    async fn release(&self, id: &ItemId) -> Result<(), QueueError> {
        match self
            .store
            .update_lease(id, &Filter::LockedEq(true), LeaseUpdate::unlock())
            .await
        {
            Ok(()) => {
                info!(id = %id, "lease released");
                Ok(())
            }
            Err(StoreError::ConditionFailed) | Err(StoreError::NotFound(_)) => {
                Err(QueueError::ClaimConflict)
            }
            Err(err) => Err(QueueError::Store(err)),
        }
    }
}
