//! Lease store port.
//!
//! The queue delegates every bit of cross-claim coordination to this
//! contract: a key-addressed record store with a conditional update. No
//! in-process lock sits above it, so two processes sharing one store race
//! safely. `store::memory::InMemoryLeaseStore` is the test double; a real
//! adapter maps these calls onto its backend's conditional-write primitive.

use async_trait::async_trait;

use crate::domain::{ItemId, ItemRecord, StoreError};

/// Scan / guard condition over stored item records.
///
/// Small on purpose: equality, prefix, numeric less-than, field absence, and
/// boolean combinators cover the namespace scan and the unlocked-or-expired
/// predicate, which is everything the queue asks of a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `id` begins with the given prefix.
    IdBeginsWith(String),
    /// `locked` equals the given value.
    LockedEq(bool),
    /// `lock_time` is present and strictly less than the given value.
    LockTimeLessThan(i64),
    /// `lock_time` is absent.
    LockTimeAbsent,
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn and(clauses: Vec<Filter>) -> Self {
        Filter::And(clauses)
    }

    pub fn or(clauses: Vec<Filter>) -> Self {
        Filter::Or(clauses)
    }

    /// Evaluate the condition against one stored record.
    pub fn matches(&self, record: &ItemRecord) -> bool {
        match self {
            Filter::IdBeginsWith(prefix) => record.id.as_str().starts_with(prefix),
            Filter::LockedEq(locked) => record.locked == *locked,
            Filter::LockTimeLessThan(bound) => {
                record.lock_time.is_some_and(|lock_time| lock_time < *bound)
            }
            Filter::LockTimeAbsent => record.lock_time.is_none(),
            Filter::And(clauses) => clauses.iter().all(|clause| clause.matches(record)),
            Filter::Or(clauses) => clauses.iter().any(|clause| clause.matches(record)),
        }
    }
}

/// Lease transition applied by a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseUpdate {
    pub locked: bool,
    pub lock_time: Option<i64>,
}

impl LeaseUpdate {
    /// Take the lease at `now_nanos`.
    pub fn lock(now_nanos: i64) -> Self {
        Self {
            locked: true,
            lock_time: Some(now_nanos),
        }
    }

    /// Give the lease back.
    pub fn unlock() -> Self {
        Self {
            locked: false,
            lock_time: None,
        }
    }
}

/// Key-value store holding item+lease records.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Upsert a record by id.
    async fn put(&self, record: ItemRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>, StoreError>;

    /// Return up to `limit` records matching `filter`. Order is whatever the
    /// backend yields; callers must not read meaning into it.
    async fn scan(&self, filter: &Filter, limit: usize) -> Result<Vec<ItemRecord>, StoreError>;

    /// Atomically apply `update` to the record at `id`, but only while
    /// `condition` still holds against the stored state. The check and the
    /// write are one step: this is the compare-and-swap the queue builds its
    /// claim on. Fails with [`StoreError::ConditionFailed`] when the guard no
    /// longer matches, [`StoreError::NotFound`] when the record is gone.
    async fn update_lease(
        &self,
        id: &ItemId,
        condition: &Filter,
        update: LeaseUpdate,
    ) -> Result<(), StoreError>;

    /// Delete the record at `id`. Deleting a missing id is Ok.
    async fn delete(&self, id: &ItemId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: LeaseStore + ?Sized> LeaseStore for std::sync::Arc<S> {
    async fn put(&self, record: ItemRecord) -> Result<(), StoreError> {
        (**self).put(record).await
    }

    async fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>, StoreError> {
        (**self).get(id).await
    }

    async fn scan(&self, filter: &Filter, limit: usize) -> Result<Vec<ItemRecord>, StoreError> {
        (**self).scan(filter, limit).await
    }

    async fn update_lease(
        &self,
        id: &ItemId,
        condition: &Filter,
        update: LeaseUpdate,
    ) -> Result<(), StoreError> {
        (**self).update_lease(id, condition, update).await
    }

    async fn delete(&self, id: &ItemId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Payload;
    use rstest::rstest;

    fn record(locked: bool, lock_time: Option<i64>) -> ItemRecord {
        ItemRecord {
            id: ItemId::from("queue-ipfs-01ABC".to_string()),
            payload: Payload::new(vec![]),
            created_at: 0,
            locked,
            lock_time,
        }
    }

    #[rstest]
    #[case::unlocked(Filter::LockedEq(false), record(false, None), true)]
    #[case::locked(Filter::LockedEq(false), record(true, Some(1)), false)]
    #[case::prefix_hit(Filter::IdBeginsWith("queue-ipfs-".into()), record(false, None), true)]
    #[case::prefix_miss(Filter::IdBeginsWith("queue-other-".into()), record(false, None), false)]
    #[case::older(Filter::LockTimeLessThan(10), record(true, Some(5)), true)]
    #[case::newer(Filter::LockTimeLessThan(10), record(true, Some(10)), false)]
    #[case::less_than_needs_value(Filter::LockTimeLessThan(10), record(true, None), false)]
    #[case::absent(Filter::LockTimeAbsent, record(false, None), true)]
    #[case::present(Filter::LockTimeAbsent, record(true, Some(1)), false)]
    fn filter_matches(#[case] filter: Filter, #[case] record: ItemRecord, #[case] expected: bool) {
        assert_eq!(filter.matches(&record), expected);
    }

    #[test]
    fn combinators_nest() {
        let filter = Filter::or(vec![
            Filter::LockedEq(false),
            Filter::and(vec![Filter::LockedEq(true), Filter::LockTimeLessThan(100)]),
        ]);
        assert!(filter.matches(&record(false, None)));
        assert!(filter.matches(&record(true, Some(50))));
        assert!(!filter.matches(&record(true, Some(200))));
    }
}
