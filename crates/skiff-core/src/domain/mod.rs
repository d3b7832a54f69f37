//! Domain model: items, leases, metadata records, errors.

pub mod errors;
pub mod item;
pub mod metadata;

pub use errors::{ConfigError, FetchError, PersistError, QueueError, StoreError, WorkError};
pub use item::{ItemId, ItemRecord, Payload, QueueItem};
pub use metadata::{Metadata, MetadataBody};
