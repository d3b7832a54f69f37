//! skiff-core
//!
//! A lease-based work queue and the engine that drains it.
//!
//! - **domain**: items, leases, metadata records, error taxonomy
//! - **ports**: trait seams (LeaseStore, MetadataStore, Gateway, Clock)
//! - **queue**: add / claim / complete over a conditional key-value store
//! - **engine**: interval dispatch loop feeding a bounded worker pool
//! - **gateway**: HTTP client resolving CIDs to metadata
//! - **store**: in-memory port implementations for tests and development
//!
//! Coordination happens entirely in the store's conditional write; the
//! process holds no lock of its own over lease state, so any number of
//! replicas can drain one queue.

pub mod config;
pub mod domain;
pub mod engine;
pub mod gateway;
pub mod ports;
pub mod queue;
pub mod store;

pub use config::Config;
pub use domain::{
    ConfigError, FetchError, ItemId, Metadata, Payload, PersistError, QueueError, QueueItem,
    StoreError, WorkError,
};
pub use engine::{Engine, EngineConfig, ItemProcessor};
pub use gateway::HttpGateway;
pub use ports::{Clock, Gateway, LeaseStore, MetadataStore, SystemClock};
pub use queue::{LeaseQueue, Queue};
pub use store::{InMemoryLeaseStore, InMemoryMetadataStore};
