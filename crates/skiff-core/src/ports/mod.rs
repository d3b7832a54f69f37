//! Ports: the trait seams between the queue/engine and the outside world.
//!
//! Each port has a network-backed implementation where one makes sense
//! (`gateway::HttpGateway`) and an in-memory double (`store::memory`), so
//! lease races and retry paths are testable without a live backend.

pub mod clock;
pub mod gateway;
pub mod lease_store;
pub mod metadata_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::gateway::Gateway;
pub use self::lease_store::{Filter, LeaseStore, LeaseUpdate};
pub use self::metadata_store::MetadataStore;
