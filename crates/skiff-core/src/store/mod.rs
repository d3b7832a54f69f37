//! Store implementations.
//!
//! Only the in-memory pair lives here; network-backed adapters belong in
//! their own crates and implement the same ports.

pub mod memory;

pub use self::memory::{InMemoryLeaseStore, InMemoryMetadataStore};
