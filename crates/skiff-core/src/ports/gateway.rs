//! Gateway port.

use async_trait::async_trait;

use crate::domain::{FetchError, Metadata};

/// Resolves a content identifier to its metadata.
///
/// Contract: one request per CID against `{base_url}/{cid}`; anything other
/// than a success response is a [`FetchError`], and the returned record's
/// `id` is the CID that was asked for, regardless of the body.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch(&self, cid: &str) -> Result<Metadata, FetchError>;
}
