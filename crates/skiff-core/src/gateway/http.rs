//! HTTP gateway client.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{FetchError, Metadata, MetadataBody};
use crate::ports::Gateway;

/// Gateway backed by an HTTP endpoint resolving `{base_url}/{cid}`.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Build a client for `base_url`. The url is validated once here, not on
    /// every fetch.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let parsed =
            reqwest::Url::parse(base_url).map_err(|err| FetchError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: err.to_string(),
            })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch(&self, cid: &str) -> Result<Metadata, FetchError> {
        let url = format!("{}/{}", self.base_url, cid);
        debug!(url = %url, "fetching cid");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let body: MetadataBody = serde_json::from_slice(&bytes)?;
        Ok(body.into_metadata(cid))
    }
}
