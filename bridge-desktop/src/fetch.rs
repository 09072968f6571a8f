//! Upload retrieval from local paths and HTTP(S) URLs.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    MediaFetcher,
};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Reads uploads with `tokio::fs`, or `reqwest` for `http://` and
/// `https://` locations. `file://` URLs are treated as paths.
pub struct TokioMediaFetcher {
    client: Client,
}

impl TokioMediaFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("ncor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::OperationFailed(format!("HTTP {status}")));
        }

        response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("download failed: {e}")))
    }
}

impl Default for TokioMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for TokioMediaFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        let data = if is_remote(location) {
            self.fetch_remote(location).await?
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            Bytes::from(tokio::fs::read(path).await?)
        };

        debug!(file = file_name(location), size = data.len(), "Fetched upload");
        Ok(data)
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.get(..8).unwrap_or(location).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Last path segment without query, for logs.
fn file_name(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    location[..end].rsplit(['/', '\\']).next().unwrap_or(location)
}
