//! Summary publishing.
//!
//! Composes the bounded summary text and hands it to the posting API.
//! The aggregator knows nothing about any of this; it only answers the
//! count and ranking queries the composer asks.

pub mod composer;

pub use composer::compose_summary;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

/// Destination for the composed summary text.
pub trait Publisher {
    /// Publish `text` as a new post.
    fn publish(&self, text: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Publisher backed by the posting HTTP API.
pub struct HttpPublisher {
    api_url: String,
    token: String,
    http_client: reqwest::Client,
}

impl HttpPublisher {
    /// Create a publisher for the API at `api_url`, authenticating with
    /// the given bearer token.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: api_url.into(),
            token: token.into(),
            http_client,
        })
    }
}

impl Publisher for HttpPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        let url = format!("{}/statuses", self.api_url);
        debug!("Publishing {} char(s) to {}", text.chars().count(), url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Publish request timed out")
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to posting API at {}", self.api_url)
                } else {
                    anyhow::anyhow!("Failed to publish summary: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Posting API error {}: {}", status, body));
        }

        info!("Summary published");
        Ok(())
    }
}
