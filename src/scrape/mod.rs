//! Post fetching boundary.
//!
//! This module talks to the scraping API and applies the recency window.
//! Everything past this boundary hands the aggregator plain in-memory
//! post records; the aggregator itself never performs I/O.

use crate::config::ScrapeConfig;
use crate::models::PostRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// Source of post records for a single page identifier.
///
/// Implementations are treated as opaque, possibly slow, and are expected
/// to return posts newest first. Errors propagate to the caller; no retry
/// or backoff happens at this layer.
pub trait PostSource {
    /// Fetch up to `max_pages` feed pages worth of posts for `source`.
    fn fetch_posts(
        &self,
        source: &str,
        max_pages: u32,
    ) -> impl std::future::Future<Output = Result<Vec<PostRecord>>> + Send;
}

/// Post source backed by the scraping HTTP API.
pub struct HttpPostSource {
    api_url: String,
    http_client: reqwest::Client,
}

impl HttpPostSource {
    /// Create a client for the API at `api_url`.
    pub fn new(api_url: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: api_url.into(),
            http_client,
        })
    }
}

impl PostSource for HttpPostSource {
    async fn fetch_posts(&self, source: &str, max_pages: u32) -> Result<Vec<PostRecord>> {
        let url = format!("{}/pages/{}/posts", self.api_url, source);
        debug!("Fetching posts from {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("pages", max_pages)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request to {} timed out", url)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to scraping API at {}", self.api_url)
                } else {
                    anyhow::anyhow!("Failed to fetch posts for {}: {}", source, e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Scraping API error {}: {}", status, body));
        }

        let posts: Vec<PostRecord> = response
            .json()
            .await
            .with_context(|| format!("Invalid post feed for {}", source))?;

        Ok(posts)
    }
}

/// Keep posts from a newest-first feed while they fall inside the window.
///
/// Halts at the first post older than `cutoff`, which is what bounds
/// pagination: anything after that post is dropped even if it were
/// somehow in-window. Correctness therefore depends on the feed being in
/// reverse-chronological order.
pub fn clip_to_window(posts: Vec<PostRecord>, cutoff: DateTime<Utc>) -> Vec<PostRecord> {
    posts.into_iter().take_while(|p| p.time >= cutoff).collect()
}

/// Fetch every configured source sequentially and pool the in-window posts.
///
/// Only posts from the last `days_back` days are included; see
/// [`clip_to_window`] for the halting rule.
pub async fn collect_recent_posts<S: PostSource>(
    client: &S,
    sources: &[String],
    config: &ScrapeConfig,
    show_progress: bool,
) -> Result<Vec<PostRecord>> {
    let cutoff = Utc::now() - Duration::days(config.days_back);
    let mut posts = Vec::new();

    for source in sources {
        info!("Collecting comments from {}", source);

        let spinner = if show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            pb.set_message(format!("Fetching {}", source));
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let fetched = client.fetch_posts(source, config.max_pages).await?;

        let kept = clip_to_window(fetched, cutoff);
        if let Some(pb) = spinner {
            pb.finish_with_message(format!("{}: {} post(s) in window", source, kept.len()));
        }
        debug!("{}: kept {} in-window post(s)", source, kept.len());

        posts.extend(kept);
    }

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_at(hours_ago: i64) -> PostRecord {
        PostRecord {
            time: Utc::now() - Duration::hours(hours_ago),
            comments: Vec::new(),
        }
    }

    struct FixedSource {
        posts: Vec<PostRecord>,
    }

    impl PostSource for FixedSource {
        async fn fetch_posts(&self, _source: &str, _max_pages: u32) -> Result<Vec<PostRecord>> {
            Ok(self.posts.clone())
        }
    }

    #[test]
    fn test_clip_keeps_in_window_posts() {
        let cutoff = Utc::now() - Duration::days(1);
        let posts = vec![post_at(1), post_at(5), post_at(12)];

        let kept = clip_to_window(posts, cutoff);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_clip_halts_at_first_out_of_window_post() {
        let cutoff = Utc::now() - Duration::days(1);
        // The third post is back in-window, but the feed contract says we
        // stop paging at the first old post, so it must be dropped too.
        let posts = vec![post_at(1), post_at(30), post_at(2)];

        let kept = clip_to_window(posts, cutoff);
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_pools_all_sources() {
        let client = FixedSource {
            posts: vec![post_at(1), post_at(2)],
        };
        let sources = vec!["a".to_string(), "b".to_string()];
        let config = ScrapeConfig::default();

        let posts = collect_recent_posts(&client, &sources, &config, false)
            .await
            .unwrap();
        assert_eq!(posts.len(), 4);
    }

    #[tokio::test]
    async fn test_collect_applies_window_per_source() {
        let client = FixedSource {
            posts: vec![post_at(1), post_at(48)],
        };
        let sources = vec!["a".to_string()];
        let config = ScrapeConfig::default();

        let posts = collect_recent_posts(&client, &sources, &config, false)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
    }
}
