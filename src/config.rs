//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tallybot.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scraping settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Publishing settings.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Settings for the scraping side of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Page identifiers to scrape. Required: the aggregator refuses to
    /// start without it, so absence stays observable instead of silently
    /// defaulting to an empty list.
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    /// Commenter ids to exclude entirely. Required for the same reason.
    #[serde(default)]
    pub spam: Option<Vec<String>>,

    /// Recency window: only posts from the last `days_back` days are
    /// included. Pagination halts at the first out-of-window post.
    #[serde(default = "default_days_back")]
    pub days_back: i64,

    /// Maximum feed pages to request per source.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Base URL of the scraping API.
    #[serde(default = "default_scrape_api")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            sources: None,
            spam: None,
            days_back: default_days_back(),
            max_pages: default_max_pages(),
            api_url: default_scrape_api(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_days_back() -> i64 {
    1
}

fn default_max_pages() -> u32 {
    40
}

fn default_scrape_api() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Settings for composing and posting the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Maximum length of the published post, in characters.
    #[serde(default = "default_max_post_length")]
    pub max_post_length: usize,

    /// Base URL of the posting API.
    #[serde(default = "default_publish_api")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_post_length: default_max_post_length(),
            api_url: default_publish_api(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_max_post_length() -> usize {
    280
}

fn default_publish_api() -> String {
    "http://localhost:8081".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".tallybot.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if !args.source.is_empty() {
            self.scrape.sources = Some(args.source.clone());
        }
        if let Some(days_back) = args.days_back {
            self.scrape.days_back = days_back;
        }
        if let Some(max_pages) = args.max_pages {
            self.scrape.max_pages = max_pages;
        }
        if let Some(ref url) = args.scrape_api {
            self.scrape.api_url = url.clone();
        }

        if let Some(max_post_length) = args.max_post_length {
            self.publish.max_post_length = max_post_length;
        }
        if let Some(ref url) = args.publish_api {
            self.publish.api_url = url.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config {
            scrape: ScrapeConfig {
                // The template shows the required keys explicitly.
                sources: Some(vec!["example-page".to_string()]),
                spam: Some(Vec::new()),
                ..ScrapeConfig::default()
            },
            publish: PublishConfig::default(),
        };
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
