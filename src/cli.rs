//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Tallybot - comment thread tally and summary bot
///
/// Scrapes recent comment threads from the configured social pages,
/// counts comments and replies per commenter, and publishes a short
/// summary naming the most active commenter with a sampled quote.
///
/// Examples:
///   tallybot
///   tallybot --source mbl.is --days-back 2
///   tallybot --dry-run --seed 42
///   tallybot --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .tallybot.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Page identifier to scrape (repeatable)
    ///
    /// Overrides the `sources` list from the config file.
    /// Example: --source mbl.is --source visir.is
    #[arg(short, long, value_name = "PAGE")]
    pub source: Vec<String>,

    /// Recency window in days
    ///
    /// Only posts from the last N days are included; pagination halts at
    /// the first post outside the window.
    #[arg(long, value_name = "DAYS")]
    pub days_back: Option<i64>,

    /// Maximum feed pages to request per source
    #[arg(long, value_name = "COUNT")]
    pub max_pages: Option<u32>,

    /// How many commenters to print in the leaderboard
    #[arg(long, default_value = "3", value_name = "COUNT")]
    pub top: usize,

    /// Maximum length of the published post, in characters
    #[arg(long, value_name = "CHARS")]
    pub max_post_length: Option<usize>,

    /// Seed for the quote sampler
    ///
    /// Quote selection is random; pass a seed for reproducible runs.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Base URL of the scraping API
    #[arg(long, value_name = "URL", env = "TALLYBOT_SCRAPE_API")]
    pub scrape_api: Option<String>,

    /// Base URL of the posting API
    #[arg(long, value_name = "URL", env = "TALLYBOT_PUBLISH_API")]
    pub publish_api: Option<String>,

    /// Access token for the posting API
    ///
    /// Not needed with --dry-run.
    #[arg(long, value_name = "TOKEN", env = "TALLYBOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Compose the summary but print it instead of posting
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tallybot.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(days_back) = self.days_back {
            if days_back < 1 {
                return Err("Days back must be at least 1".to_string());
            }
        }

        if let Some(max_pages) = self.max_pages {
            if max_pages == 0 {
                return Err("Max pages must be at least 1".to_string());
            }
        }

        if self.top == 0 {
            return Err("Top must be at least 1".to_string());
        }

        if let Some(max_post_length) = self.max_post_length {
            if max_post_length == 0 {
                return Err("Max post length must be at least 1".to_string());
            }
        }

        // URLs are only sanity-checked when explicitly provided
        for url in [&self.scrape_api, &self.publish_api].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!(
                    "API URL must start with 'http://' or 'https://': {}",
                    url
                ));
            }
        }

        if !self.dry_run && self.token.is_none() {
            return Err(
                "Missing access token: set TALLYBOT_TOKEN or pass --token (or use --dry-run)"
                    .to_string(),
            );
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
