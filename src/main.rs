//! Tallybot - comment thread tally and summary bot
//!
//! A CLI tool that scrapes recent comment threads from configured
//! social pages, aggregates per-user comment/reply counts, and
//! publishes a bounded summary post naming the most active commenter.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, publish failure, etc.)

mod aggregate;
mod cli;
mod config;
mod models;
mod publish;
mod scrape;

use aggregate::CommentAggregator;
use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use publish::{HttpPublisher, Publisher};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scrape::HttpPostSource;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Tallybot v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the pipeline
    match run_pipeline(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tallybot.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".tallybot.toml");

    if path.exists() {
        eprintln!("⚠️  .tallybot.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .tallybot.toml")?;

    println!("✅ Created .tallybot.toml with default settings.");
    println!("   Edit it to set your sources and spam list.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete scrape → aggregate → publish workflow.
async fn run_pipeline(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Build the aggregator (fails fast on missing sources/spam)
    let mut aggregator =
        CommentAggregator::new(&config.scrape).context("Invalid scrape configuration")?;

    // Step 2: Fetch in-window posts from every source
    println!(
        "📥 Fetching posts from {} source(s), last {} day(s)...",
        aggregator.sources().len(),
        config.scrape.days_back
    );

    let client = HttpPostSource::new(&config.scrape.api_url, config.scrape.timeout_seconds)?;
    let sources = aggregator.sources().to_vec();
    let posts = scrape::collect_recent_posts(&client, &sources, &config.scrape, !args.quiet)
        .await
        .context("Failed to collect posts")?;

    info!("Collected {} in-window post(s)", posts.len());

    // Step 3: Aggregate the comment trees
    aggregator.aggregate(&posts);
    let total = aggregator.total_comment_count()?;

    println!("\n📊 Aggregation Summary:");
    println!("   Posts in window: {}", posts.len());
    println!("   Distinct commenters: {}", aggregator.user_count());
    println!("   Comments + replies: {}", total);

    // Leaderboard depth is clamped for display; the core query itself
    // rejects out-of-range requests.
    let depth = args.top.min(aggregator.user_count());
    if depth >= 1 {
        println!("\n🏆 Top commenters:");
        for user in aggregator.top_commenters(depth)? {
            println!("   {:>4}  {}", user.total(), user);
        }
    }

    // Step 4: Compose the summary post
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let summary = publish::compose_summary(
        &aggregator,
        config.scrape.days_back,
        config.publish.max_post_length,
        &mut rng,
    )?;

    // Step 5: Publish (or print on --dry-run)
    if args.dry_run {
        println!(
            "\n📝 Dry run, composed summary ({} chars):",
            summary.chars().count()
        );
        println!("{}", summary);
        println!("\n✅ Dry run complete. Nothing was published.");
        return Ok(());
    }

    let token = args
        .token
        .clone()
        .context("Missing access token: set TALLYBOT_TOKEN or pass --token")?;
    let publisher = HttpPublisher::new(&config.publish.api_url, token, config.publish.timeout_seconds)?;
    publisher.publish(&summary).await?;

    println!(
        "\n✅ Summary published in {:.1}s:",
        start_time.elapsed().as_secs_f64()
    );
    println!("{}", summary);

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .tallybot.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
