//! pdf-harvester main entry point
//!
//! This is the command-line interface for the single-site PDF harvester.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use pdf_harvester::config::{load_config_with_hash, Config};
use pdf_harvester::crawler::Coordinator;
use pdf_harvester::output::{generate_markdown_summary, print_summary, RunReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// pdf-harvester: A polite single-site PDF harvester
///
/// pdf-harvester crawls one website from a seed URL, follows internal links
/// while respecting robots.txt and an adaptive request rate, and stores
/// every PDF it finds under a path mirroring the PDF's URL.
#[derive(Parser, Debug)]
#[command(name = "pdf-harvester")]
#[command(version)]
#[command(about = "A polite single-site PDF harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear the response cache before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "fresh")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pdf_harvester=info,warn"),
            1 => EnvFilter::new("pdf_harvester=debug,info"),
            2 => EnvFilter::new("pdf_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated crawl plan
fn handle_dry_run(config: &Config) {
    println!("=== pdf-harvester Dry Run ===\n");

    println!("Site:");
    println!("  Seed: {}", config.site.seed);
    println!("  Allowed domains: {}", config.site.allowed_domains.join(", "));
    println!("  Document directories: {}", config.site.document_dirs.join(", "));

    println!("\nCrawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    match config.crawler.depth_limit {
        0 => println!("  Depth limit: unlimited"),
        depth => println!("  Depth limit: {}", depth),
    }
    println!("  Retry budget: {}", config.crawler.retry_budget);
    println!("  Redirect limit: {}", config.crawler.redirect_limit);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Obey robots.txt: {}", config.crawler.obey_robots);
    println!("  Skip existing: {}", config.crawler.skip_existing);

    println!("\nThrottle:");
    println!(
        "  Delay: {}ms (min {}ms, max {}ms)",
        config.throttle.base_delay, config.throttle.min_delay, config.throttle.max_delay
    );
    println!("  Target concurrency: {}", config.throttle.target_concurrency);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Store root: {}", config.output.store_root.display());
    match &config.output.cache_dir {
        Some(dir) => println!(
            "  Cache: {} (expiration {}s)",
            dir.display(),
            config.output.cache_expiration
        ),
        None => println!("  Cache: disabled"),
    }
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path.display());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, fresh: bool) -> anyhow::Result<()> {
    let seed = config.site.seed.clone();
    let store_root = config.output.store_root.display().to_string();
    let summary_path = config.output.summary_path.clone();

    let coordinator = Coordinator::from_config(config).context("failed to set up the crawl")?;

    if fresh {
        let dropped = coordinator.clear_cache()?;
        tracing::info!("Starting fresh crawl ({} cached responses dropped)", dropped);
    }

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            stop.stop();
        }
    });

    let started_at = Utc::now();
    let summary = coordinator.run().await.context("crawl failed")?;

    print_summary(&summary);

    if let Some(path) = summary_path {
        let report = RunReport {
            seed,
            store_root,
            config_hash,
            started_at,
            finished_at: Utc::now(),
            summary,
        };
        match generate_markdown_summary(&report, &path) {
            Ok(()) => tracing::info!("Summary written to {}", path.display()),
            Err(e) => tracing::error!("Failed to write summary to {}: {}", path.display(), e),
        }
    }

    Ok(())
}
