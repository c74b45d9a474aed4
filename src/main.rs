//! Job-Sift main entry point
//!
//! This is the command-line interface for the Job-Sift ingestion tool.

use clap::{Parser, Subcommand};
use job_sift::config::{load_config_with_hash, Config};
use job_sift::pipeline::ingest;
use job_sift::scraper::{HttpFetcher, ScrapeReport};
use job_sift::storage::{open_store, JobStore, MemoryJobStore};
use job_sift::{DeduplicationEngine, ScraperRegistry, ScrapingOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Job-Sift: polite job-board scraping with duplicate detection
///
/// Job-Sift scrapes the configured job boards within per-source rate limits,
/// falls back through known page layouts when a board changes, and stores
/// each posting unless an equivalent one is already known.
#[derive(Parser, Debug)]
#[command(name = "job-sift")]
#[command(version)]
#[command(about = "Polite job-board scraping with duplicate detection", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape sources, deduplicate and store the postings
    Scrape {
        /// Only scrape these sources (repeatable)
        #[arg(short, long = "source", value_name = "NAME")]
        sources: Vec<String>,

        #[arg(long, default_value_t = 5)]
        max_pages: u32,

        #[arg(long, default_value_t = 100)]
        max_jobs: usize,

        /// Keep postings mentioning any of these keywords (repeatable)
        #[arg(short, long = "keyword", value_name = "WORD")]
        keywords: Vec<String>,

        /// Keep postings whose location contains this text
        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        remote_only: bool,

        /// Run sources on separate tasks
        #[arg(long)]
        concurrent: bool,

        /// Deduplicate against an empty in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Check whether every configured source responds
    Health,

    /// Show duplicate statistics from the database
    Stats,

    /// Validate the configuration and list the resolved sources
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Scrape {
            sources,
            max_pages,
            max_jobs,
            keywords,
            location,
            remote_only,
            concurrent,
            dry_run,
        } => {
            let options = ScrapingOptions {
                max_pages,
                max_jobs,
                keywords,
                location,
                remote_only,
            };
            handle_scrape(&config, &sources, &options, concurrent, dry_run).await?;
        }
        Command::Health => handle_health(&config).await?,
        Command::Stats => handle_stats(&config)?,
        Command::CheckConfig => handle_check_config(&config)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_sift=info,warn"),
            1 => EnvFilter::new("job_sift=debug,info"),
            2 => EnvFilter::new("job_sift=trace,debug"),
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

fn build_registry(config: &Config) -> Result<ScraperRegistry, Box<dyn std::error::Error>> {
    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    Ok(ScraperRegistry::from_config(config, fetcher)?)
}

/// Handles `scrape`: runs the registry and ingests what it found
async fn handle_scrape(
    config: &Config,
    sources: &[String],
    options: &ScrapingOptions,
    concurrent: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(config)?;
    tracing::info!("Scraping with {} registered sources", registry.len());

    let report = if !sources.is_empty() {
        registry.scrape_specific(sources, options).await
    } else if concurrent {
        registry.scrape_all_concurrent(options).await
    } else {
        registry.scrape_all(options).await
    };
    print_report(&report);

    let store: Arc<dyn JobStore> = if dry_run {
        tracing::info!("Dry run: deduplicating against an empty in-memory store");
        Arc::new(MemoryJobStore::new())
    } else {
        Arc::new(open_store(Path::new(&config.storage.database_path))?)
    };
    let engine = DeduplicationEngine::new(store);
    let summary = ingest(&report.postings, &engine, &config.dedup);

    println!("\nIngest:");
    println!("  Total:   {}", summary.total);
    println!("  Created: {}", summary.created);
    println!("  Updated: {}", summary.updated);
    println!("  Skipped: {}", summary.skipped);
    println!("  Failed:  {}", summary.failed);

    Ok(())
}

fn print_report(report: &ScrapeReport) {
    println!("=== Scrape Results ===\n");
    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!(
                "✓ {} ({}): {} jobs",
                outcome.source, outcome.version, outcome.jobs_found
            ),
            Some(error) => println!("✗ {}: {}", outcome.source, error),
        }
    }
    println!("\nTotal postings: {}", report.postings.len());
}

/// Handles `health`: checks every source's base page
async fn handle_health(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(config)?;
    let health = registry.check_all_scrapers_health().await;

    println!("=== Source Health ===\n");
    for (name, healthy) in &health {
        println!("  {} {}", if *healthy { "✓" } else { "✗" }, name);
    }

    for (name, metrics) in registry.metrics() {
        tracing::debug!(
            source = %name,
            requests = metrics.total_requests,
            success_rate = metrics.success_rate(),
            "Source metrics"
        );
    }

    Ok(())
}

/// Handles `stats`: shows duplicate groups already in the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let store = Arc::new(open_store(Path::new(&config.storage.database_path))?);
    let engine = DeduplicationEngine::new(store);
    let stats = engine.deduplication_stats()?;

    println!("Total jobs:           {}", stats.total_jobs);
    println!("Duplicate groups:     {}", stats.duplicate_groups);
    println!("Potential duplicates: {}", stats.potential_duplicates);

    Ok(())
}

/// Handles `check-config`: prints the resolved configuration
fn handle_check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Job-Sift Configuration ===\n");

    println!("HTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nDeduplication:");
    println!("  Min similarity: {}", config.dedup.min_similarity_score);
    println!("  Skip threshold: {}", config.dedup.skip_threshold);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        let definition = source.resolve()?;
        let versions: Vec<&str> = definition.versions.iter().map(|v| v.id.as_str()).collect();
        println!(
            "  - {}{} [{}] {} req/min",
            definition.name,
            if source.enabled { "" } else { " (disabled)" },
            versions.join(", "),
            definition.rate_limit.requests_per_minute
        );
        println!("    * {}", definition.page_url);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}
