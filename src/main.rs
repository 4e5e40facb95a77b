//! Lemmascope main entry point
//!
//! This is the command-line interface for crawling the configured sites and
//! searching the resulting index.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lemmascope::config::{load_config_with_hash, Config};
use lemmascope::output::print_statistics;
use lemmascope::search::DEFAULT_LIMIT;
use lemmascope::Coordinator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lemmascope: self-hosted search over your own web sites
///
/// Lemmascope crawls the sites listed in its configuration, builds an index
/// of word lemmas for each of them, and answers ranked full-text queries
/// with highlighted snippets.
#[derive(Parser, Debug)]
#[command(name = "lemmascope")]
#[command(version = "1.0.0")]
#[command(about = "Self-hosted lexical search over your own sites", long_about = None)]
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
    /// Re-crawl every configured site from scratch (Ctrl-C stops the run)
    Crawl,

    /// Fetch one page of a configured site and re-index it
    IndexPage {
        /// Absolute URL of the page
        url: String,
    },

    /// Search the index
    Search {
        /// Query text
        query: String,

        /// Restrict results to one site (its configured URL)
        #[arg(long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results to show
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Show statistics from the database and exit
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let coordinator = open_coordinator(config)?;

    match cli.command {
        Command::Crawl => handle_crawl(&coordinator).await,
        Command::IndexPage { url } => handle_index_page(&coordinator, &url).await,
        Command::Search {
            query,
            site,
            offset,
            limit,
        } => handle_search(&coordinator, &query, site.as_deref(), offset, limit),
        Command::Stats => handle_stats(&coordinator),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lemmascope=info,warn"),
            1 => EnvFilter::new("lemmascope=debug,info"),
            2 => EnvFilter::new("lemmascope=trace,debug"),
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

fn open_coordinator(config: Config) -> anyhow::Result<Coordinator> {
    let database = config.output.database_path.clone();
    Coordinator::open(config).with_context(|| format!("Failed to open database {}", database))
}

/// Handles the crawl command: full re-crawl, stoppable with Ctrl-C
async fn handle_crawl(coordinator: &Coordinator) -> anyhow::Result<()> {
    tracing::info!("Sites to crawl: {}", coordinator.config().sites.len());
    for url in coordinator.config().site_urls() {
        tracing::info!("  - {}", url);
    }

    let stopper = coordinator.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Err(e) = stopper.stop_crawl() {
                tracing::warn!("Could not stop crawl: {}", e);
            }
        }
    });

    let result = coordinator.start_crawl().await;
    signal_task.abort();
    result.context("Crawl failed")?;

    let stats = coordinator.statistics()?;
    for site in &stats.detailed {
        match &site.last_error {
            Some(error) => println!("{}: {} ({})", site.url, site.status, error),
            None => println!("{}: {} ({} pages)", site.url, site.status, site.pages),
        }
    }
    Ok(())
}

/// Handles the index-page command
async fn handle_index_page(coordinator: &Coordinator, url: &str) -> anyhow::Result<()> {
    coordinator
        .index_single_page(url)
        .await
        .with_context(|| format!("Failed to index {}", url))?;
    println!("Indexed {}", url);
    Ok(())
}

/// Handles the search command: prints the requested slice of results
fn handle_search(
    coordinator: &Coordinator,
    query: &str,
    site: Option<&str>,
    offset: usize,
    limit: usize,
) -> anyhow::Result<()> {
    let response = coordinator
        .search_engine()
        .search(query, site, offset, limit)?;

    println!("Found {} pages\n", response.count);
    for (position, result) in response.results.iter().enumerate() {
        println!(
            "{}. {} [{:.3}]",
            offset + position + 1,
            result.title,
            result.relevance
        );
        println!("   {}{}", result.site.trim_end_matches('/'), result.uri);
        println!("   {}", result.snippet);
        println!();
    }
    Ok(())
}

/// Handles the stats command: shows statistics from the database
fn handle_stats(coordinator: &Coordinator) -> anyhow::Result<()> {
    println!("Database: {}\n", coordinator.config().output.database_path);
    let stats = coordinator.statistics()?;
    print_statistics(&stats);
    Ok(())
}
