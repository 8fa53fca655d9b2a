//! LexiCrawl main entry point
//!
//! This is the command-line interface for the LexiCrawl site search engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lexicrawl::config::{load_config_with_hash, Config};
use lexicrawl::output::{load_statistics, print_search_results, print_statistics};
use lexicrawl::storage::{lock, open_storage};
use lexicrawl::{Coordinator, SearchEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// LexiCrawl: a small site search engine
///
/// LexiCrawl crawls the sites listed in its configuration, indexes the
/// lemmas of every page, and answers ranked free-text queries.
#[derive(Parser, Debug)]
#[command(name = "lexicrawl")]
#[command(version = "0.1.0")]
#[command(about = "A small site search engine", long_about = None)]
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
    /// Re-index every configured site; Ctrl-C stops indexing
    Index,

    /// Re-index a single page of a configured site
    IndexPage {
        /// Absolute URL of the page
        url: String,
    },

    /// Search the index
    Search {
        /// Free-text query
        query: String,

        /// Only return pages of the site with this root URL
        #[arg(long)]
        site: Option<String>,

        /// Offset of the first result
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show index statistics
    Stats,

    /// Validate the configuration and show what would be indexed
    Check,
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

    match cli.command {
        Command::Index => handle_index(config).await,
        Command::IndexPage { url } => handle_index_page(config, &url).await,
        Command::Search {
            query,
            site,
            offset,
            limit,
        } => handle_search(config, &query, site.as_deref(), offset, limit),
        Command::Stats => handle_stats(&config),
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lexicrawl=info,warn"),
            1 => EnvFilter::new("lexicrawl=debug,info"),
            2 => EnvFilter::new("lexicrawl=trace,debug"),
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

/// Runs a full indexing campaign, stopping it on Ctrl-C
async fn handle_index(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::open(config)?;
    coordinator.start_indexing()?;

    tokio::select! {
        _ = coordinator.wait_until_idle() => {
            tracing::info!("Indexing finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, stopping indexing");
            coordinator.stop_indexing()?;
        }
    }

    let storage = coordinator.storage();
    let stats = {
        let storage = lock(&storage)?;
        load_statistics(&*storage, &coordinator.config().sites, false)?
    };
    print_statistics(&stats);

    Ok(())
}

async fn handle_index_page(config: Config, url: &str) -> anyhow::Result<()> {
    let coordinator = Coordinator::open(config)?;
    coordinator.index_page(url).await?;
    println!("✓ Re-indexed {}", url);
    Ok(())
}

fn handle_search(
    config: Config,
    query: &str,
    site: Option<&str>,
    offset: usize,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let coordinator = Coordinator::open(config)?;
    let search = coordinator.config().search.clone();
    let limit = limit.unwrap_or(search.default_limit);

    let engine = SearchEngine::new(coordinator.storage(), coordinator.lemmatizer().clone(), search);
    let response = engine.search(query, site, offset, limit)?;
    print_search_results(query, &response);

    Ok(())
}

/// Handles the stats command: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage, &config.sites, false)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the check command: shows the validated configuration
fn handle_check(config: &Config) {
    println!("=== LexiCrawl Configuration ===\n");

    println!("Crawler:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max concurrent tasks: {}", config.crawler.max_concurrent_tasks);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay);
    println!("  Request timeout: {}ms", config.crawler.request_timeout);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.user_agent_string());
    if let Some(referrer) = &config.user_agent.referrer {
        println!("  Referrer: {}", referrer);
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSearch:");
    println!("  Frequency threshold: {}", config.search.frequency_threshold);
    println!("  Snippet radius: {} words", config.search.snippet_radius);
    println!("  Default limit: {}", config.search.default_limit);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }

    println!("\n✓ Configuration is valid");
}
