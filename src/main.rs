//! # News Index CLI (`newsidx`)
//!
//! Each subcommand is an independent process: the scheduler runs
//! `newsidx ingest` periodically, while `newsidx serve` answers search
//! requests. They coordinate only through the SQLite store.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `newsidx init` | Create the SQLite database and schema |
//! | `newsidx ingest` | Fetch all configured feeds and append new articles |
//! | `newsidx search "<query>"` | Ranked search from the terminal |
//! | `newsidx serve` | Start the HTTP search service |
//! | `newsidx stats` | Summarize what is stored |
//! | `newsidx check-feeds` | Validate every configured feed |
//!
//! ## Examples
//!
//! ```bash
//! newsidx --config ./config/news.toml init
//! newsidx --config ./config/news.toml ingest --max-per-feed 20
//! newsidx --config ./config/news.toml search "elections" --since 2024-05-01
//! RUST_LOG=debug newsidx serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use news_index::{config, health, ingest, migrate, search, server, stats};

/// News Index CLI: feed ingestion and ranked full-text search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "newsidx",
    about = "Feed ingestion with deduplication and ranked full-text search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/news.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the `articles` full-text table and
    /// the `article_hashes` dedupe table. Safe to run repeatedly.
    Init,

    /// Run one ingestion pass over every configured feed.
    ///
    /// Feeds that fail are reported and skipped; the command only exits
    /// non-zero when the store itself fails or the run times out.
    Ingest {
        /// Maximum entries processed per feed in this run (overrides config).
        #[arg(long)]
        max_per_feed: Option<usize>,
    },

    /// Search stored articles.
    Search {
        /// The search query string.
        query: String,

        /// Only return articles published on or after this date
        /// (YYYY-MM-DD or RFC 3339).
        #[arg(long)]
        since: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Start the HTTP search service.
    Serve,

    /// Show article counts and per-source breakdown.
    Stats,

    /// Fetch and parse every configured feed; exit non-zero if any is broken.
    CheckFeeds {
        /// Accept feeds that parse but currently have no entries.
        #[arg(long)]
        lenient: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { max_per_feed } => {
            ingest::run_ingest(&cfg, max_per_feed).await?;
        }
        Commands::Search {
            query,
            since,
            limit,
        } => {
            search::run_search(&cfg, &query, since, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::CheckFeeds { lenient } => {
            health::run_check_feeds(&cfg, lenient).await?;
        }
    }

    Ok(())
}
