//! Ingestion pipeline orchestration.
//!
//! Coordinates one run: fetch every configured feed (bounded concurrency) →
//! parse → truncate to `max_per_feed` → dedupe → normalize → append.
//!
//! Fetches run in parallel; writes are applied one feed at a time as fetches
//! complete, so this process is the single writer. A failing feed or entry
//! is recorded in the [`IngestReport`] and the run carries on. Only store
//! errors (or the whole-run timeout) fail the run.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

use crate::config::{Config, FeedSource};
use crate::db;
use crate::feed::parse_feed;
use crate::fetch::{FeedFetcher, HttpFetcher};
use crate::migrate;
use crate::models::{DedupeKey, ParsedFeed};
use crate::normalize::normalize_entry;
use crate::store::{ArticleStore, InsertOutcome};

/// Run-level knobs, decoupled from application config.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_per_feed: usize,
    pub concurrency: usize,
    pub fetch_timeout: Duration,
    pub summary_char_limit: usize,
}

impl IngestOptions {
    pub fn from_config(config: &Config, max_per_feed: Option<usize>) -> Self {
        Self {
            max_per_feed: max_per_feed.unwrap_or(config.ingest.max_per_feed),
            concurrency: config.ingest.concurrency,
            fetch_timeout: config.ingest.fetch_timeout(),
            summary_char_limit: config.ingest.summary_char_limit,
        }
    }
}

/// A feed that could not be fetched or parsed during a run.
#[derive(Debug, Clone)]
pub struct FeedFailure {
    pub source: String,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub feeds_attempted: usize,
    pub failures: Vec<FeedFailure>,
    pub entries_seen: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub invalid: u64,
}

impl IngestReport {
    pub fn feeds_ok(&self) -> usize {
        self.feeds_attempted - self.failures.len()
    }
}

/// Entry point for `newsidx ingest`.
pub async fn run_ingest(config: &Config, max_per_feed: Option<usize>) -> Result<IngestReport> {
    let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFetcher::new(
        config.ingest.fetch_timeout(),
        &config.ingest.user_agent,
    )?);

    let report = run_ingest_with(config, fetcher, max_per_feed).await?;
    print_report(&report);
    Ok(report)
}

/// One bounded ingest run against the configured store using `fetcher`.
///
/// Fails when the store fails or the run exceeds `run_timeout_secs`.
/// Articles committed before a timeout stay committed.
pub async fn run_ingest_with(
    config: &Config,
    fetcher: Arc<dyn FeedFetcher>,
    max_per_feed: Option<usize>,
) -> Result<IngestReport> {
    if max_per_feed == Some(0) {
        anyhow::bail!("--max-per-feed must be >= 1");
    }

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = ArticleStore::new(pool);

    let options = IngestOptions::from_config(config, max_per_feed);
    let outcome = tokio::time::timeout(
        config.ingest.run_timeout(),
        ingest_feeds(&store, fetcher, &config.feeds, &options),
    )
    .await;

    store.pool().close().await;

    let report = outcome.with_context(|| {
        format!(
            "ingest run timed out after {}s",
            config.ingest.run_timeout_secs
        )
    })??;
    Ok(report)
}

/// Ingests every feed in `feeds` once.
///
/// Returns `Err` only when the store fails; per-feed and per-entry problems
/// are counted in the report.
pub async fn ingest_feeds(
    store: &ArticleStore,
    fetcher: Arc<dyn FeedFetcher>,
    feeds: &[FeedSource],
    options: &IngestOptions,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        feeds_attempted: feeds.len(),
        ..Default::default()
    };

    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut in_flight: HashMap<task::Id, FeedSource> = HashMap::with_capacity(feeds.len());

    for feed in feeds {
        let fetcher = fetcher.clone();
        let permits = permits.clone();
        let timeout = options.fetch_timeout;
        let url = feed.url.clone();
        let handle = tasks.spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => fetch_and_parse(fetcher.as_ref(), &url, timeout).await,
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        });
        in_flight.insert(handle.id(), feed.clone());
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) => (e.id(), Err(anyhow::anyhow!("feed task failed: {}", e))),
        };
        let Some(feed) = in_flight.remove(&id) else {
            continue;
        };

        match result {
            Ok(parsed) => store_feed(store, &feed, parsed, options, &mut report).await?,
            Err(e) => {
                tracing::warn!(url = %feed.url, error = %format!("{:#}", e), "feed failed");
                report.failures.push(FeedFailure {
                    source: feed.source.clone().unwrap_or_else(|| feed.url.clone()),
                    url: feed.url.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    Ok(report)
}

async fn fetch_and_parse(
    fetcher: &dyn FeedFetcher,
    url: &str,
    timeout: Duration,
) -> Result<ParsedFeed> {
    let body = tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .with_context(|| format!("fetch timed out after {:?}", timeout))??;
    let parsed = parse_feed(&body)?;
    Ok(parsed)
}

async fn store_feed(
    store: &ArticleStore,
    feed: &FeedSource,
    parsed: ParsedFeed,
    options: &IngestOptions,
    report: &mut IngestReport,
) -> Result<()> {
    let source = feed
        .source
        .clone()
        .or_else(|| parsed.link.clone())
        .unwrap_or_else(|| feed.url.clone());
    let now = Utc::now();

    let mut inserted = 0u64;
    for entry in parsed.entries.iter().take(options.max_per_feed) {
        report.entries_seen += 1;

        let Some(link) = entry.link.as_deref().filter(|l| !l.trim().is_empty()) else {
            tracing::debug!(source = %source, "skipping entry without link");
            report.invalid += 1;
            continue;
        };

        let key = DedupeKey::from_url(link);
        // Cheap exit for re-polled entries before any normalization work.
        // `insert_article` still decides duplicates on its own.
        if store.contains_key(&key).await? {
            report.duplicates += 1;
            continue;
        }

        let article = match normalize_entry(entry, &source, options.summary_char_limit, now) {
            Ok(a) => a,
            Err(e) => {
                tracing::debug!(source = %source, url = %link, error = %e, "skipping entry");
                report.invalid += 1;
                continue;
            }
        };

        match store.insert_article(&key, &article).await? {
            InsertOutcome::Inserted => inserted += 1,
            InsertOutcome::Duplicate => report.duplicates += 1,
        }
    }

    report.inserted += inserted;
    tracing::info!(
        source = %source,
        entries = parsed.entries.len(),
        inserted,
        "feed ingested"
    );
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!("ingest");
    println!(
        "  feeds: {} ok, {} failed",
        report.feeds_ok(),
        report.failures.len()
    );
    println!("  entries seen: {}", report.entries_seen);
    println!("  inserted: {}", report.inserted);
    println!("  duplicates skipped: {}", report.duplicates);
    println!("  invalid entries skipped: {}", report.invalid);
    for failure in &report.failures {
        println!(
            "  failed: {} ({}): {}",
            failure.source, failure.url, failure.error
        );
    }
    println!("ok");
}
