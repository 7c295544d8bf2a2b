//! Feed health checks for `newsidx check-feeds`.
//!
//! Fetches and parses every configured feed without touching the store.
//! A feed is healthy when it is reachable, parses as a syndication
//! document, and (in strict mode) has at least one entry.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{Config, FeedSource};
use crate::feed::parse_feed;
use crate::fetch::{FeedFetcher, HttpFetcher};

#[derive(Debug, Clone)]
pub struct FeedCheck {
    pub feed: FeedSource,
    /// `None` when healthy, otherwise the reason it is not.
    pub problem: Option<String>,
}

impl FeedCheck {
    pub fn is_healthy(&self) -> bool {
        self.problem.is_none()
    }
}

pub async fn check_feeds(
    fetcher: Arc<dyn FeedFetcher>,
    feeds: &[FeedSource],
    concurrency: usize,
    timeout: Duration,
    strict: bool,
) -> Vec<FeedCheck> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, feed) in feeds.iter().cloned().enumerate() {
        let fetcher = fetcher.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let problem = match tokio::time::timeout(timeout, fetcher.fetch(&feed.url)).await {
                Err(_) => Some(format!("timed out after {}s", timeout.as_secs())),
                Ok(Err(e)) => Some(format!("{:#}", e)),
                Ok(Ok(body)) => match parse_feed(&body) {
                    Err(e) => Some(e.to_string()),
                    Ok(parsed) if strict && parsed.entries.is_empty() => {
                        Some("feed has no entries".to_string())
                    }
                    Ok(_) => None,
                },
            };
            (idx, FeedCheck { feed, problem })
        });
    }

    let mut results: Vec<(usize, FeedCheck)> = Vec::with_capacity(feeds.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(pair) => results.push(pair),
            Err(e) => tracing::error!(error = %e, "feed check task aborted"),
        }
    }

    // Report in configuration order.
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, check)| check).collect()
}

/// Entry point for `newsidx check-feeds`. Fails if any feed is unhealthy.
pub async fn run_check_feeds(config: &Config, lenient: bool) -> Result<()> {
    let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFetcher::new(
        config.ingest.fetch_timeout(),
        &config.ingest.user_agent,
    )?);

    tracing::info!(feeds = config.feeds.len(), "checking feeds");
    let checks = check_feeds(
        fetcher,
        &config.feeds,
        config.ingest.concurrency,
        config.ingest.fetch_timeout(),
        !lenient,
    )
    .await;

    let bad: Vec<&FeedCheck> = checks.iter().filter(|c| !c.is_healthy()).collect();

    println!("{:<32} {:<8} URL", "SOURCE", "STATUS");
    for check in &checks {
        let name = check.feed.source.as_deref().unwrap_or("-");
        let status = if check.is_healthy() { "OK" } else { "FAILED" };
        println!("{:<32} {:<8} {}", name, status, check.feed.url);
        if let Some(problem) = &check.problem {
            println!("{:<32} {:<8} ↳ {}", "", "", problem);
        }
    }

    if !bad.is_empty() {
        anyhow::bail!("{} of {} feed(s) failed", bad.len(), checks.len());
    }

    println!("All {} feeds are healthy.", checks.len());
    Ok(())
}
