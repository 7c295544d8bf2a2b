//! Store statistics and health overview.
//!
//! Provides a quick summary of what's indexed: article counts, dedupe-key
//! counts, publish-date range and a per-source breakdown. Used by
//! `newsidx stats` to give confidence that ingest runs are landing.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::ArticleStore;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = ArticleStore::new(db::connect_reader(config)?);

    let total_articles = store.count_articles().await?;
    let total_keys = store.count_keys().await?;
    let (oldest, newest) = store.published_range().await?;
    let sources = store.source_counts().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("News Index — Store Stats");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Articles:    {}", total_articles);
    println!("  Dedupe keys: {}", total_keys);
    println!("  Oldest:      {}", oldest.as_deref().unwrap_or("-"));
    println!("  Newest:      {}", newest.as_deref().unwrap_or("-"));

    if !sources.is_empty() {
        println!();
        println!("  {:<32} {:>8}  NEWEST", "SOURCE", "ARTICLES");
        for s in &sources {
            println!(
                "  {:<32} {:>8}  {}",
                s.source,
                s.articles,
                s.newest.as_deref().unwrap_or("-")
            );
        }
    }
    println!();

    store.pool().close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
