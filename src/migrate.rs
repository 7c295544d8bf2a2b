use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates the dedupe and full-text tables if they are missing.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Dedupe index: one row per fingerprinted URL, no payload.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_hashes (
            url_hash TEXT PRIMARY KEY
        ) WITHOUT ROWID
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='articles'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE articles USING fts5(
                title,
                summary,
                url UNINDEXED,
                source UNINDEXED,
                published_iso UNINDEXED,
                tokenize = 'unicode61 remove_diacritics 2'
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}
