//! SQLite-backed article store.
//!
//! Two tables carry all durable state: the `articles` FTS5 table and the
//! `article_hashes` dedupe set. An article and its dedupe key are always
//! written in the same transaction.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{Article, DedupeKey};

/// Result of an append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key was already present; nothing was written.
    Duplicate,
}

/// A full-text match before recency blending.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub article: Article,
    /// Raw FTS5 `bm25()` value; more negative is more relevant.
    pub bm25: f64,
}

/// Per-source counts for `stats`.
#[derive(Debug, Clone)]
pub struct SourceCount {
    pub source: String,
    pub articles: i64,
    pub newest: Option<String>,
}

pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn contains_key(&self, key: &DedupeKey) -> Result<bool> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT url_hash FROM article_hashes WHERE url_hash = ?")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Records `key` and appends `article` atomically.
    ///
    /// If the key already exists nothing is written. If the article insert
    /// fails the key insert is rolled back with it.
    pub async fn insert_article(&self, key: &DedupeKey, article: &Article) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query("INSERT OR IGNORE INTO article_hashes (url_hash) VALUES (?)")
            .bind(key.as_str())
            .execute(&mut *tx)
            .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(InsertOutcome::Duplicate);
        }

        sqlx::query(
            r#"
            INSERT INTO articles (title, summary, url, source, published_iso)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.url)
        .bind(&article.source)
        .bind(&article.published_iso)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(InsertOutcome::Inserted)
    }

    /// Full-text candidates ordered by column-weighted bm25, newest first
    /// among equal scores so the cut at `limit` never drops recent articles
    /// in favour of older ones with the same relevance.
    ///
    /// `match_expr` must already be a valid FTS5 expression. `since_iso` uses
    /// the canonical timestamp layout so the comparison is lexicographic.
    pub async fn search_candidates(
        &self,
        match_expr: &str,
        since_iso: Option<&str>,
        title_weight: f64,
        summary_weight: f64,
        limit: i64,
    ) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(
            r#"
            SELECT title, summary, url, source, published_iso,
                   bm25(articles, ?, ?) AS weighted_bm25
            FROM articles
            WHERE articles MATCH ?
              AND (? IS NULL OR published_iso >= ?)
            ORDER BY weighted_bm25, published_iso DESC
            LIMIT ?
            "#,
        )
        .bind(title_weight)
        .bind(summary_weight)
        .bind(match_expr)
        .bind(since_iso)
        .bind(since_iso)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .iter()
            .map(|row| Candidate {
                article: Article {
                    title: row.get("title"),
                    summary: row.get("summary"),
                    url: row.get("url"),
                    source: row.get("source"),
                    published_iso: row.get("published_iso"),
                },
                bm25: row.get("weighted_bm25"),
            })
            .collect();

        Ok(candidates)
    }

    pub async fn count_articles(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_keys(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_hashes")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn count_url(&self, url: &str) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn published_range(&self) -> Result<(Option<String>, Option<String>)> {
        let row = sqlx::query(
            "SELECT MIN(published_iso) AS oldest, MAX(published_iso) AS newest FROM articles",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.get("oldest"), row.get("newest")))
    }

    pub async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let rows = sqlx::query(
            r#"
            SELECT source, COUNT(*) AS article_count, MAX(published_iso) AS newest
            FROM articles
            GROUP BY source
            ORDER BY article_count DESC, source ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SourceCount {
                source: row.get("source"),
                articles: row.get("article_count"),
                newest: row.get("newest"),
            })
            .collect())
    }
}
