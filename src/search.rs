//! Ranked full-text search over stored articles.
//!
//! Shared by the CLI (`newsidx search`) and the HTTP service. Input is
//! validated into a [`ValidatedQuery`] first; the store is only touched for
//! well-formed requests, and only ever read.

use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, RetrievalConfig};
use crate::db;
use crate::models::SearchHit;
use crate::normalize::{format_iso, parse_timestamp};
use crate::rank::{age_days, blended_score, compare_hits, relevance_from_bm25, RankingParams};
use crate::store::ArticleStore;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("invalid since date '{0}': expected YYYY-MM-DD or RFC 3339")]
    InvalidSince(String),
    #[error("invalid limit '{0}': must be between 1 and {1}")]
    InvalidLimit(String, i64),
    #[error("query timed out after {0}s")]
    Timeout(u64),
    #[error("store error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SearchError {
    /// True for errors caused by caller input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::EmptyQuery | SearchError::InvalidSince(_) | SearchError::InvalidLimit(..)
        )
    }
}

/// Unvalidated search input as it arrives from a caller.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub since: Option<String>,
    pub limit: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    /// FTS5 expression with every term quoted.
    pub match_expr: String,
    /// Lower bound in canonical ISO layout.
    pub since_iso: Option<String>,
    pub limit: i64,
}

/// Turns free text into an FTS5 expression that requires every term.
///
/// Terms are runs of alphanumeric characters; everything else separates
/// them, so user punctuation can never reach the FTS5 query parser.
pub fn build_match_expr(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

pub fn parse_since(raw: &str) -> Result<DateTime<Utc>, SearchError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SearchError::InvalidSince(raw.to_string()))
}

pub fn validate(req: &SearchRequest, retrieval: &RetrievalConfig) -> Result<ValidatedQuery, SearchError> {
    let match_expr = build_match_expr(&req.query).ok_or(SearchError::EmptyQuery)?;

    let since_iso = match req.since.as_deref() {
        None => None,
        Some(s) if s.trim().is_empty() => None,
        Some(s) => Some(format_iso(parse_since(s)?)),
    };

    let limit = match req.limit.as_deref().map(str::trim) {
        None | Some("") => retrieval.final_limit,
        Some(s) => match s.parse::<i64>() {
            Ok(n) if (1..=retrieval.max_limit).contains(&n) => n,
            _ => return Err(SearchError::InvalidLimit(s.to_string(), retrieval.max_limit)),
        },
    };

    Ok(ValidatedQuery {
        match_expr,
        since_iso,
        limit,
    })
}

/// Validates `req`, runs it against `store` and returns ranked hits.
pub async fn search(
    store: &ArticleStore,
    retrieval: &RetrievalConfig,
    req: &SearchRequest,
    now: DateTime<Utc>,
) -> Result<Vec<SearchHit>, SearchError> {
    let query = validate(req, retrieval)?;
    let params = RankingParams::from(retrieval);
    execute(store, &query, &params, retrieval.candidate_k, retrieval.query_timeout(), now).await
}

async fn execute(
    store: &ArticleStore,
    query: &ValidatedQuery,
    params: &RankingParams,
    candidate_k: i64,
    timeout: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<SearchHit>, SearchError> {
    let candidates = tokio::time::timeout(
        timeout,
        store.search_candidates(
            &query.match_expr,
            query.since_iso.as_deref(),
            params.title_weight,
            params.summary_weight,
            candidate_k.max(query.limit),
        ),
    )
    .await
    .map_err(|_| SearchError::Timeout(timeout.as_secs()))??;

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .map(|c| {
            let relevance = relevance_from_bm25(c.bm25);
            let age = parse_timestamp(&c.article.published_iso)
                .map(|published| age_days(published, now))
                .unwrap_or(f64::INFINITY);
            SearchHit {
                score: blended_score(relevance, age, params),
                title: c.article.title,
                summary: c.article.summary,
                url: c.article.url,
                source: c.article.source,
                published_iso: c.article.published_iso,
            }
        })
        .collect();

    hits.sort_by(compare_hits);
    hits.truncate(query.limit as usize);
    Ok(hits)
}

/// Entry point for `newsidx search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    since: Option<String>,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let req = SearchRequest {
        query: query.to_string(),
        since,
        limit: limit.map(|n| n.to_string()),
    };
    // Reject bad input before touching the store.
    validate(&req, &config.retrieval)?;

    let store = ArticleStore::new(db::connect_reader(config)?);
    let hits = search(&store, &config.retrieval, &req, Utc::now()).await?;

    if hits.is_empty() {
        println!("No results.");
        store.pool().close().await;
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {} / {}", i + 1, hit.score, hit.source, hit.title);
        println!("    published: {}", hit.published_iso);
        println!("    url: {}", hit.url);
        if !hit.summary.is_empty() {
            println!("    summary: \"{}\"", hit.summary);
        }
        println!();
    }

    store.pool().close().await;
    Ok(())
}
