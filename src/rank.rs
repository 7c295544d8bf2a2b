//! Relevance × recency blending.
//!
//! A single scoring function orders search results:
//!
//! ```text
//! relevance = max(0, -bm25(title_weight, summary_weight))
//! recency   = 0.5 ^ (age_days / half_life_days)        age clamped at 0
//! score     = relevance × (1 + recency_weight × recency)
//! ```
//!
//! The recency multiplier lies in `[1, 1 + recency_weight]`, so a result can
//! only overtake another whose relevance is less than `1 + recency_weight`
//! times its own. Equal relevance is decided by recency; identical scores
//! fall back to newest first, then URL.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::config::RetrievalConfig;
use crate::models::SearchHit;

/// Weights for the blended score, decoupled from application config.
#[derive(Debug, Clone, Copy)]
pub struct RankingParams {
    pub title_weight: f64,
    pub summary_weight: f64,
    pub recency_weight: f64,
    pub half_life_days: f64,
}

impl From<&RetrievalConfig> for RankingParams {
    fn from(cfg: &RetrievalConfig) -> Self {
        Self {
            title_weight: cfg.title_weight,
            summary_weight: cfg.summary_weight,
            recency_weight: cfg.recency_weight,
            half_life_days: cfg.recency_half_life_days,
        }
    }
}

impl Default for RankingParams {
    fn default() -> Self {
        (&RetrievalConfig::default()).into()
    }
}

/// Converts an FTS5 `bm25()` value (more negative is better) to a
/// non-negative relevance.
pub fn relevance_from_bm25(bm25: f64) -> f64 {
    if bm25.is_finite() {
        (-bm25).max(0.0)
    } else {
        0.0
    }
}

/// Exponential half-life decay in `(0, 1]`; future timestamps count as age 0.
pub fn recency_factor(age_days: f64, half_life_days: f64) -> f64 {
    let age = if age_days.is_finite() { age_days.max(0.0) } else { 0.0 };
    0.5f64.powf(age / half_life_days)
}

pub fn age_days(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - published).num_seconds() as f64 / 86_400.0
}

pub fn blended_score(relevance: f64, age_days: f64, params: &RankingParams) -> f64 {
    relevance * (1.0 + params.recency_weight * recency_factor(age_days, params.half_life_days))
}

/// Total order for hits: score desc, published desc, url asc.
pub fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.published_iso.cmp(&a.published_iso))
        .then_with(|| a.url.cmp(&b.url))
}
