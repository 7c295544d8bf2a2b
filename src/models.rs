//! Core data models used throughout the index.
//!
//! These types represent the raw feed entries, the normalized articles, and
//! the search hits that flow through the ingestion and retrieval pipeline.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Raw entry as it appears in a feed, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
}

/// A parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Channel (RSS) or feed (Atom) level link, if any.
    pub link: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// Normalized article, the unit stored in the full-text table.
///
/// Articles are append-only: the store never updates or deletes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub published_iso: String,
}

/// Content fingerprint of an article URL.
///
/// Its presence in the dedupe table is the only thing it records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey(String);

impl DedupeKey {
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.trim().as_bytes());
        DedupeKey(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub published_iso: String,
    /// Blended relevance × recency score; higher ranks first.
    pub score: f64,
}
