//! Entry normalization: text cleanup and timestamp canonicalization.
//!
//! Turns a raw [`FeedEntry`] into an [`Article`] ready for storage. Entries
//! without a title or link cannot be stored and are rejected here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::Html;
use thiserror::Error;

use crate::models::{Article, FeedEntry};

/// Canonical on-disk timestamp layout. Lexicographic order equals time order.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";

pub const MAX_TITLE_CHARS: usize = 250;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry has no title")]
    MissingTitle,
    #[error("entry has no link")]
    MissingLink,
}

pub fn normalize_entry(
    entry: &FeedEntry,
    source: &str,
    summary_char_limit: usize,
    now: DateTime<Utc>,
) -> Result<Article, EntryError> {
    let url = entry
        .link
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(EntryError::MissingLink)?;

    let title = entry
        .title
        .as_deref()
        .map(clean_title)
        .filter(|t| !t.is_empty())
        .ok_or(EntryError::MissingTitle)?;

    let summary = entry
        .summary
        .as_deref()
        .map(|s| clean_summary(s, summary_char_limit))
        .unwrap_or_default();

    let published = entry
        .published
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now);

    Ok(Article {
        title,
        summary,
        url: url.to_string(),
        source: source.to_string(),
        published_iso: format_iso(published),
    })
}

pub fn format_iso(ts: DateTime<Utc>) -> String {
    ts.format(ISO_FORMAT).to_string()
}

/// Collapses whitespace, decodes entities and truncates to [`MAX_TITLE_CHARS`].
pub fn clean_title(raw: &str) -> String {
    let text = html_to_text(raw);
    text.chars().take(MAX_TITLE_CHARS).collect()
}

/// Returns a plain-text summary of at most `char_limit` characters (plus a
/// trailing ellipsis when cut).
///
/// Markup is stripped, entities decoded, whitespace collapsed. When the text
/// is too long it is cut after the last full stop that fits, or hard-cut at
/// the limit if there is none.
pub fn clean_summary(raw: &str, char_limit: usize) -> String {
    let text = html_to_text(raw);
    if text.chars().count() <= char_limit {
        return text;
    }

    let head: String = text.chars().take(char_limit).collect();
    let cut = match head.rfind('.') {
        Some(pos) => head[..=pos].to_string(),
        None => head.trim_end().to_string(),
    };
    format!("{}…", cut)
}

fn html_to_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the publish-date layouts seen in the wild, returning `None` when
/// nothing matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_LAYOUTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    const ZONED_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%a, %d %b %Y %H:%M:%S %z"];
    for layout in ZONED_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(raw, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
