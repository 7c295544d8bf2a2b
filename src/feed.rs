//! Syndication feed parsing.
//!
//! Handles RSS 2.0, RSS 1.0 (RDF) and Atom documents with a single
//! event-driven pass over the XML. Only the fields the index stores are
//! extracted; everything else is skipped.

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::models::{FeedEntry, ParsedFeed};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed XML: {0}")]
    Xml(String),
    #[error("not a syndication feed: {0}")]
    NotAFeed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Summary,
    ContentEncoded,
    Content,
    PubDate,
    Published,
    DcDate,
    Updated,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"summary" => Some(Field::Summary),
            b"encoded" => Some(Field::ContentEncoded),
            b"content" => Some(Field::Content),
            b"pubDate" => Some(Field::PubDate),
            b"published" => Some(Field::Published),
            b"date" => Some(Field::DcDate),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Per-entry field slots; the first occurrence of each wins.
#[derive(Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    content_encoded: Option<String>,
    content: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    dc_date: Option<String>,
    updated: Option<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::ContentEncoded => &mut self.content_encoded,
            Field::Content => &mut self.content,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
            Field::DcDate => &mut self.dc_date,
            Field::Updated => &mut self.updated,
        };
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    fn into_entry(self) -> FeedEntry {
        FeedEntry {
            title: self.title,
            link: self.link,
            summary: self
                .description
                .or(self.summary)
                .or(self.content_encoded)
                .or(self.content),
            published: self
                .pub_date
                .or(self.published)
                .or(self.dc_date)
                .or(self.updated),
        }
    }
}

/// Parses a feed body into its entries.
///
/// Malformed XML or an unknown root element is an error for the whole feed.
/// Entries are returned as found; missing fields are left to normalization.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut feed = ParsedFeed::default();
    let mut seen_root = false;
    let mut depth = 0usize;

    // (depth of the <item>/<entry> element, fields collected so far)
    let mut entry: Option<(usize, RawEntry)> = None;
    // (field being captured, depth of its element, text so far)
    let mut capture: Option<(Field, usize, String)> = None;
    let mut channel_link: Option<(usize, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                let name = name.as_ref();

                if !seen_root {
                    check_root(name)?;
                    seen_root = true;
                } else if capture.is_some() {
                    // Markup nested inside a captured field (e.g. Atom xhtml content)
                } else if let Some((_, raw)) = entry.as_mut() {
                    let href = if name == b"link" {
                        link_href(&e, reader.decoder())
                    } else {
                        None
                    };
                    if let Some(href) = href {
                        raw.set(Field::Link, href);
                    } else if let Some(field) = Field::from_local_name(name) {
                        capture = Some((field, depth, String::new()));
                    }
                } else if name == b"item" || name == b"entry" {
                    entry = Some((depth, RawEntry::default()));
                } else if name == b"link" && feed.link.is_none() {
                    match link_href(&e, reader.decoder()) {
                        Some(href) => feed.link = Some(href),
                        None => channel_link = Some((depth, String::new())),
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if !seen_root {
                    check_root(name.as_ref())?;
                    seen_root = true;
                } else if name.as_ref() == b"link" && capture.is_none() {
                    if let Some(href) = link_href(&e, reader.decoder()) {
                        match entry.as_mut() {
                            Some((_, raw)) => raw.set(Field::Link, href),
                            None if feed.link.is_none() => feed.link = Some(href),
                            None => {}
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    // HTML entities such as &nbsp; are not XML entities; keep them raw
                    // and let summary cleaning decode them.
                    Err(_) => decode_raw(&reader, &t),
                };
                if let Some((_, _, acc)) = capture.as_mut() {
                    acc.push_str(&text);
                } else if let Some((_, acc)) = channel_link.as_mut() {
                    acc.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                let text = decode_raw(&reader, &c);
                if let Some((_, _, acc)) = capture.as_mut() {
                    acc.push_str(&text);
                } else if let Some((_, acc)) = channel_link.as_mut() {
                    acc.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                if matches!(capture, Some((_, d, _)) if d == depth) {
                    if let (Some((field, _, text)), Some((_, raw))) = (capture.take(), entry.as_mut())
                    {
                        raw.set(field, text);
                    }
                } else if matches!(entry, Some((d, _)) if d == depth) {
                    if let Some((_, raw)) = entry.take() {
                        feed.entries.push(raw.into_entry());
                    }
                } else if matches!(channel_link, Some((d, _)) if d == depth) {
                    if let Some((_, text)) = channel_link.take() {
                        let text = text.trim();
                        if !text.is_empty() {
                            feed.link = Some(text.to_string());
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(FeedError::NotAFeed("empty document".to_string()));
    }

    Ok(feed)
}

/// Decodes raw event bytes with the encoding declared by the document.
fn decode_raw(reader: &Reader<&[u8]>, raw: &[u8]) -> String {
    match reader.decoder().decode(raw) {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn check_root(name: &[u8]) -> Result<(), FeedError> {
    match name {
        b"rss" | b"RDF" | b"feed" => Ok(()),
        other => Err(FeedError::NotAFeed(format!(
            "unexpected root element <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Returns the `href` of an Atom-style `<link>`, honouring only
/// `rel="alternate"` (or no `rel` at all).
fn link_href(e: &BytesStart<'_>, decoder: Decoder) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        let value = match attr.decode_and_unescape_value(decoder) {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel_ok = value == "alternate",
            _ => {}
        }
    }
    href.filter(|h| rel_ok && !h.trim().is_empty())
        .map(|h| h.trim().to_string())
}
