use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::Row;
use tempfile::TempDir;

use news_index::config::{parse_config, Config, FeedSource};
use news_index::db;
use news_index::fetch::FeedFetcher;
use news_index::ingest::{ingest_feeds, run_ingest_with, IngestOptions};
use news_index::migrate::apply_schema;
use news_index::models::{Article, DedupeKey};
use news_index::search::{search, SearchError, SearchRequest};
use news_index::store::ArticleStore;

/// Serves canned bodies; any URL not registered behaves like a dead host.
#[derive(Default)]
struct CannedFetcher {
    bodies: HashMap<String, String>,
}

impl CannedFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl FeedFetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        match self.bodies.get(url) {
            Some(body) => Ok(body.as_bytes().to_vec()),
            None => anyhow::bail!("error sending request for url ({}): connection refused", url),
        }
    }
}

/// Delays or panics on selected URLs and defers everything else to `inner`.
struct MisbehavingFetcher {
    inner: CannedFetcher,
    slow: HashMap<String, Duration>,
    panics_on: Option<String>,
}

impl MisbehavingFetcher {
    fn new(inner: CannedFetcher) -> Self {
        Self {
            inner,
            slow: HashMap::new(),
            panics_on: None,
        }
    }

    fn slow(mut self, url: &str, delay: Duration) -> Self {
        self.slow.insert(url.to_string(), delay);
        self
    }

    fn panics(mut self, url: &str) -> Self {
        self.panics_on = Some(url.to_string());
        self
    }
}

#[async_trait]
impl FeedFetcher for MisbehavingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if self.panics_on.as_deref() == Some(url) {
            panic!("fetcher blew up on {}", url);
        }
        if let Some(delay) = self.slow.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.fetch(url).await
    }
}

fn setup() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let cfg = parse_config(&format!(
        "[db]\npath = \"{}/data/news.sqlite\"\n",
        tmp.path().display()
    ))
    .unwrap();
    (tmp, cfg)
}

async fn open_store(cfg: &Config) -> ArticleStore {
    let pool = db::connect(cfg).await.unwrap();
    apply_schema(&pool).await.unwrap();
    ArticleStore::new(pool)
}

fn options(max_per_feed: usize) -> IngestOptions {
    IngestOptions {
        max_per_feed,
        concurrency: 4,
        fetch_timeout: Duration::from_secs(5),
        summary_char_limit: 500,
    }
}

fn feed(url: &str, source: &str) -> FeedSource {
    FeedSource {
        url: url.to_string(),
        source: Some(source.to_string()),
    }
}

fn rss(items: &[(&str, &str, &str, &str)]) -> String {
    let mut body = String::from("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title><link>https://feed.example/</link>");
    for (title, link, summary, date) in items {
        body.push_str(&format!(
            "<item><title>{}</title><link>{}</link><description>{}</description><pubDate>{}</pubDate></item>",
            title, link, summary, date
        ));
    }
    body.push_str("</channel></rss>");
    body
}

async fn all_rows(store: &ArticleStore) -> Vec<(String, String, String, String, String)> {
    sqlx::query("SELECT title, summary, url, source, published_iso FROM articles ORDER BY url")
        .fetch_all(store.pool())
        .await
        .unwrap()
        .iter()
        .map(|r| {
            (
                r.get("title"),
                r.get("summary"),
                r.get("url"),
                r.get("source"),
                r.get("published_iso"),
            )
        })
        .collect()
}

fn feed_a() -> String {
    rss(&[(
        "Rust 2.0 announced",
        "https://a.example/1",
        "<p>The <b>big</b> release.</p>",
        "Mon, 01 Jan 2024 10:00:00 GMT",
    )])
}

// ============ Ingestion ============

#[tokio::test]
async fn test_failed_feed_does_not_abort_run() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher = Arc::new(CannedFetcher::default().with("https://a.example/rss", &feed_a()));
    let feeds = vec![
        feed("https://a.example/rss", "A"),
        feed("https://b.example/rss", "B"),
    ];

    let report = ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();

    assert_eq!(report.feeds_attempted, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "B");
    assert!(report.failures[0].error.contains("connection refused"));
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count_url("https://a.example/1").await.unwrap(), 1);

    let rows = all_rows(&store).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "Rust 2.0 announced");
    assert_eq!(rows[0].1, "The big release.");
    assert_eq!(rows[0].3, "A");
    assert_eq!(rows[0].4, "2024-01-01T10:00:00+00:00");
}

#[tokio::test]
async fn test_slow_feed_times_out_without_stalling_run() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher = Arc::new(
        MisbehavingFetcher::new(
            CannedFetcher::default()
                .with("https://a.example/rss", &feed_a())
                .with("https://slow.example/rss", &feed_a()),
        )
        .slow("https://slow.example/rss", Duration::from_secs(30)),
    );
    let feeds = vec![
        feed("https://a.example/rss", "A"),
        feed("https://slow.example/rss", "Slow"),
    ];
    let opts = IngestOptions {
        fetch_timeout: Duration::from_millis(200),
        ..options(50)
    };

    let started = std::time::Instant::now();
    let report = ingest_feeds(&store, fetcher, &feeds, &opts).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "Slow");
    assert_eq!(report.failures[0].url, "https://slow.example/rss");
    assert!(
        report.failures[0].error.contains("timed out"),
        "got: {}",
        report.failures[0].error
    );
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count_url("https://a.example/1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_run_timeout_fails_run_but_keeps_committed_articles() {
    let tmp = TempDir::new().unwrap();
    let cfg = parse_config(&format!(
        r#"[db]
path = "{}/data/news.sqlite"

[ingest]
fetch_timeout_secs = 60
run_timeout_secs = 1

[[feeds]]
url = "https://a.example/rss"
source = "A"

[[feeds]]
url = "https://slow.example/rss"
source = "Slow"
"#,
        tmp.path().display()
    ))
    .unwrap();
    let fetcher: Arc<dyn FeedFetcher> = Arc::new(
        MisbehavingFetcher::new(
            CannedFetcher::default()
                .with("https://a.example/rss", &feed_a())
                .with("https://slow.example/rss", &feed_a()),
        )
        .slow("https://slow.example/rss", Duration::from_secs(30)),
    );

    let err = run_ingest_with(&cfg, fetcher, None).await.unwrap_err();
    assert!(err.to_string().contains("ingest run timed out"), "got: {:#}", err);

    let store = open_store(&cfg).await;
    assert_eq!(store.count_url("https://a.example/1").await.unwrap(), 1);
    assert_eq!(store.count_keys().await.unwrap(), 1);
}

#[tokio::test]
async fn test_panicking_fetch_is_reported_against_its_feed() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher = Arc::new(
        MisbehavingFetcher::new(CannedFetcher::default().with("https://a.example/rss", &feed_a()))
            .panics("https://broken.example/rss"),
    );
    let feeds = vec![
        feed("https://a.example/rss", "A"),
        feed("https://broken.example/rss", "Broken"),
    ];

    let report = ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();

    assert_eq!(report.feeds_ok(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "Broken");
    assert_eq!(report.failures[0].url, "https://broken.example/rss");
    assert!(report.failures[0].error.contains("feed task failed"));
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher: Arc<dyn FeedFetcher> =
        Arc::new(CannedFetcher::default().with("https://a.example/rss", &feed_a()));
    let feeds = vec![feed("https://a.example/rss", "A")];

    let first = ingest_feeds(&store, fetcher.clone(), &feeds, &options(50))
        .await
        .unwrap();
    let after_first = all_rows(&store).await;

    let second = ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();
    let after_second = all_rows(&store).await;

    assert_eq!(first.inserted, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(after_first, after_second);
    assert_eq!(store.count_url("https://a.example/1").await.unwrap(), 1);
    assert_eq!(
        store.count_keys().await.unwrap(),
        store.count_articles().await.unwrap()
    );
}

#[tokio::test]
async fn test_same_url_in_two_feeds_stored_once() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher = Arc::new(
        CannedFetcher::default()
            .with("https://a.example/rss", &feed_a())
            .with("https://mirror.example/rss", &feed_a()),
    );
    let feeds = vec![
        feed("https://a.example/rss", "A"),
        feed("https://mirror.example/rss", "Mirror"),
    ];

    let report = ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(store.count_articles().await.unwrap(), 1);
}

#[tokio::test]
async fn test_max_per_feed_truncates_each_run() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let items: Vec<(String, String)> = (1..=5)
        .map(|i| (format!("Story {}", i), format!("https://a.example/{}", i)))
        .collect();
    let refs: Vec<(&str, &str, &str, &str)> = items
        .iter()
        .map(|(t, l)| (t.as_str(), l.as_str(), "", "Mon, 01 Jan 2024 10:00:00 GMT"))
        .collect();
    let fetcher: Arc<dyn FeedFetcher> =
        Arc::new(CannedFetcher::default().with("https://a.example/rss", &rss(&refs)));
    let feeds = vec![feed("https://a.example/rss", "A")];

    let first = ingest_feeds(&store, fetcher.clone(), &feeds, &options(2))
        .await
        .unwrap();
    assert_eq!(first.entries_seen, 2);
    assert_eq!(first.inserted, 2);

    let second = ingest_feeds(&store, fetcher, &feeds, &options(5)).await.unwrap();
    assert_eq!(second.inserted, 3);
    assert_eq!(second.duplicates, 2);
    assert_eq!(store.count_articles().await.unwrap(), 5);
}

#[tokio::test]
async fn test_bad_entries_and_bad_feeds_are_skipped() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let mixed = "<rss><channel>\
        <item><title>No link here</title></item>\
        <item><link>https://a.example/untitled</link></item>\
        <item><title>Good</title><link>https://a.example/good</link></item>\
        </channel></rss>";
    let fetcher = Arc::new(
        CannedFetcher::default()
            .with("https://a.example/rss", mixed)
            .with("https://broken.example/rss", "<rss><channel><item></rss>")
            .with("https://html.example/", "<html><body>not a feed</body></html>"),
    );
    let feeds = vec![
        feed("https://a.example/rss", "A"),
        feed("https://broken.example/rss", "Broken"),
        feed("https://html.example/", "Html"),
    ];

    let report = ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.invalid, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(store.count_articles().await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_date_falls_back_to_ingestion_time() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let body = "<rss><channel><item><title>Undated</title><link>https://a.example/u</link></item></channel></rss>";
    let fetcher = Arc::new(CannedFetcher::default().with("https://a.example/rss", body));

    let before = Utc::now() - chrono::Duration::seconds(2);
    ingest_feeds(&store, fetcher, &[feed("https://a.example/rss", "A")], &options(50))
        .await
        .unwrap();
    let after = Utc::now() + chrono::Duration::seconds(2);

    let rows = all_rows(&store).await;
    let published = chrono::DateTime::parse_from_rfc3339(&rows[0].4).unwrap();
    assert!(published >= before && published <= after);
}

#[tokio::test]
async fn test_source_falls_back_to_channel_link() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher = Arc::new(CannedFetcher::default().with("https://a.example/rss", &feed_a()));
    let feeds = vec![FeedSource {
        url: "https://a.example/rss".to_string(),
        source: None,
    }];

    ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();
    assert_eq!(all_rows(&store).await[0].3, "https://feed.example/");
}

#[tokio::test]
async fn test_failed_article_write_leaves_no_dedupe_key() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    let fetcher: Arc<dyn FeedFetcher> =
        Arc::new(CannedFetcher::default().with("https://a.example/rss", &feed_a()));
    let feeds = vec![feed("https://a.example/rss", "A")];

    // Break the second write of the pair.
    sqlx::query("DROP TABLE articles")
        .execute(store.pool())
        .await
        .unwrap();

    let result = ingest_feeds(&store, fetcher.clone(), &feeds, &options(50)).await;
    assert!(result.is_err(), "store failure must fail the run");
    assert_eq!(store.count_keys().await.unwrap(), 0);

    // Once the store is healthy again the article is still ingestable.
    apply_schema(store.pool()).await.unwrap();
    let report = ingest_feeds(&store, fetcher, &feeds, &options(50)).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count_keys().await.unwrap(), 1);
    assert_eq!(store.count_articles().await.unwrap(), 1);
}

// ============ Search ============

fn article(title: &str, summary: &str, url: &str, published_iso: &str) -> Article {
    Article {
        title: title.to_string(),
        summary: summary.to_string(),
        url: url.to_string(),
        source: "test".to_string(),
        published_iso: published_iso.to_string(),
    }
}

async fn seed(store: &ArticleStore, articles: &[Article]) {
    for a in articles {
        store
            .insert_article(&DedupeKey::from_url(&a.url), a)
            .await
            .unwrap();
    }
}

/// Unrelated articles so term statistics resemble a real corpus.
fn fillers() -> Vec<Article> {
    [
        ("weather update", "sunny skies"),
        ("market close", "stocks flat"),
        ("football final", "late goal"),
        ("city council", "budget vote"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (t, s))| {
        article(
            t,
            s,
            &format!("https://filler.example/{}", i),
            "2024-05-15T00:00:00+00:00",
        )
    })
    .collect()
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn query(q: &str) -> SearchRequest {
    SearchRequest {
        query: q.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_more_title_occurrences_rank_first() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(&store, &fillers()).await;
    seed(
        &store,
        &[
            article(
                "rust compiler new release",
                "notes",
                "https://x.example/once",
                "2024-05-20T00:00:00+00:00",
            ),
            article(
                "rust compiler rust release",
                "notes",
                "https://x.example/twice",
                "2024-05-20T00:00:00+00:00",
            ),
        ],
    )
    .await;

    let hits = search(&store, &cfg.retrieval, &query("rust"), now()).await.unwrap();
    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(urls, vec!["https://x.example/twice", "https://x.example/once"]);
}

#[tokio::test]
async fn test_equal_relevance_newer_first() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(&store, &fillers()).await;
    seed(
        &store,
        &[
            article(
                "rust release",
                "notes",
                "https://x.example/old",
                "2024-05-01T00:00:00+00:00",
            ),
            article(
                "rust release",
                "notes",
                "https://x.example/new",
                "2024-05-28T00:00:00+00:00",
            ),
        ],
    )
    .await;

    let hits = search(&store, &cfg.retrieval, &query("rust"), now()).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "https://x.example/new");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn test_newest_survives_candidate_cut_among_equal_matches() {
    let tmp = TempDir::new().unwrap();
    let cfg = parse_config(&format!(
        "[db]\npath = \"{}/news.sqlite\"\n\n[retrieval]\ncandidate_k = 20\nmax_limit = 10\nfinal_limit = 5\n",
        tmp.path().display()
    ))
    .unwrap();
    let store = open_store(&cfg).await;

    let quiet: Vec<Article> = (0..70)
        .map(|i| {
            article(
                &format!("quiet day {}", i),
                "nothing happened",
                &format!("https://filler.example/{}", i),
                "2024-05-15T00:00:00+00:00",
            )
        })
        .collect();
    seed(&store, &quiet).await;

    // Identical text, inserted oldest first, one hour apart.
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let storms: Vec<Article> = (0..30)
        .map(|i| {
            let published = start + chrono::Duration::hours(i);
            article(
                "storm warning",
                "coastal areas",
                &format!("https://x.example/{}", i),
                &published.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
            )
        })
        .collect();
    seed(&store, &storms).await;

    let hits = search(&store, &cfg.retrieval, &query("storm"), now()).await.unwrap();
    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://x.example/29",
            "https://x.example/28",
            "https://x.example/27",
            "https://x.example/26",
            "https://x.example/25",
        ]
    );
}

#[tokio::test]
async fn test_summary_only_match_ranks_below_title_match() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(&store, &fillers()).await;
    seed(
        &store,
        &[
            article(
                "weekly digest",
                "rust release",
                "https://x.example/in-summary",
                "2024-05-20T00:00:00+00:00",
            ),
            article(
                "rust release",
                "weekly digest",
                "https://x.example/in-title",
                "2024-05-20T00:00:00+00:00",
            ),
        ],
    )
    .await;

    let hits = search(&store, &cfg.retrieval, &query("rust"), now()).await.unwrap();
    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://x.example/in-title", "https://x.example/in-summary"]
    );
}

#[tokio::test]
async fn test_old_but_far_more_relevant_beats_fresh() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(&store, &fillers()).await;
    seed(
        &store,
        &[
            article(
                "rust rust rust rust",
                "rust rust rust rust",
                "https://x.example/ancient",
                "2015-01-01T00:00:00+00:00",
            ),
            article(
                "rust and many other unrelated words here",
                "a long summary that mentions nothing relevant at all today",
                "https://x.example/fresh",
                "2024-05-31T00:00:00+00:00",
            ),
        ],
    )
    .await;

    let hits = search(&store, &cfg.retrieval, &query("rust"), now()).await.unwrap();
    assert_eq!(hits[0].url, "https://x.example/ancient");
}

#[tokio::test]
async fn test_since_filter() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(
        &store,
        &[
            article("rust old", "", "https://x.example/old", "2023-12-31T23:59:59+00:00"),
            article("rust new", "", "https://x.example/new", "2024-01-01T00:00:00+00:00"),
        ],
    )
    .await;

    let mut req = query("rust");
    req.since = Some("2024-01-01".to_string());
    let hits = search(&store, &cfg.retrieval, &req, now()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://x.example/new");

    req.since = Some("2030-01-01".to_string());
    let hits = search(&store, &cfg.retrieval, &req, now()).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_invalid_queries_rejected() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;

    let err = search(&store, &cfg.retrieval, &query(""), now()).await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));

    let mut req = query("rust");
    req.since = Some("not-a-date".to_string());
    let err = search(&store, &cfg.retrieval, &req, now()).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidSince(_)));
}

#[tokio::test]
async fn test_punctuation_in_query_is_safe() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(
        &store,
        &[article(
            "C++ and Rust: a comparison",
            "",
            "https://x.example/cmp",
            "2024-05-01T00:00:00+00:00",
        )],
    )
    .await;

    let hits = search(&store, &cfg.retrieval, &query("rust: \"c++\" OR (NEAR"), now()).await;
    assert!(hits.is_ok(), "query syntax must never reach FTS5: {:?}", hits.err());
}

#[tokio::test]
async fn test_search_has_no_side_effects() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(&store, &fillers()).await;
    let before = (store.count_articles().await.unwrap(), store.count_keys().await.unwrap());

    let reader = ArticleStore::new(db::connect_reader(&cfg).unwrap());
    for q in ["weather", "stocks", "nothing-matches-this"] {
        search(&reader, &cfg.retrieval, &query(q), now()).await.unwrap();
    }

    let after = (store.count_articles().await.unwrap(), store.count_keys().await.unwrap());
    assert_eq!(before, after);

    let write = sqlx::query("INSERT INTO article_hashes (url_hash) VALUES ('x')")
        .execute(reader.pool())
        .await;
    assert!(write.is_err(), "reader pool must be query-only");
}

#[tokio::test]
async fn test_reads_proceed_during_open_write() {
    let (_tmp, cfg) = setup();
    let store = open_store(&cfg).await;
    seed(&store, &fillers()).await;

    let mut tx = store.pool().begin().await.unwrap();
    sqlx::query(
        "INSERT INTO articles (title, summary, url, source, published_iso) VALUES ('weather alert', '', 'https://x.example/pending', 't', '2024-05-31T00:00:00+00:00')",
    )
    .execute(&mut *tx)
    .await
    .unwrap();

    let reader = ArticleStore::new(db::connect_reader(&cfg).unwrap());
    let hits = search(&reader, &cfg.retrieval, &query("weather"), now()).await.unwrap();
    assert_eq!(hits.len(), 1, "uncommitted row must not be visible");

    tx.commit().await.unwrap();
    let hits = search(&reader, &cfg.retrieval, &query("weather"), now()).await.unwrap();
    assert_eq!(hits.len(), 2);
}
