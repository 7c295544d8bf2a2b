use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_per_feed")]
    pub max_per_feed: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_summary_char_limit")]
    pub summary_char_limit: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_per_feed: default_max_per_feed(),
            concurrency: default_concurrency(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            summary_char_limit: default_summary_char_limit(),
            user_agent: default_user_agent(),
        }
    }
}

impl IngestConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

fn default_max_per_feed() -> usize {
    50
}
fn default_concurrency() -> usize {
    10
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_run_timeout_secs() -> u64 {
    600
}
fn default_summary_char_limit() -> usize {
    500
}
fn default_user_agent() -> String {
    concat!("newsidx/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,
    #[serde(default = "default_summary_weight")]
    pub summary_weight: f64,
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
    #[serde(default = "default_half_life_days")]
    pub recency_half_life_days: f64,
    #[serde(default = "default_candidate_k")]
    pub candidate_k: i64,
    #[serde(default = "default_final_limit")]
    pub final_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            title_weight: default_title_weight(),
            summary_weight: default_summary_weight(),
            recency_weight: default_recency_weight(),
            recency_half_life_days: default_half_life_days(),
            candidate_k: default_candidate_k(),
            final_limit: default_final_limit(),
            max_limit: default_max_limit(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl RetrievalConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

fn default_title_weight() -> f64 {
    2.0
}
fn default_summary_weight() -> f64 {
    1.0
}
fn default_recency_weight() -> f64 {
    0.25
}
fn default_half_life_days() -> f64 {
    7.0
}
fn default_candidate_k() -> i64 {
    200
}
fn default_final_limit() -> i64 {
    20
}
fn default_max_limit() -> i64 {
    100
}
fn default_query_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// One configured syndication endpoint.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    /// Display name stored with each article. Falls back to the channel link.
    #[serde(default)]
    pub source: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let ingest = &config.ingest;
    if ingest.max_per_feed == 0 {
        anyhow::bail!("ingest.max_per_feed must be >= 1");
    }
    if ingest.concurrency == 0 {
        anyhow::bail!("ingest.concurrency must be >= 1");
    }
    if ingest.fetch_timeout_secs == 0 || ingest.run_timeout_secs == 0 {
        anyhow::bail!("ingest timeouts must be > 0");
    }
    if ingest.summary_char_limit == 0 {
        anyhow::bail!("ingest.summary_char_limit must be > 0");
    }

    let retrieval = &config.retrieval;
    if retrieval.title_weight <= 0.0 || retrieval.summary_weight <= 0.0 {
        anyhow::bail!("retrieval.title_weight and retrieval.summary_weight must be > 0");
    }
    if retrieval.recency_weight < 0.0 {
        anyhow::bail!("retrieval.recency_weight must be >= 0");
    }
    if retrieval.recency_half_life_days <= 0.0 {
        anyhow::bail!("retrieval.recency_half_life_days must be > 0");
    }
    if retrieval.final_limit < 1 || retrieval.final_limit > retrieval.max_limit {
        anyhow::bail!("retrieval.final_limit must be in [1, retrieval.max_limit]");
    }
    if retrieval.candidate_k < retrieval.max_limit {
        anyhow::bail!("retrieval.candidate_k must be >= retrieval.max_limit");
    }
    if retrieval.query_timeout_secs == 0 {
        anyhow::bail!("retrieval.query_timeout_secs must be > 0");
    }

    for feed in &config.feeds {
        let url = feed.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("feed url must be http(s): '{}'", feed.url);
        }
    }

    Ok(())
}
