//! # News Index
//!
//! Feed ingestion with durable deduplication and a ranked full-text search
//! service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────────┐   ┌──────────┐
//! │ Feed sources│──▶│  Ingestor   │──▶│    SQLite     │──▶│  Search  │
//! │ RSS / Atom  │   │ dedupe+norm │   │ FTS5 + hashes │   │  (HTTP)  │
//! └─────────────┘   └─────────────┘   └───────────────┘   └──────────┘
//! ```
//!
//! The ingestor and the search service are separate processes. They share
//! nothing but the store, which runs in WAL mode so searches keep reading
//! while an ingest run appends.
//!
//! ## Quick Start
//!
//! ```bash
//! newsidx init                       # create database
//! newsidx ingest --max-per-feed 50   # one ingest run
//! newsidx search "interest rates" --since 2024-01-01
//! newsidx serve                      # start HTTP search service
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`feed`] | RSS / Atom parsing |
//! | [`normalize`] | Entry cleanup and timestamp normalization |
//! | [`fetch`] | Feed fetcher abstraction |
//! | [`ingest`] | Ingestion pipeline |
//! | [`store`] | Article store and dedupe index |
//! | [`rank`] | Relevance × recency scoring |
//! | [`search`] | Query validation and ranked retrieval |
//! | [`server`] | HTTP search service |
//! | [`health`] | Feed health checks |
//! | [`stats`] | Store statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod feed;
pub mod fetch;
pub mod health;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod rank;
pub mod search;
pub mod server;
pub mod stats;
pub mod store;
