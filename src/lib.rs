//! FeedBar ingestion worker.
//!
//! Periodically refreshes RSS/Atom feeds into a SQLite item store and
//! disables feeds that are dead, empty or stale.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;

pub use config::Config;
pub use db::Database;
pub use error::{FeedbarError, Result};
pub use ingest::{BatchReport, BatchScheduler, FeedFetcher, FetchError, HttpFetcher};
