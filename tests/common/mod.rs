//! Test helpers for ingestion tests.
//!
//! Provides a scripted fetcher, a store wrapper that can inject write
//! failures, and feed/entry builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use feedbar_ingest::config::IngestConfig;
use feedbar_ingest::ingest::{
    FailureLog, Feed, FeedFetcher, FeedRepository, FeedStore, FetchError, ItemStore,
    NewFailureLogEntry, NewFeed, NewItem, RawEntry,
};
use feedbar_ingest::{Database, FeedbarError, Result};

type Script = std::result::Result<Vec<RawEntry>, FetchError>;

/// Fetcher answering from a fixed per-URL script.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Script>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with the given entries.
    pub fn entries(self, url: &str, entries: Vec<RawEntry>) -> Self {
        self.set(url, Ok(entries));
        self
    }

    /// Answer `url` with the given error.
    pub fn error(self, url: &str, error: FetchError) -> Self {
        self.set(url, Err(error));
        self
    }

    /// Delay the answer for `url`.
    pub fn delay(self, url: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
        self
    }

    pub fn set(&self, url: &str, script: Script) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<RawEntry>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Transport(format!("no script for {url}"))))
    }
}

/// Database-backed store that can be told to fail item or log writes.
pub struct FlakyStore {
    db: Database,
    fail_items: AtomicBool,
    fail_log: AtomicBool,
}

impl FlakyStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            fail_items: AtomicBool::new(false),
            fail_log: AtomicBool::new(false),
        }
    }

    pub fn fail_items(&self, fail: bool) {
        self.fail_items.store(fail, Ordering::SeqCst);
    }

    pub fn fail_log(&self, fail: bool) {
        self.fail_log.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedStore for FlakyStore {
    async fn list_due(&self, limit: usize) -> Result<Vec<Feed>> {
        self.db.list_due(limit).await
    }

    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.db.mark_fetched(feed_id, at).await
    }

    async fn mark_transient_failure(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<()> {
        self.db.mark_transient_failure(feed_id, at, error).await
    }

    async fn deactivate(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.db.deactivate(feed_id, at).await
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn insert_items(&self, items: &[NewItem]) -> Result<u64> {
        if self.fail_items.load(Ordering::SeqCst) {
            return Err(FeedbarError::Database("disk I/O error".to_string()));
        }
        self.db.insert_items(items).await
    }

    async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.db.delete_published_before(cutoff).await
    }
}

#[async_trait]
impl FailureLog for FlakyStore {
    async fn append(&self, entry: &NewFailureLogEntry) -> Result<()> {
        if self.fail_log.load(Ordering::SeqCst) {
            return Err(FeedbarError::Database("database is locked".to_string()));
        }
        FailureLog::append(&self.db, entry).await
    }
}

/// Open a fresh in-memory database.
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Register a feed.
pub async fn create_feed(db: &Database, url: &str, name: &str) -> Feed {
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(url, name))
        .await
        .unwrap()
}

/// Reload a feed by ID.
pub async fn reload(db: &Database, feed_id: i64) -> Feed {
    FeedRepository::new(db.pool())
        .get_by_id(feed_id)
        .await
        .unwrap()
        .unwrap()
}

/// A titled entry with a link and an optional publication date.
pub fn entry(title: &str, link: &str, published: Option<DateTime<Utc>>) -> RawEntry {
    RawEntry {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        published,
        ..RawEntry::default()
    }
}

/// Default ingest settings.
pub fn ingest_config() -> IngestConfig {
    IngestConfig::default()
}
