//! Store traits used by the ingestion engine.
//!
//! The engine never touches the pool directly; it talks to these traits so
//! that a fake store can stand in for the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::repository::{FailureLogRepository, FeedRepository, ItemRepository};
use super::types::{Feed, NewFailureLogEntry, NewItem};
use crate::db::Database;
use crate::Result;

/// Feed lifecycle storage.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Up to `limit` active feeds, least recently fetched first, never
    /// fetched before all others.
    async fn list_due(&self, limit: usize) -> Result<Vec<Feed>>;

    /// Successful refresh: touch the timestamp and reset the failure counter.
    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Transient failure: touch the timestamp and count the failure.
    async fn mark_transient_failure(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<()>;

    /// Disable the feed and touch the timestamp.
    async fn deactivate(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// Item storage with skip-on-conflict upsert keyed by URL.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert items whose URL is not yet stored. Returns rows inserted.
    async fn insert_items(&self, items: &[NewItem]) -> Result<u64>;

    /// Delete items published strictly before `cutoff`. Returns rows deleted.
    async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Append-only failure log.
#[async_trait]
pub trait FailureLog: Send + Sync {
    async fn append(&self, entry: &NewFailureLogEntry) -> Result<()>;
}

/// Everything the engine needs from storage.
pub trait IngestStore: FeedStore + ItemStore + FailureLog {}

impl<T> IngestStore for T where T: FeedStore + ItemStore + FailureLog {}

#[async_trait]
impl FeedStore for Database {
    async fn list_due(&self, limit: usize) -> Result<Vec<Feed>> {
        FeedRepository::new(self.pool()).list_due(limit).await
    }

    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self.pool())
            .mark_fetched(feed_id, at)
            .await?;
        Ok(())
    }

    async fn mark_transient_failure(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<()> {
        FeedRepository::new(self.pool())
            .mark_transient_failure(feed_id, at, error)
            .await?;
        Ok(())
    }

    async fn deactivate(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self.pool())
            .deactivate(feed_id, at)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for Database {
    async fn insert_items(&self, items: &[NewItem]) -> Result<u64> {
        ItemRepository::new(self.pool()).insert_batch(items).await
    }

    async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        ItemRepository::new(self.pool())
            .delete_published_before(cutoff)
            .await
    }
}

#[async_trait]
impl FailureLog for Database {
    async fn append(&self, entry: &NewFailureLogEntry) -> Result<()> {
        FailureLogRepository::new(self.pool()).append(entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{ErrorCode, NewFeed};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_database_as_dyn_store() {
        let db = Database::open_in_memory().await.unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("https://example.com/feed.xml", "Example"))
            .await
            .unwrap();

        let store: Arc<dyn IngestStore> = Arc::new(db.clone());
        let now = Utc::now();

        let due = store.list_due(10).await.unwrap();
        assert_eq!(due.len(), 1);

        let inserted = store
            .insert_items(&[NewItem::new(feed.id, "A", "http://x/a", now)])
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        store
            .append(&NewFailureLogEntry::for_feed(&feed, ErrorCode::Fatal, "HTTP status 404"))
            .await
            .unwrap();
        store.deactivate(feed.id, now).await.unwrap();

        assert!(store.list_due(10).await.unwrap().is_empty());
        assert_eq!(
            FailureLogRepository::new(db.pool())
                .count()
                .await
                .unwrap(),
            1
        );
    }
}
