//! Feed, item and failure-log repositories.

use chrono::{DateTime, Utc};

use super::types::{
    ErrorCode, FailureLogEntry, Feed, Item, ItemWithFeed, NewFailureLogEntry, NewFeed, NewItem,
};
use crate::datetime::{from_db_timestamp, to_db_timestamp};
use crate::db::DbPool;
use crate::{FeedbarError, Result};

/// Row type for feed from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    url: String,
    name: String,
    icon_url: Option<String>,
    is_active: bool,
    last_fetched_at: Option<String>,
    error_count: i32,
    last_error: Option<String>,
    created_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            url: row.url,
            name: row.name,
            icon_url: row.icon_url,
            is_active: row.is_active,
            last_fetched_at: row.last_fetched_at.and_then(|s| from_db_timestamp(&s)),
            error_count: row.error_count,
            last_error: row.last_error,
            created_at: from_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for item from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    published_at: String,
    summary: Option<String>,
    image_url: Option<String>,
    created_at: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            published_at: from_db_timestamp(&row.published_at).unwrap_or_else(Utc::now),
            summary: row.summary,
            image_url: row.image_url,
            created_at: from_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for item joined with its feed.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemWithFeedRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    published_at: String,
    summary: Option<String>,
    image_url: Option<String>,
    created_at: String,
    feed_name: Option<String>,
    feed_icon_url: Option<String>,
}

impl From<ItemWithFeedRow> for ItemWithFeed {
    fn from(row: ItemWithFeedRow) -> Self {
        let item = Item {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            published_at: from_db_timestamp(&row.published_at).unwrap_or_else(Utc::now),
            summary: row.summary,
            image_url: row.image_url,
            created_at: from_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
        };
        ItemWithFeed {
            item,
            feed_name: row.feed_name,
            feed_icon_url: row.feed_icon_url,
        }
    }
}

/// Row type for failure log entry from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FailureLogRow {
    id: i64,
    feed_id: i64,
    feed_name: String,
    feed_url: String,
    error_code: String,
    error_message: String,
    created_at: String,
}

impl TryFrom<FailureLogRow> for FailureLogEntry {
    type Error = FeedbarError;

    fn try_from(row: FailureLogRow) -> Result<Self> {
        Ok(FailureLogEntry {
            id: row.id,
            feed_id: row.feed_id,
            feed_name: row.feed_name,
            feed_url: row.feed_url,
            error_code: row.error_code.parse::<ErrorCode>()?,
            error_message: row.error_message,
            created_at: from_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
        })
    }
}

const FEED_COLUMNS: &str =
    "id, url, name, icon_url, is_active, last_fetched_at, error_count, last_error, created_at";

const ITEM_COLUMNS: &str =
    "id, feed_id, title, url, published_at, summary, image_url, created_at";

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a new feed.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feeds (url, name, icon_url)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&feed.url)
        .bind(&feed.name)
        .bind(&feed.icon_url)
        .fetch_one(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FeedbarError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// List up to `limit` active feeds, least recently fetched first.
    ///
    /// Feeds never fetched sort before any timestamp.
    pub async fn list_due(&self, limit: usize) -> Result<Vec<Feed>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            WHERE is_active = 1
            ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
            LIMIT $1
            "#
        );
        let rows = sqlx::query_as::<_, FeedRow>(&query)
            .bind(limit as i64)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// List active feeds by name.
    pub async fn list_active(&self) -> Result<Vec<Feed>> {
        self.list_by_state(true).await
    }

    /// List disabled feeds by name.
    pub async fn list_inactive(&self) -> Result<Vec<Feed>> {
        self.list_by_state(false).await
    }

    async fn list_by_state(&self, is_active: bool) -> Result<Vec<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE is_active = $1 ORDER BY name, id");
        let rows = sqlx::query_as::<_, FeedRow>(&query)
            .bind(is_active)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Record a successful refresh: touch the timestamp and clear the
    /// transient failure counter.
    pub async fn mark_fetched(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = $1,
                error_count = 0,
                last_error = NULL
            WHERE id = $2
            "#,
        )
        .bind(to_db_timestamp(&at))
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a transient failure: touch the timestamp and bump the counter.
    pub async fn mark_transient_failure(
        &self,
        id: i64,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = $1,
                error_count = error_count + 1,
                last_error = $2
            WHERE id = $3
            "#,
        )
        .bind(to_db_timestamp(&at))
        .bind(error)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Disable a feed. There is no reverse operation.
    pub async fn deactivate(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET is_active = 0,
                last_fetched_at = $1
            WHERE id = $2
            "#,
        )
        .bind(to_db_timestamp(&at))
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the resolved icon URL.
    pub async fn set_icon_url(&self, id: i64, icon_url: Option<&str>) -> Result<bool> {
        let result = sqlx::query("UPDATE feeds SET icon_url = $1 WHERE id = $2")
            .bind(icon_url)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(count.0)
    }
}

/// Repository for item operations.
pub struct ItemRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an item unless one with the same URL exists.
    ///
    /// Returns the new row ID, or `None` if the URL was already stored.
    /// An existing row is never overwritten.
    pub async fn insert_or_ignore(&self, item: &NewItem) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO items (feed_id, title, url, published_at, summary, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(item.feed_id)
        .bind(&item.title)
        .bind(&item.url)
        .bind(to_db_timestamp(&item.published_at))
        .bind(&item.summary)
        .bind(&item.image_url)
        .execute(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        if result.rows_affected() > 0 {
            Ok(Some(result.last_insert_rowid()))
        } else {
            Ok(None)
        }
    }

    /// Insert a batch of items in one transaction, skipping URLs that
    /// already exist. Returns the number of rows inserted.
    pub async fn insert_batch(&self, items: &[NewItem]) -> Result<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        let mut inserted = 0;
        for item in items {
            let result = sqlx::query(
                r#"
                INSERT INTO items (feed_id, title, url, published_at, summary, image_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (url) DO NOTHING
                "#,
            )
            .bind(item.feed_id)
            .bind(&item.title)
            .bind(&item.url)
            .bind(to_db_timestamp(&item.published_at))
            .bind(&item.summary)
            .bind(&item.image_url)
            .execute(&mut *tx)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(inserted)
    }

    /// Get an item by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Item>> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM items WHERE url = $1");
        let row = sqlx::query_as::<_, ItemRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(row.map(Item::from))
    }

    /// List the newest items with their feed's display fields.
    pub async fn list_latest(&self, limit: usize) -> Result<Vec<ItemWithFeed>> {
        let rows = sqlx::query_as::<_, ItemWithFeedRow>(
            r#"
            SELECT i.id, i.feed_id, i.title, i.url, i.published_at, i.summary,
                   i.image_url, i.created_at,
                   f.name AS feed_name, f.icon_url AS feed_icon_url
            FROM items i
            LEFT JOIN feeds f ON f.id = i.feed_id
            ORDER BY i.published_at DESC, i.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(ItemWithFeed::from).collect())
    }

    /// Delete items published strictly before `cutoff`.
    pub async fn delete_published_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM items WHERE published_at < $1")
            .bind(to_db_timestamp(&cutoff))
            .execute(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Count all items.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(count.0)
    }

    /// Count items owned by a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(count.0)
    }
}

/// Repository for the append-only failure log.
pub struct FailureLogRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FailureLogRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Append an entry and return its ID.
    pub async fn append(&self, entry: &NewFailureLogEntry) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_errors (feed_id, feed_name, feed_url, error_code, error_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(entry.feed_id)
        .bind(&entry.feed_name)
        .bind(&entry.feed_url)
        .bind(entry.error_code.as_str())
        .bind(&entry.error_message)
        .fetch_one(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(id)
    }

    /// List entries for a feed, oldest first.
    pub async fn list_by_feed(&self, feed_id: i64) -> Result<Vec<FailureLogEntry>> {
        let rows = sqlx::query_as::<_, FailureLogRow>(
            r#"
            SELECT id, feed_id, feed_name, feed_url, error_code, error_message, created_at
            FROM feed_errors
            WHERE feed_id = $1
            ORDER BY id
            "#,
        )
        .bind(feed_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| FeedbarError::Database(e.to_string()))?;

        rows.into_iter().map(FailureLogEntry::try_from).collect()
    }

    /// Count all entries.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feed_errors")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedbarError::Database(e.to_string()))?;

        Ok(count.0)
    }
}
