//! Ingestion types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::FeedbarError;

/// Maximum length of a stored item summary, in characters.
pub const MAX_SUMMARY_LENGTH: usize = 300;

/// Title used for entries that carry none.
pub const UNTITLED: &str = "Untitled";

/// A registered feed source.
#[derive(Debug, Clone)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Source address.
    pub url: String,
    /// Display label.
    pub name: String,
    /// Resolved favicon/logo address, filled in by the icon collaborator.
    pub icon_url: Option<String>,
    /// Whether the feed is eligible for future fetch cycles.
    pub is_active: bool,
    /// Most recent fetch attempt, successful or retried.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Consecutive transient failures since the last refresh.
    pub error_count: i32,
    /// Message of the most recent transient failure.
    pub last_error: Option<String>,
    /// When the feed was registered.
    pub created_at: DateTime<Utc>,
}

/// New feed for registration.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Source address.
    pub url: String,
    /// Display label.
    pub name: String,
    /// Optional icon address.
    pub icon_url: Option<String>,
}

impl NewFeed {
    /// Create a new feed registration.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            icon_url: None,
        }
    }

    /// Set the icon URL.
    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }
}

/// A stored item.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored item joined with its owning feed's display fields.
#[derive(Debug, Clone)]
pub struct ItemWithFeed {
    /// The item itself.
    pub item: Item,
    /// Owning feed's name, if the feed still exists.
    pub feed_name: Option<String>,
    /// Owning feed's icon, if any.
    pub feed_icon_url: Option<String>,
}

/// Canonical item record produced by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// Owning feed.
    pub feed_id: i64,
    /// Item title, never empty.
    pub title: String,
    /// Item URL, the global deduplication key.
    pub url: String,
    /// Publication instant.
    pub published_at: DateTime<Utc>,
    /// Plain-text summary, at most [`MAX_SUMMARY_LENGTH`] characters.
    pub summary: Option<String>,
    /// Resolved image address.
    pub image_url: Option<String>,
}

impl NewItem {
    /// Create a new item record.
    pub fn new(
        feed_id: i64,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            published_at,
            summary: None,
            image_url: None,
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the image URL.
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Reason a feed was disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The feed returned no usable entries.
    NoItems,
    /// Every entry is older than the retention cutoff.
    Stale,
    /// The fetch failed in a way that will not recover.
    Fatal,
}

impl ErrorCode {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoItems => "NO_ITEMS",
            ErrorCode::Stale => "STALE",
            ErrorCode::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = FeedbarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_ITEMS" => Ok(ErrorCode::NoItems),
            "STALE" => Ok(ErrorCode::Stale),
            "FATAL" => Ok(ErrorCode::Fatal),
            other => Err(FeedbarError::Validation(format!(
                "unknown feed error code: {other}"
            ))),
        }
    }
}

/// A failure log row.
#[derive(Debug, Clone)]
pub struct FailureLogEntry {
    pub id: i64,
    pub feed_id: i64,
    pub feed_name: String,
    pub feed_url: String,
    pub error_code: ErrorCode,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

/// New failure log row.
#[derive(Debug, Clone)]
pub struct NewFailureLogEntry {
    pub feed_id: i64,
    pub feed_name: String,
    pub feed_url: String,
    pub error_code: ErrorCode,
    pub error_message: String,
}

impl NewFailureLogEntry {
    /// Build a log row describing why `feed` was disabled.
    pub fn for_feed(feed: &Feed, error_code: ErrorCode, error_message: impl Into<String>) -> Self {
        Self {
            feed_id: feed.id,
            feed_name: feed.name.clone(),
            feed_url: feed.url.clone(),
            error_code,
            error_message: error_message.into(),
        }
    }
}

/// Embedded media-content URLs of an entry.
///
/// Feeds encode this tag either once or repeatedly; both shapes are
/// resolved here so callers see one shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MediaContent {
    #[default]
    Absent,
    Single(String),
    List(Vec<String>),
}

impl MediaContent {
    /// Build from the URLs found on an entry, skipping empty ones.
    pub fn from_urls<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut urls: Vec<String> = urls
            .into_iter()
            .filter(|u| !u.trim().is_empty())
            .collect();
        match urls.len() {
            0 => MediaContent::Absent,
            1 => MediaContent::Single(urls.remove(0)),
            _ => MediaContent::List(urls),
        }
    }

    /// First URL, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            MediaContent::Absent => None,
            MediaContent::Single(url) => Some(url),
            MediaContent::List(urls) => urls.first().map(String::as_str),
        }
    }

    /// Drop the first occurrence of `url`.
    pub fn without(self, url: &str) -> Self {
        let mut urls = match self {
            MediaContent::Absent => return MediaContent::Absent,
            MediaContent::Single(u) => vec![u],
            MediaContent::List(urls) => urls,
        };
        if let Some(pos) = urls.iter().position(|u| u == url) {
            urls.remove(pos);
        }
        MediaContent::from_urls(urls)
    }
}

/// A parsed feed entry, exposed to the normalizer without any selection.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    /// Entry identifier (RSS guid or Atom id).
    pub guid: Option<String>,
    pub title: Option<String>,
    /// Article link.
    pub link: Option<String>,
    /// Structured publication date.
    pub published: Option<DateTime<Utc>>,
    /// Last-updated date.
    pub updated: Option<DateTime<Utc>>,
    /// Full inline content, usually HTML.
    pub content: Option<String>,
    /// Description or summary text, possibly HTML.
    pub description: Option<String>,
    /// Standard enclosure URL.
    pub enclosure: Option<String>,
    /// Embedded media-content URLs.
    pub media: MediaContent,
    /// Podcast-style image or media thumbnail.
    pub thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        for code in [ErrorCode::NoItems, ErrorCode::Stale, ErrorCode::Fatal] {
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
        }
        assert_eq!(ErrorCode::Stale.to_string(), "STALE");
    }

    #[test]
    fn test_error_code_unknown() {
        assert!("TIMEOUT".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn test_media_content_shapes() {
        assert_eq!(MediaContent::from_urls(Vec::new()), MediaContent::Absent);
        assert_eq!(
            MediaContent::from_urls(vec!["http://a/1.jpg".to_string()]),
            MediaContent::Single("http://a/1.jpg".to_string())
        );

        let list = MediaContent::from_urls(vec![
            " ".to_string(),
            "http://a/1.jpg".to_string(),
            "http://a/2.jpg".to_string(),
        ]);
        assert!(matches!(list, MediaContent::List(ref urls) if urls.len() == 2));
        assert_eq!(list.first(), Some("http://a/1.jpg"));
        assert_eq!(MediaContent::Absent.first(), None);
    }

    #[test]
    fn test_media_content_without() {
        let list = MediaContent::from_urls(vec![
            "http://a/1.jpg".to_string(),
            "http://a/2.jpg".to_string(),
        ]);
        assert_eq!(
            list.without("http://a/2.jpg"),
            MediaContent::Single("http://a/1.jpg".to_string())
        );
        assert_eq!(
            MediaContent::Single("http://a/1.jpg".to_string()).without("http://a/1.jpg"),
            MediaContent::Absent
        );
        assert_eq!(
            MediaContent::Single("http://a/1.jpg".to_string()).without("http://a/9.jpg"),
            MediaContent::Single("http://a/1.jpg".to_string())
        );
    }

    #[test]
    fn test_new_item_builder() {
        let now = Utc::now();
        let item = NewItem::new(1, "Title", "http://x/1", now)
            .with_summary("Summary")
            .with_image_url("http://x/1.png");

        assert_eq!(item.feed_id, 1);
        assert_eq!(item.summary.as_deref(), Some("Summary"));
        assert_eq!(item.image_url.as_deref(), Some("http://x/1.png"));
    }

    #[test]
    fn test_failure_log_entry_for_feed() {
        let feed = Feed {
            id: 7,
            url: "http://example.com/rss".to_string(),
            name: "Example".to_string(),
            icon_url: None,
            is_active: true,
            last_fetched_at: None,
            error_count: 0,
            last_error: None,
            created_at: Utc::now(),
        };
        let entry = NewFailureLogEntry::for_feed(&feed, ErrorCode::Fatal, "HTTP status 404");

        assert_eq!(entry.feed_id, 7);
        assert_eq!(entry.feed_name, "Example");
        assert_eq!(entry.feed_url, "http://example.com/rss");
        assert_eq!(entry.error_code, ErrorCode::Fatal);
    }
}
