//! Feed fetcher.
//!
//! Retrieves a single feed document over HTTP with a bounded timeout and
//! parses it into [`RawEntry`] values. No retries happen here.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::{Entry, FeedType, Link};
use feed_rs::parser::{self, ParseErrorKind, ParseFeedError};
use reqwest::{header, Client};
use thiserror::Error;
use tracing::debug;

use crate::config::IngestConfig;
use crate::ingest::types::{MediaContent, RawEntry};
use crate::{FeedbarError, Result};

/// Content types declared in the `Accept` header.
const ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml;q=0.9, */*;q=0.8";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Failure to retrieve or parse a feed.
///
/// A closed set of kinds so that classification is an exhaustive match.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request exceeded the fetch timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The document exceeds the configured size limit.
    #[error("feed too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// Any other transport failure (reset, body read, redirect loop).
    #[error("transport error: {0}")]
    Transport(String),

    /// Structurally invalid XML.
    #[error("malformed markup: {0}")]
    Markup(String),

    /// Well-formed document without an RSS or Atom root.
    #[error("not an RSS or Atom document: {0}")]
    NotAFeed(String),

    /// Any other parser failure.
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<ParseFeedError> for FetchError {
    fn from(e: ParseFeedError) -> Self {
        let message = e.to_string();
        match e {
            ParseFeedError::XmlReader(_) => FetchError::Markup(message),
            ParseFeedError::ParseError(ParseErrorKind::NoFeedRoot) => FetchError::NotAFeed(message),
            _ => FetchError::Parse(message),
        }
    }
}

/// Retrieves and parses one feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch `url` and return its entries in document order.
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<RawEntry>, FetchError>;
}

/// HTTP feed fetcher backed by reqwest.
pub struct HttpFetcher {
    client: Client,
    max_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the ingestion settings.
    pub fn new(config: &IngestConfig) -> Result<Self> {
        Self::with_timeout(config, config.fetch_timeout())
    }

    /// Create a fetcher with an explicit total timeout.
    pub fn with_timeout(config: &IngestConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedbarError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<RawEntry>, FetchError> {
        debug!(url, "Fetching feed");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.max_size,
                });
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > self.max_size {
            return Err(FetchError::TooLarge {
                size: bytes.len() as u64,
                max: self.max_size,
            });
        }

        parse_feed(&bytes)
    }
}

/// Parse a feed document into raw entries.
///
/// RSS enclosures and `media:content` share one media list in the parsed
/// model, so RSS documents get a second pass that recovers each item's
/// `<enclosure>` separately.
pub fn parse_feed(bytes: &[u8]) -> std::result::Result<Vec<RawEntry>, FetchError> {
    let feed = parser::parse(bytes)?;
    let enclosures = match feed.feed_type {
        FeedType::RSS0 | FeedType::RSS2 => rss_enclosures(bytes),
        _ => None,
    };

    let mut entries: Vec<RawEntry> = feed.entries.into_iter().map(raw_entry).collect();
    match enclosures {
        Some(enclosures) if enclosures.len() == entries.len() => {
            for (entry, enclosure) in entries.iter_mut().zip(enclosures) {
                if let Some(url) = enclosure {
                    entry.media = std::mem::take(&mut entry.media).without(&url);
                    entry.enclosure = Some(url);
                }
            }
        }
        Some(enclosures) => {
            debug!(
                items = enclosures.len(),
                entries = entries.len(),
                "RSS item count mismatch, enclosures left in media"
            );
        }
        None => {}
    }

    Ok(entries)
}

/// Enclosure URL of every RSS item, in document order.
fn rss_enclosures(bytes: &[u8]) -> Option<Vec<Option<String>>> {
    match rss::Channel::read_from(bytes) {
        Ok(channel) => Some(
            channel
                .items()
                .iter()
                .map(|item| item.enclosure().and_then(|e| non_empty(e.url())))
                .collect(),
        ),
        Err(e) => {
            debug!(error = %e, "RSS enclosure pass skipped");
            None
        }
    }
}

fn raw_entry(entry: Entry) -> RawEntry {
    let link = alternate_link(&entry.links);
    let enclosure = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("enclosure"))
        .and_then(|l| non_empty(&l.href));

    let media = MediaContent::from_urls(
        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|c| c.url.as_ref().map(|u| u.to_string())),
    );
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .find_map(|t| non_empty(&t.image.uri));

    RawEntry {
        guid: non_empty(&entry.id),
        title: entry.title.and_then(|t| non_empty(&t.content)),
        link,
        published: entry.published,
        updated: entry.updated,
        content: entry.content.and_then(|c| c.body),
        description: entry.summary.map(|t| t.content),
        enclosure,
        media,
        thumbnail,
    }
}

/// Pick the article link: an alternate link if present, otherwise the
/// first link that is not an enclosure.
fn alternate_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| {
            links
                .iter()
                .find(|l| l.rel.as_deref() != Some("enclosure"))
        })
        .and_then(|l| non_empty(&l.href))
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
