//! Feed ingestion engine.
//!
//! Selects due feeds, fetches and normalizes their entries, classifies
//! failures, maintains each feed's health and prunes expired items.

pub mod classifier;
pub mod fetcher;
pub mod health;
pub mod normalizer;
pub mod pruner;
pub mod repository;
pub mod scheduler;
pub mod store;
pub mod types;

pub use classifier::{classify, Disposition};
pub use fetcher::{parse_feed, FeedFetcher, FetchError, HttpFetcher};
pub use health::{FeedOutcome, Transition};
pub use normalizer::normalize;
pub use pruner::{RetentionPolicy, RetentionPruner};
pub use repository::{FailureLogRepository, FeedRepository, ItemRepository};
pub use scheduler::{BatchReport, BatchScheduler};
pub use store::{FailureLog, FeedStore, IngestStore, ItemStore};
pub use types::{
    ErrorCode, FailureLogEntry, Feed, Item, ItemWithFeed, MediaContent, NewFailureLogEntry,
    NewFeed, NewItem, RawEntry, MAX_SUMMARY_LENGTH, UNTITLED,
};
