//! Feed health state machine.
//!
//! A feed is either active or disabled. Disabling is terminal: nothing in
//! the engine reactivates a feed. Every evaluated fetch touches the feed's
//! `last_fetched_at`, which is what rotates it to the back of the queue.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::classifier::{classify, Disposition};
use super::fetcher::FetchError;
use super::normalizer::{normalize, resolve_published};
use super::pruner::RetentionPolicy;
use super::store::IngestStore;
use super::types::{ErrorCode, Feed, NewFailureLogEntry, NewItem, RawEntry};

/// Transition decided for one feed after its fetch attempt.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Stay active and store the recent items.
    Refresh {
        /// Normalized items inside the retention window.
        items: Vec<NewItem>,
        /// Entries returned by the source.
        total: usize,
    },
    /// Stay active; the failure may be temporary.
    Retry { error: FetchError },
    /// Disable the feed and log why.
    Disable { code: ErrorCode, message: String },
}

/// What happened to a feed once its transition was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Refreshed { inserted: u64 },
    Retried,
    Disabled(ErrorCode),
}

/// Decide the transition for a fetch result.
pub fn evaluate(
    feed_id: i64,
    fetched: Result<Vec<RawEntry>, FetchError>,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Transition {
    let entries = match fetched {
        Ok(entries) => entries,
        Err(error) => {
            return match classify(&error) {
                Disposition::Fatal => Transition::Disable {
                    code: ErrorCode::Fatal,
                    message: error.to_string(),
                },
                Disposition::Transient => Transition::Retry { error },
            };
        }
    };

    if entries.is_empty() {
        return Transition::Disable {
            code: ErrorCode::NoItems,
            message: "Feed disabled: EMPTY (0 items)".to_string(),
        };
    }

    let total = entries.len();
    let recent: Vec<&RawEntry> = entries
        .iter()
        .filter(|entry| policy.is_recent(resolve_published(entry, now), now))
        .collect();

    if recent.is_empty() {
        return Transition::Disable {
            code: ErrorCode::Stale,
            message: format!(
                "Feed disabled: STALE (No items < {} days)",
                policy.days()
            ),
        };
    }

    let items = recent
        .into_iter()
        .filter_map(|entry| normalize(feed_id, entry, now))
        .collect();

    Transition::Refresh { items, total }
}

/// Apply a transition to the stores.
///
/// Store failures are logged and never propagated. A disabled feed always
/// has a failure log row: if the row cannot be written the feed stays
/// active and is retried next cycle.
pub async fn apply(
    store: &dyn IngestStore,
    feed: &Feed,
    transition: Transition,
    now: DateTime<Utc>,
) -> FeedOutcome {
    match transition {
        Transition::Refresh { items, total } => {
            let inserted = match store.insert_items(&items).await {
                Ok(inserted) => inserted,
                Err(e) => {
                    error!(feed_id = feed.id, error = %e, "Failed to store items");
                    0
                }
            };
            let with_images = items.iter().filter(|i| i.image_url.is_some()).count();
            info!(
                feed_id = feed.id,
                name = %feed.name,
                total,
                recent = items.len(),
                inserted,
                with_images,
                "Feed refreshed"
            );

            if let Err(e) = store.mark_fetched(feed.id, now).await {
                error!(feed_id = feed.id, error = %e, "Failed to touch feed");
            }
            FeedOutcome::Refreshed { inserted }
        }
        Transition::Retry { error } => {
            let message = error.to_string();
            warn!(feed_id = feed.id, name = %feed.name, error = %message, "Fetch failed, will retry");

            if let Err(e) = store.mark_transient_failure(feed.id, now, &message).await {
                error!(feed_id = feed.id, error = %e, "Failed to touch feed");
            }
            FeedOutcome::Retried
        }
        Transition::Disable { code, message } => {
            let entry = NewFailureLogEntry::for_feed(feed, code, message.as_str());
            if let Err(e) = store.append(&entry).await {
                error!(
                    feed_id = feed.id,
                    error = %e,
                    "Failed to log feed failure, keeping feed active"
                );
                let reason = format!("{code}: {message}");
                if let Err(e) = store.mark_transient_failure(feed.id, now, &reason).await {
                    error!(feed_id = feed.id, error = %e, "Failed to touch feed");
                }
                return FeedOutcome::Retried;
            }

            warn!(
                feed_id = feed.id,
                name = %feed.name,
                url = %feed.url,
                code = %code,
                reason = %message,
                "Disabling feed"
            );
            if let Err(e) = store.deactivate(feed.id, now).await {
                error!(feed_id = feed.id, error = %e, "Failed to disable feed");
            }
            FeedOutcome::Disabled(code)
        }
    }
}
