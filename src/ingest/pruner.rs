//! Retention pruner.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::store::ItemStore;
use crate::Result;

/// Retention window for items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    days: u32,
}

impl RetentionPolicy {
    /// Create a policy keeping `days` days of items.
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    /// Window length in days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Items published strictly before this instant are expired.
    ///
    /// A window reaching past the earliest representable instant has no
    /// cutoff and keeps everything.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether a publication instant is inside the window.
    pub fn is_recent(&self, published_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        published_at >= self.cutoff(now)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(90)
    }
}

/// Deletes expired items across the whole store.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPruner {
    policy: RetentionPolicy,
}

impl RetentionPruner {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Delete every item published before the cutoff. Returns rows deleted.
    pub async fn prune<S>(&self, store: &S, now: DateTime<Utc>) -> Result<u64>
    where
        S: ItemStore + ?Sized,
    {
        let cutoff = self.policy.cutoff(now);
        let deleted = store.delete_published_before(cutoff).await?;

        if deleted > 0 {
            info!(
                deleted,
                retention_days = self.policy.days(),
                "Removed expired items"
            );
        } else {
            debug!(%cutoff, "No expired items");
        }
        Ok(deleted)
    }
}
