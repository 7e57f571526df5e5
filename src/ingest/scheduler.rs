//! Batch scheduler.
//!
//! Each invocation selects the least recently fetched active feeds, runs
//! them concurrently, waits for all of them, then prunes expired items.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::fetcher::FeedFetcher;
use super::health::{self, FeedOutcome};
use super::pruner::{RetentionPolicy, RetentionPruner};
use super::store::IngestStore;
use super::types::Feed;
use crate::config::IngestConfig;
use crate::Result;

/// Summary of one scheduler invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Feeds selected for this batch.
    pub selected: usize,
    /// Feeds refreshed successfully.
    pub refreshed: usize,
    /// Feeds left active after a transient failure.
    pub retried: usize,
    /// Feeds disabled in this batch.
    pub disabled: usize,
    /// New item rows written.
    pub items_inserted: u64,
    /// Expired rows deleted, `None` if pruning did not run or failed.
    pub pruned: Option<u64>,
}

impl BatchReport {
    fn record(&mut self, outcome: FeedOutcome) {
        match outcome {
            FeedOutcome::Refreshed { inserted } => {
                self.refreshed += 1;
                self.items_inserted += inserted;
            }
            FeedOutcome::Retried => self.retried += 1,
            FeedOutcome::Disabled(_) => self.disabled += 1,
        }
    }
}

/// Drives ingestion batches.
pub struct BatchScheduler {
    store: Arc<dyn IngestStore>,
    fetcher: Arc<dyn FeedFetcher>,
    batch_size: usize,
    policy: RetentionPolicy,
}

impl BatchScheduler {
    /// Create a scheduler over the given store and fetcher.
    pub fn new(
        store: Arc<dyn IngestStore>,
        fetcher: Arc<dyn FeedFetcher>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            batch_size: config.batch_size,
            policy: RetentionPolicy::new(config.retention_days),
        }
    }

    /// Run one batch against the wall clock.
    pub async fn run_batch(&self) -> Result<BatchReport> {
        self.run_batch_at(Utc::now()).await
    }

    /// Run one batch, evaluating every feed against `now`.
    ///
    /// Only a failure to read the candidate feeds is returned as an error.
    pub async fn run_batch_at(&self, now: DateTime<Utc>) -> Result<BatchReport> {
        let feeds = self.store.list_due(self.batch_size).await?;
        let mut report = BatchReport {
            selected: feeds.len(),
            ..BatchReport::default()
        };

        if feeds.is_empty() {
            debug!("No feeds due for refresh");
            return Ok(report);
        }

        info!(feeds = feeds.len(), "Processing batch");

        let mut tasks = JoinSet::new();
        for feed in feeds {
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let policy = self.policy;
            tasks.spawn(async move { process_feed(store, fetcher, feed, policy, now).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => error!(error = %e, "Feed task aborted"),
            }
        }

        let pruner = RetentionPruner::new(self.policy);
        report.pruned = match pruner.prune(self.store.as_ref(), now).await {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                error!(error = %e, "Failed to prune expired items");
                None
            }
        };

        info!(
            selected = report.selected,
            refreshed = report.refreshed,
            retried = report.retried,
            disabled = report.disabled,
            items_inserted = report.items_inserted,
            "Batch complete"
        );
        Ok(report)
    }

    /// Run batches forever at a fixed interval.
    ///
    /// The first batch runs immediately.
    pub async fn run(&self, every: Duration) {
        info!(
            "Ingestion scheduler started (interval: {} seconds, batch size: {})",
            every.as_secs(),
            self.batch_size
        );

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            if let Err(e) = self.run_batch().await {
                error!(error = %e, "Failed to select feeds for refresh");
            }
        }
    }
}

async fn process_feed(
    store: Arc<dyn IngestStore>,
    fetcher: Arc<dyn FeedFetcher>,
    feed: Feed,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> FeedOutcome {
    debug!(feed_id = feed.id, url = %feed.url, "Refreshing feed");
    let fetched = fetcher.fetch(&feed.url).await;
    let transition = health::evaluate(feed.id, fetched, &policy, now);
    health::apply(store.as_ref(), &feed, transition, now).await
}
