//! Error classifier.
//!
//! Decides whether a fetch failure will ever recover. Only a short list
//! of signatures is treated as permanent; everything else is retried on
//! a later cycle.

use crate::ingest::fetcher::FetchError;

/// How a failed fetch should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Possibly temporary; keep the feed active.
    Transient,
    /// Will not recover; disable the feed.
    Fatal,
}

/// Classify a fetch failure.
pub fn classify(error: &FetchError) -> Disposition {
    match error {
        FetchError::Status(403 | 404 | 410) => Disposition::Fatal,
        FetchError::Markup(_) | FetchError::NotAFeed(_) => Disposition::Fatal,
        FetchError::Status(_)
        | FetchError::Timeout(_)
        | FetchError::Connect(_)
        | FetchError::TooLarge { .. }
        | FetchError::Transport(_)
        | FetchError::Parse(_) => Disposition::Transient,
    }
}
