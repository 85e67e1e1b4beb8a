// src/publish/mod.rs
//! Platform publishing behind one narrow capability trait.
//!
//! The orchestrator is polymorphic over `Publisher` — publish a composed
//! post, read back the recent feed for the similarity window — and knows
//! nothing about session handling or wire formats.

pub mod bluesky;
pub mod twitter;

use chrono::{DateTime, Utc};

use crate::compose::GeneratedPost;
use crate::error::{PublishErrorKind, Result};
use crate::history::RecentPost;

/// Metadata returned by a successful publish; persisted so the post can be
/// reconstructed as an embed later.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPost {
    pub platform: String,
    pub post_id: String,
    pub uri: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> &'static str;

    /// Hard character budget of this platform.
    fn char_limit(&self) -> usize;

    /// Publish the post. The core never retries; failures are run-fatal.
    async fn publish(&self, post: &GeneratedPost) -> Result<PublishedPost>;

    /// Most recent posts on this platform's own feed, newest first.
    async fn fetch_recent(&self, window: usize) -> Result<Vec<RecentPost>>;
}

/// Shared HTTP status → publish error mapping.
pub(crate) fn status_to_kind(status: reqwest::StatusCode, message: String) -> PublishErrorKind {
    match status.as_u16() {
        401 | 403 => PublishErrorKind::Auth(message),
        429 => PublishErrorKind::RateLimited(message),
        code => PublishErrorKind::Api {
            status: code,
            message,
        },
    }
}

/// Parse an RFC 3339 timestamp, falling back to "now" on malformed input so
/// one odd feed entry cannot sink the history fetch.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
