// src/error.rs
//! Failure taxonomy for the curation pipeline.
//!
//! Candidate-local failures (extraction, quality, similarity) reject one
//! candidate and advance the cursor; run-fatal failures (empty pool, ranking,
//! composition, publishing) surface to the caller. `is_rejection` encodes the
//! split so the orchestrator never has to pattern-match ad hoc.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurateError {
    /// The candidate pool came back with zero candidates. Run-fatal.
    #[error("candidate pool is empty")]
    EmptyPool,

    /// The AI ranking call failed or returned an unusable ordering. Run-fatal:
    /// falling back to an unranked order would silently degrade selection.
    #[error("article selection failed: {0}")]
    ArticleSelection(String),

    /// Network-level extraction failure, including per-stage timeouts.
    #[error("article fetch failed for {url}: {reason}")]
    ArticleFetch { url: String, reason: String },

    /// The page was fetched but its content could not be parsed.
    #[error("article parse failed for {url}: {reason}")]
    ArticleParse { url: String, reason: String },

    /// Both extraction stages ran and the text is still below the minimum.
    #[error("insufficient content for {url}: {words} words (minimum {minimum})")]
    InsufficientContent {
        url: String,
        words: usize,
        minimum: usize,
    },

    /// The URL's base domain is on the static paywall blocklist. Rejected
    /// before any network cost.
    #[error("paywalled domain: {domain}")]
    Paywall { domain: String },

    /// Soft similarity failure: either a confirmed duplicate or a semantic
    /// check that errored. Fail safe toward not double-posting.
    #[error("duplicate content check: {0}")]
    DuplicateContent(String),

    /// The composer's AI call failed or returned empty content.
    #[error("post generation failed: {0}")]
    TweetGeneration(String),

    /// A platform publish call failed. Run-fatal; the core never retries.
    #[error("publishing to {platform} failed: {kind}")]
    Publishing {
        platform: String,
        kind: PublishErrorKind,
    },

    /// Candidate source failure (feed unreachable, malformed export).
    #[error("candidate source error: {0}")]
    CandidateSource(String),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Post store I/O failure.
    #[error("post store error: {0}")]
    Store(#[from] std::io::Error),
}

/// Sub-kinds for [`CurateError::Publishing`], so callers can distinguish
/// auth problems from rate limits without string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishErrorKind {
    Auth(String),
    RateLimited(String),
    Api { status: u16, message: String },
    Transport(String),
}

impl std::fmt::Display for PublishErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishErrorKind::Auth(msg) => write!(f, "authentication: {msg}"),
            PublishErrorKind::RateLimited(msg) => write!(f, "rate limited: {msg}"),
            PublishErrorKind::Api { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            PublishErrorKind::Transport(msg) => write!(f, "transport: {msg}"),
        }
    }
}

impl CurateError {
    /// True for failures that reject the current candidate and let the
    /// pipeline advance; false for failures that end the run.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CurateError::ArticleFetch { .. }
                | CurateError::ArticleParse { .. }
                | CurateError::InsufficientContent { .. }
                | CurateError::Paywall { .. }
                | CurateError::DuplicateContent(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CurateError>;
