// src/pipeline.rs
//! The selection pipeline: walk the ranked shortlist, best first, until one
//! candidate survives every gate.
//!
//! Per candidate the gate order is: URL-history guard → extraction →
//! quality → similarity. Any candidate-local failure logs an explicit
//! rejection and advances the cursor; a rejected candidate is never
//! reconsidered within the run. Ranking failure, an empty pool,
//! composition failure, and publish failure are run-fatal. Everything runs
//! strictly sequentially — extraction and AI checks cost real money, and an
//! early acceptance makes all later work moot.

use std::sync::Arc;

use chrono::Utc;

use crate::compose::{GeneratedPost, PostComposer};
use crate::error::{CurateError, Result};
use crate::extract::{ArticleExtractor, ExtractedArticle};
use crate::history::{PostRecord, PostStore, RecentPostHistory};
use crate::pool::{Candidate, CandidateSource, PoolAllocation};
use crate::publish::{PublishedPost, Publisher};
use crate::rank::Ranker;
use crate::similarity::SimilarityChecker;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub allocation: PoolAllocation,
    pub shortlist_size: usize,
    pub history_window: usize,
    /// Quality gate: accepted articles must carry at least this many words.
    pub min_word_count: usize,
    /// Run every gate but skip publishing and persistence.
    pub test_mode: bool,
}

/// The one candidate that survived all gates, with its extracted article.
#[derive(Debug, Clone)]
pub struct AcceptedSelection {
    pub candidate: Candidate,
    pub article: ExtractedArticle,
}

/// Every run ends in exactly one of these (or a fatal `CurateError`).
#[derive(Debug)]
pub enum RunOutcome {
    /// Published and persisted.
    Posted {
        record: PostRecord,
        published: Vec<PublishedPost>,
    },
    /// Test mode: composed but deliberately not published.
    DryRun {
        selection: AcceptedSelection,
        post: GeneratedPost,
    },
    /// Every shortlisted candidate was rejected. A normal outcome.
    NoEligibleCandidate { considered: usize },
}

pub struct CurationPipeline {
    pub cfg: PipelineConfig,
    pub source: Arc<dyn CandidateSource>,
    pub ranker: Ranker,
    pub extractor: ArticleExtractor,
    pub similarity: SimilarityChecker,
    pub composer: PostComposer,
    pub publishers: Vec<Arc<dyn Publisher>>,
    pub store: PostStore,
}

impl CurationPipeline {
    /// Execute one full run.
    pub async fn run(&self) -> Result<RunOutcome> {
        if self.publishers.is_empty() && !self.cfg.test_mode {
            return Err(CurateError::Config("no publishers configured".into()));
        }

        let pool = self.source.fetch_weighted_pool(&self.cfg.allocation).await?;
        if pool.is_empty() {
            return Err(CurateError::EmptyPool);
        }
        tracing::info!(pool_size = pool.len(), "fetched candidate pool");

        let history = self.fetch_history().await;
        tracing::info!(window = history.len(), "fetched recent-post history");

        let shortlist = self.ranker.rank(&pool, self.cfg.shortlist_size).await?;
        tracing::info!(shortlist = shortlist.len(), "ranked shortlist");

        let mut considered = 0usize;
        let mut accepted: Option<AcceptedSelection> = None;

        for (position, candidate) in shortlist.entries().iter().enumerate() {
            considered += 1;
            tracing::info!(
                rank = position,
                title = %candidate.title,
                url = %candidate.url,
                "considering candidate"
            );
            match self.vet_candidate(candidate, &history).await {
                Ok(article) => {
                    tracing::info!(
                        rank = position,
                        title = %candidate.title,
                        words = article.word_count,
                        content = %crate::similarity::content_id(&article.text),
                        "candidate accepted"
                    );
                    accepted = Some(AcceptedSelection {
                        candidate: candidate.clone(),
                        article,
                    });
                    break;
                }
                Err(reason) if reason.is_rejection() => {
                    tracing::warn!(
                        rank = position,
                        title = %candidate.title,
                        %reason,
                        "candidate rejected, advancing"
                    );
                }
                Err(fatal) => return Err(fatal),
            }
        }

        let Some(selection) = accepted else {
            tracing::info!(considered, "shortlist exhausted, nothing to post");
            return Ok(RunOutcome::NoEligibleCandidate { considered });
        };

        // Composition happens only after acceptance; a failure here is fatal
        // to the run's posting step, not a reason to try more candidates.
        let char_limit = self
            .publishers
            .iter()
            .map(|p| p.char_limit())
            .min()
            .unwrap_or(280);
        let post = self
            .composer
            .compose(&selection.candidate, &selection.article, char_limit)
            .await?;
        tracing::info!(chars = post.rendered_chars(), "composed post");

        if self.cfg.test_mode {
            tracing::info!(text = %post.rendered(), "test mode: skipping publish");
            return Ok(RunOutcome::DryRun { selection, post });
        }

        self.publish_and_persist(selection, post).await
    }

    /// Gate sequence for one candidate. A `Err(e)` with `e.is_rejection()`
    /// rejects the candidate; anything else aborts the run.
    async fn vet_candidate(
        &self,
        candidate: &Candidate,
        history: &RecentPostHistory,
    ) -> Result<ExtractedArticle> {
        if self.store.contains_url(&candidate.url)? {
            return Err(CurateError::DuplicateContent(
                "url already posted".into(),
            ));
        }

        let article = self.extractor.extract(&candidate.url).await?;

        // Quality gate, explicit even though extraction enforces the same
        // minimum, so the transition is observable on its own.
        if article.word_count < self.cfg.min_word_count {
            return Err(CurateError::InsufficientContent {
                url: article.resolved_url,
                words: article.word_count,
                minimum: self.cfg.min_word_count,
            });
        }

        // Redirects can land on a URL we already posted under another alias.
        if article.resolved_url != candidate.url
            && self.store.contains_url(&article.resolved_url)?
        {
            return Err(CurateError::DuplicateContent(
                "resolved url already posted".into(),
            ));
        }

        if self
            .similarity
            .is_duplicate(&candidate.title, &article.text, history)
            .await?
        {
            return Err(CurateError::DuplicateContent(
                "too similar to a recent post".into(),
            ));
        }

        Ok(article)
    }

    /// Union of each platform's recent feed. A platform read failure
    /// degrades to an empty contribution rather than sinking the run.
    async fn fetch_history(&self) -> RecentPostHistory {
        let mut posts = Vec::new();
        for publisher in &self.publishers {
            match publisher.fetch_recent(self.cfg.history_window).await {
                Ok(mut recent) => {
                    tracing::info!(
                        platform = publisher.platform(),
                        count = recent.len(),
                        "fetched recent posts"
                    );
                    posts.append(&mut recent);
                }
                Err(e) => {
                    tracing::warn!(
                        platform = publisher.platform(),
                        error = %e,
                        "recent-post fetch failed, continuing without it"
                    );
                }
            }
        }
        RecentPostHistory::from_posts(posts, self.cfg.history_window)
    }

    /// Publish sequentially, fail fast on the first platform error. Partial
    /// successes are persisted before the error surfaces so the next run's
    /// history guard sees them.
    async fn publish_and_persist(
        &self,
        selection: AcceptedSelection,
        post: GeneratedPost,
    ) -> Result<RunOutcome> {
        let mut published: Vec<PublishedPost> = Vec::new();
        let mut failure: Option<CurateError> = None;

        for publisher in &self.publishers {
            match publisher.publish(&post).await {
                Ok(result) => {
                    tracing::info!(
                        platform = publisher.platform(),
                        uri = %result.uri,
                        "published"
                    );
                    published.push(result);
                }
                Err(e) => {
                    tracing::error!(
                        platform = publisher.platform(),
                        error = %e,
                        "publish failed"
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        if published.is_empty() {
            // Nothing went out; surface the failure as-is.
            return Err(failure
                .unwrap_or_else(|| CurateError::Config("no publishers configured".into())));
        }

        let record = PostRecord {
            candidate_url: selection.article.resolved_url.clone(),
            category: selection.candidate.category.clone(),
            post_ids: published
                .iter()
                .map(|p| (p.platform.clone(), p.post_id.clone()))
                .collect(),
            generated_text: post.rendered(),
            posted_at: Utc::now(),
        };
        self.store.append(record.clone())?;

        if let Some(e) = failure {
            tracing::error!(
                persisted = published.len(),
                "partial publish persisted; surfacing the failure"
            );
            return Err(e);
        }

        Ok(RunOutcome::Posted { record, published })
    }
}
