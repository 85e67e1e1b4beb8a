// tests/common/mod.rs
//! Shared mock implementations of the pipeline's external-interface traits.
//! Everything is deterministic and counts its calls so tests can assert
//! which tiers and gates actually ran.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use news_curator::ai::{AiJudge, JudgeError};
use news_curator::compose::GeneratedPost;
use news_curator::error::{CurateError, PublishErrorKind, Result};
use news_curator::extract::{FetchedPage, PageFetcher, PageRenderer};
use news_curator::history::RecentPost;
use news_curator::pool::{Candidate, CandidateSource, PoolAllocation, WeightedPool};
use news_curator::publish::{PublishedPost, Publisher};

// ------------------------------------------------------------
// AI judge
// ------------------------------------------------------------

#[derive(Default)]
pub struct MockJudge {
    pub rank_order: Vec<usize>,
    pub rank_fails: bool,
    /// Substrings that make `semantically_equal` answer SAME.
    pub semantic_same_for: Vec<String>,
    pub semantic_fails: bool,
    pub summary: String,
    pub summary_fails: bool,

    pub rank_calls: AtomicUsize,
    pub rank_requested: AtomicUsize,
    pub semantic_calls: AtomicUsize,
    pub summarize_calls: AtomicUsize,
}

impl MockJudge {
    pub fn new() -> Self {
        Self {
            summary: "A mock summary of the article.".to_string(),
            ..Self::default()
        }
    }

    pub fn with_rank_order(mut self, order: Vec<usize>) -> Self {
        self.rank_order = order;
        self
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn failing_semantic(mut self) -> Self {
        self.semantic_fails = true;
        self
    }

    pub fn failing_rank(mut self) -> Self {
        self.rank_fails = true;
        self
    }
}

#[async_trait::async_trait]
impl AiJudge for MockJudge {
    async fn rank(
        &self,
        _candidates: &[Candidate],
        shortlist_size: usize,
    ) -> std::result::Result<Vec<usize>, JudgeError> {
        self.rank_calls.fetch_add(1, Ordering::SeqCst);
        self.rank_requested.store(shortlist_size, Ordering::SeqCst);
        if self.rank_fails {
            return Err(JudgeError::Call("mock rank failure".into()));
        }
        Ok(self.rank_order.clone())
    }

    async fn semantically_equal(
        &self,
        text_a: &str,
        text_b: &str,
    ) -> std::result::Result<bool, JudgeError> {
        self.semantic_calls.fetch_add(1, Ordering::SeqCst);
        if self.semantic_fails {
            return Err(JudgeError::Call("mock semantic failure".into()));
        }
        Ok(self
            .semantic_same_for
            .iter()
            .any(|s| text_a.contains(s.as_str()) || text_b.contains(s.as_str())))
    }

    async fn summarize(
        &self,
        _text: &str,
        _char_budget: usize,
    ) -> std::result::Result<String, JudgeError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        if self.summary_fails {
            return Err(JudgeError::Call("mock summarize failure".into()));
        }
        Ok(self.summary.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Fetcher / renderer
// ------------------------------------------------------------

#[derive(Default)]
pub struct MockFetcher {
    /// url → (final url after redirects, html)
    pages: HashMap<String, (String, String)>,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), (url.to_string(), html.to_string()));
        self
    }

    pub fn with_redirect(mut self, url: &str, final_url: &str, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), (final_url.to_string(), html.to_string()));
        self
    }
}

#[async_trait::async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some((final_url, html)) => Ok(FetchedPage {
                final_url: final_url.clone(),
                html: html.clone(),
            }),
            None => Err(CurateError::ArticleFetch {
                url: url.to_string(),
                reason: "no fixture for url".into(),
            }),
        }
    }
}

#[derive(Default)]
pub struct MockRenderer {
    pages: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait::async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(html) => Ok(html.clone()),
            None => Err(CurateError::ArticleFetch {
                url: url.to_string(),
                reason: "render: no fixture for url".into(),
            }),
        }
    }
}

// ------------------------------------------------------------
// Candidate source / publisher
// ------------------------------------------------------------

pub struct StaticSource {
    pub candidates: Vec<Candidate>,
}

#[async_trait::async_trait]
impl CandidateSource for StaticSource {
    async fn fetch_weighted_pool(&self, allocation: &PoolAllocation) -> Result<WeightedPool> {
        Ok(WeightedPool::assemble(allocation, self.candidates.clone()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct MockPublisher {
    pub name: &'static str,
    pub limit: usize,
    pub recent: Vec<RecentPost>,
    pub fail_publish: bool,
    pub publish_calls: AtomicUsize,
    pub published_texts: Mutex<Vec<String>>,
}

impl MockPublisher {
    pub fn new(name: &'static str, limit: usize) -> Self {
        Self {
            name,
            limit,
            recent: Vec::new(),
            fail_publish: false,
            publish_calls: AtomicUsize::new(0),
            published_texts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_recent_titles(mut self, titles: &[&str]) -> Self {
        self.recent = titles
            .iter()
            .enumerate()
            .map(|(i, t)| RecentPost {
                title: Some(t.to_string()),
                text: t.to_string(),
                url: None,
                posted_at: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            })
            .collect();
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_publish = true;
        self
    }
}

#[async_trait::async_trait]
impl Publisher for MockPublisher {
    fn platform(&self) -> &'static str {
        self.name
    }

    fn char_limit(&self) -> usize {
        self.limit
    }

    async fn publish(&self, post: &GeneratedPost) -> Result<PublishedPost> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish {
            return Err(CurateError::Publishing {
                platform: self.name.to_string(),
                kind: PublishErrorKind::Api {
                    status: 500,
                    message: "mock publish failure".into(),
                },
            });
        }
        self.published_texts
            .lock()
            .unwrap()
            .push(post.rendered());
        Ok(PublishedPost {
            platform: self.name.to_string(),
            post_id: format!("{}-post-1", self.name),
            uri: format!("https://{}.example/post/1", self.name),
            timestamp: Utc::now(),
        })
    }

    async fn fetch_recent(&self, window: usize) -> Result<Vec<RecentPost>> {
        Ok(self.recent.iter().take(window).cloned().collect())
    }
}

// ------------------------------------------------------------
// HTML fixtures
// ------------------------------------------------------------

/// Article page with `words` words of body text.
pub fn article_html(title: &str, words: usize) -> String {
    let body: Vec<String> = (0..words).map(|i| format!("word{i}")).collect();
    format!(
        "<html><head><title>{title}</title>\
         <meta property=\"og:image\" content=\"https://cdn.example.com/img.jpg\"/>\
         </head><body><article><p>{}</p></article></body></html>",
        body.join(" ")
    )
}

/// Short page carrying a paywall marker.
pub fn paywalled_html(title: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body>\
         <article><p>Subscribe to continue reading this premium article today.</p>\
         </article></body></html>"
    )
}
