// src/pool.rs
//! Candidate pool: the raw material of a run.
//!
//! A `WeightedPool` is assembled from per-category quotas so breaking-news
//! categories cannot crowd out the rest. Candidates are immutable once
//! fetched; everything downstream reads them by reference.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;

use crate::config::PoolConfig;
use crate::error::{CurateError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub title: String,
    pub category: String,
    /// How many independent feeds reported the same story.
    pub source_count: u32,
}

/// Per-category quotas. Pool size is the sum of all quotas.
#[derive(Debug, Clone, Default)]
pub struct PoolAllocation {
    quotas: BTreeMap<String, usize>,
}

impl PoolAllocation {
    pub fn new(quotas: BTreeMap<String, usize>) -> Self {
        Self { quotas }
    }

    pub fn from_config(cfg: &PoolConfig) -> Self {
        Self {
            quotas: cfg.allocations.clone(),
        }
    }

    pub fn quota(&self, category: &str) -> usize {
        self.quotas.get(category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.quotas.values().sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.quotas.keys().map(String::as_str)
    }
}

/// Ordered multiset of candidates satisfying a `PoolAllocation`.
#[derive(Debug, Clone, Default)]
pub struct WeightedPool {
    candidates: Vec<Candidate>,
}

impl WeightedPool {
    /// Assemble a pool from raw candidates. Per category: keep stories
    /// reported by more feeds first (breaking-news weighting), cut to the
    /// quota. Candidates outside the configured categories are dropped.
    /// A category with fewer candidates than its quota contributes what it
    /// has; the quota is an upper bound.
    pub fn assemble(allocation: &PoolAllocation, raw: Vec<Candidate>) -> Self {
        let mut by_category: BTreeMap<&str, Vec<Candidate>> = BTreeMap::new();
        for candidate in raw {
            let Some(key) = allocation
                .categories()
                .find(|c| *c == candidate.category.as_str())
            else {
                tracing::debug!(
                    category = %candidate.category,
                    title = %candidate.title,
                    "dropping candidate outside configured categories"
                );
                continue;
            };
            by_category.entry(key).or_default().push(candidate);
        }

        let mut candidates = Vec::with_capacity(allocation.total());
        for (category, mut group) in by_category {
            // stable: ties keep feed order
            group.sort_by(|a, b| b.source_count.cmp(&a.source_count));
            group.truncate(allocation.quota(category));
            candidates.extend(group);
        }
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn count_in_category(&self, category: &str) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.category == category)
            .count()
    }
}

/// Where candidates come from. The pipeline only depends on this contract,
/// never on the feed collector behind it.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_weighted_pool(&self, allocation: &PoolAllocation) -> Result<WeightedPool>;
    fn name(&self) -> &'static str;
}

// --- JSON feed export adapter ---

/// Row shape of the upstream feed collector's JSON export.
#[derive(Debug, Deserialize)]
struct FeedRow {
    url: String,
    title: String,
    category: String,
    #[serde(default)]
    source_count: u32,
}

/// Reads the feed collector's export from a local file or an http(s)
/// endpoint and assembles the weighted pool from it.
pub struct JsonFeedSource {
    location: String,
    http: reqwest::Client,
}

impl JsonFeedSource {
    pub fn new(location: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            location: location.into(),
            http,
        }
    }

    async fn read_rows(&self) -> anyhow::Result<Vec<FeedRow>> {
        let body = if self.location.starts_with("http://") || self.location.starts_with("https://")
        {
            self.http
                .get(&self.location)
                .send()
                .await
                .context("requesting feed export")?
                .error_for_status()
                .context("feed export status")?
                .text()
                .await
                .context("reading feed export body")?
        } else {
            tokio::fs::read_to_string(&self.location)
                .await
                .with_context(|| format!("reading feed export {}", self.location))?
        };
        serde_json::from_str(&body).context("parsing feed export JSON")
    }
}

#[async_trait::async_trait]
impl CandidateSource for JsonFeedSource {
    async fn fetch_weighted_pool(&self, allocation: &PoolAllocation) -> Result<WeightedPool> {
        let rows = self
            .read_rows()
            .await
            .map_err(|e| CurateError::CandidateSource(format!("{e:#}")))?;
        let raw = rows
            .into_iter()
            .map(|r| Candidate {
                url: r.url,
                title: r.title,
                category: r.category,
                source_count: r.source_count,
            })
            .collect();
        let pool = WeightedPool::assemble(allocation, raw);
        tracing::info!(
            source = self.name(),
            pool_size = pool.len(),
            "assembled candidate pool"
        );
        Ok(pool)
    }

    fn name(&self) -> &'static str {
        "json-feed"
    }
}
