// src/rank.rs
//! AI-assisted candidate ranking.
//!
//! The judge returns relative order only; this module owns validation. An
//! invalid ordering fails the run — falling back to an unranked order would
//! silently degrade selection quality.

use std::collections::HashSet;
use std::sync::Arc;

use crate::ai::AiJudge;
use crate::error::{CurateError, Result};
use crate::pool::{Candidate, WeightedPool};

/// Best-first shortlist produced by one ranking call.
#[derive(Debug, Clone, Default)]
pub struct RankedShortlist {
    entries: Vec<Candidate>,
}

impl RankedShortlist {
    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Ranker {
    judge: Arc<dyn AiJudge>,
}

impl Ranker {
    pub fn new(judge: Arc<dyn AiJudge>) -> Self {
        Self { judge }
    }

    /// Rank the pool and return at most `shortlist_size` candidates,
    /// best first.
    pub async fn rank(
        &self,
        pool: &WeightedPool,
        shortlist_size: usize,
    ) -> Result<RankedShortlist> {
        if pool.is_empty() {
            return Err(CurateError::EmptyPool);
        }
        let requested = shortlist_size.min(pool.len());

        let indices = self
            .judge
            .rank(pool.candidates(), requested)
            .await
            .map_err(|e| CurateError::ArticleSelection(e.to_string()))?;

        validate_ordering(&indices, pool.len(), requested)?;

        let entries = indices
            .iter()
            .map(|&i| pool.candidates()[i].clone())
            .collect();
        Ok(RankedShortlist { entries })
    }
}

/// An ordering is usable iff every index is in range, none repeats, and it
/// is no longer than requested.
fn validate_ordering(indices: &[usize], pool_len: usize, requested: usize) -> Result<()> {
    if indices.is_empty() {
        return Err(CurateError::ArticleSelection(
            "judge returned an empty ordering".into(),
        ));
    }
    if indices.len() > requested {
        return Err(CurateError::ArticleSelection(format!(
            "judge returned {} indices, requested {requested}",
            indices.len()
        )));
    }
    let mut seen = HashSet::new();
    for &i in indices {
        if i >= pool_len {
            return Err(CurateError::ArticleSelection(format!(
                "index {i} out of range for pool of {pool_len}"
            )));
        }
        if !seen.insert(i) {
            return Err(CurateError::ArticleSelection(format!(
                "duplicate index {i} in ordering"
            )));
        }
    }
    Ok(())
}
