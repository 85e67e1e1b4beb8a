// src/similarity.rs
//! Two-tier duplicate detection against the recent-post window.
//!
//! Tier 1 is local arithmetic (near-identical title similarity, then
//! significant-keyword overlap) and may scan the whole window. Tier 2 asks
//! the AI judge whether borderline pairs describe the same event, bounded
//! to the most recent entries and short-circuiting at the first match. A
//! judge failure is a soft `DuplicateContentError`: the candidate is
//! rejected rather than risked as a double post.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use strsim::normalized_levenshtein;

use crate::ai::AiJudge;
use crate::config::SimilarityConfig;
use crate::error::{CurateError, Result};
use crate::history::{RecentPost, RecentPostHistory};

/// Words that carry no event identity and would inflate overlap ratios.
static STOP_WORDS: &[&str] = &[
    "about", "after", "again", "amid", "among", "been", "before", "being", "between", "could",
    "down", "during", "every", "from", "have", "here", "his", "her", "into", "just", "more",
    "most", "over", "said", "says", "some", "than", "that", "their", "them", "then", "there",
    "these", "they", "this", "those", "under", "until", "were", "what", "when", "where", "which",
    "while", "will", "with", "would", "your",
];

pub struct SimilarityChecker {
    cfg: SimilarityConfig,
    judge: Arc<dyn AiJudge>,
}

impl SimilarityChecker {
    pub fn new(cfg: SimilarityConfig, judge: Arc<dyn AiJudge>) -> Self {
        Self { cfg, judge }
    }

    /// Is the candidate too similar to anything in the window?
    ///
    /// `Ok(true)` — confirmed duplicate. `Ok(false)` — unique.
    /// `Err(DuplicateContent)` — the semantic judge failed; treat as
    /// rejected, never as unique.
    pub async fn is_duplicate(
        &self,
        candidate_title: &str,
        candidate_text: &str,
        history: &RecentPostHistory,
    ) -> Result<bool> {
        if history.is_empty() {
            return Ok(false);
        }

        let candidate_keywords =
            significant_keywords(candidate_title, self.cfg.keyword_min_len);
        let mut borderline: Vec<&RecentPost> = Vec::new();

        // Tier 1: local checks over the full window.
        for post in history.posts() {
            let Some(post_title) = post.title.as_deref() else {
                continue;
            };

            let sim = normalized_levenshtein(
                &candidate_title.to_lowercase(),
                &post_title.to_lowercase(),
            );
            if sim >= self.cfg.title_similarity_threshold {
                tracing::info!(
                    similarity = sim,
                    matched = %truncate_chars(post_title, 60),
                    "near-identical title, duplicate"
                );
                return Ok(true);
            }

            let post_keywords = significant_keywords(post_title, self.cfg.keyword_min_len);
            if candidate_keywords.is_empty() || post_keywords.is_empty() {
                continue;
            }
            let overlap = candidate_keywords.intersection(&post_keywords).count();
            if overlap == 0 {
                continue;
            }
            let ratio = overlap as f32 / candidate_keywords.len().min(post_keywords.len()) as f32;
            if ratio >= self.cfg.overlap_threshold {
                tracing::info!(
                    ratio,
                    matched = %truncate_chars(post_title, 60),
                    "keyword overlap at threshold, duplicate"
                );
                return Ok(true);
            }
            // Non-zero but below threshold: inconclusive, queue for Tier 2.
            borderline.push(post);
        }

        if borderline.is_empty() {
            return Ok(false);
        }

        // Tier 2: semantic judgment on the most recent borderline entries,
        // first match wins.
        let candidate_excerpt = truncate_chars(candidate_text, self.cfg.comparison_chars);
        for post in borderline.into_iter().take(self.cfg.semantic_window) {
            let post_excerpt = if post.text.is_empty() {
                truncate_chars(post.title.as_deref().unwrap_or_default(), self.cfg.comparison_chars)
            } else {
                truncate_chars(&post.text, self.cfg.comparison_chars)
            };

            let same = self
                .judge
                .semantically_equal(&candidate_excerpt, &post_excerpt)
                .await
                .map_err(|e| {
                    CurateError::DuplicateContent(format!("semantic check failed: {e}"))
                })?;

            if same {
                tracing::info!(
                    matched = %truncate_chars(post.title.as_deref().unwrap_or(""), 60),
                    "semantic judge confirmed duplicate"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Short stable id for logging article content without logging the text.
pub fn content_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Lowercased, punctuation-stripped words of at least `min_len` chars,
/// minus stop-words.
pub fn significant_keywords(text: &str, min_len: usize) -> HashSet<String> {
    static RE_WORD: OnceCell<Regex> = OnceCell::new();
    let re = RE_WORD.get_or_init(|| Regex::new(r"(?u)\b\w+\b").expect("keyword regex"));
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() >= min_len)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_filter_short_and_stop_words() {
        let kw = significant_keywords("The Fed said it will hold interest rates steady", 4);
        assert!(kw.contains("interest"));
        assert!(kw.contains("rates"));
        assert!(kw.contains("steady"));
        assert!(kw.contains("hold"));
        // "said" and "will" are stop-words; "The"/"it" too short
        assert!(!kw.contains("said"));
        assert!(!kw.contains("will"));
        assert!(!kw.contains("the"));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let a = significant_keywords("STORM Hits Coast", 4);
        let b = significant_keywords("storm hits coast", 4);
        assert_eq!(a, b);
    }
}
