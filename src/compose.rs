// src/compose.rs
//! Post composition: AI summary + hashtags under a hard character budget.
//!
//! The AI is asked for a summary within a target budget, but the composer
//! enforces the platform limit itself: hashtags get a capped fraction of
//! whatever room the summary and link leave, and an over-long summary is
//! truncated at a word boundary with a continuation marker. The link is
//! never dropped.

use std::sync::Arc;

use crate::ai::AiJudge;
use crate::config::ComposeConfig;
use crate::error::{CurateError, Result};
use crate::extract::ExtractedArticle;
use crate::pool::Candidate;
use crate::similarity::significant_keywords;

/// Characters of article text handed to the summary call.
const SUMMARY_INPUT_CHARS: usize = 4000;

/// Minimum keyword length considered for a topic hashtag.
const HASHTAG_KEYWORD_MIN_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPost {
    /// Summary text, already truncated to fit if needed.
    pub text: String,
    /// Tags without the leading '#'.
    pub hashtags: Vec<String>,
    pub link: String,
    /// Article title, used by publishers for embed cards.
    pub title: String,
}

impl GeneratedPost {
    /// Final post body: summary, hashtags, link.
    pub fn rendered(&self) -> String {
        let mut out = self.text.clone();
        for tag in &self.hashtags {
            out.push_str(" #");
            out.push_str(tag);
        }
        out.push(' ');
        out.push_str(&self.link);
        out
    }

    pub fn rendered_chars(&self) -> usize {
        self.rendered().chars().count()
    }
}

pub struct PostComposer {
    cfg: ComposeConfig,
    judge: Arc<dyn AiJudge>,
}

impl PostComposer {
    pub fn new(cfg: ComposeConfig, judge: Arc<dyn AiJudge>) -> Self {
        Self { cfg, judge }
    }

    /// Compose a post for an accepted article under `char_limit`.
    pub async fn compose(
        &self,
        candidate: &Candidate,
        article: &ExtractedArticle,
        char_limit: usize,
    ) -> Result<GeneratedPost> {
        let excerpt: String = article.text.chars().take(SUMMARY_INPUT_CHARS).collect();
        let summary = self
            .judge
            .summarize(&excerpt, self.cfg.summary_target_chars)
            .await
            .map_err(|e| CurateError::TweetGeneration(e.to_string()))?;
        if summary.trim().is_empty() {
            return Err(CurateError::TweetGeneration(
                "judge returned an empty summary".into(),
            ));
        }

        let link = article.resolved_url.clone();
        let title = article
            .title
            .clone()
            .unwrap_or_else(|| candidate.title.clone());

        // Room left once the link (plus its separating space) is placed.
        let link_cost = link.chars().count() + 1;
        let avail = char_limit.saturating_sub(link_cost);

        let summary_chars = summary.chars().count();
        let tag_budget = (avail.saturating_sub(summary_chars) as f32
            * self.cfg.hashtag_budget_fraction) as usize;
        let hashtags = self.pick_hashtags(candidate, tag_budget);
        let tags_cost: usize = hashtags.iter().map(|t| t.chars().count() + 2).sum();

        let text = if summary_chars + tags_cost <= avail {
            summary
        } else {
            let marker_chars = self.cfg.continuation_marker.chars().count();
            let target = avail.saturating_sub(tags_cost + marker_chars);
            let mut truncated = truncate_to_word_boundary(&summary, target);
            truncated.push_str(&self.cfg.continuation_marker);
            truncated
        };

        let post = GeneratedPost {
            text,
            hashtags,
            link,
            title,
        };
        debug_assert!(post.rendered_chars() <= char_limit);
        Ok(post)
    }

    /// Category tag first, then the strongest title keyword, both under the
    /// tag budget and the configured count cap.
    fn pick_hashtags(&self, candidate: &Candidate, tag_budget: usize) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let mut spent = 0usize;

        let try_add = |tag: String, tags: &mut Vec<String>, spent: &mut usize| {
            if tags.len() >= self.cfg.max_hashtags {
                return;
            }
            if tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                return;
            }
            let cost = tag.chars().count() + 2; // " #" prefix
            if *spent + cost > tag_budget {
                return;
            }
            *spent += cost;
            tags.push(tag);
        };

        if !candidate.category.is_empty() {
            try_add(capitalize(&candidate.category), &mut tags, &mut spent);
        }
        if let Some(keyword) = topic_keyword(&candidate.title, &candidate.category) {
            try_add(capitalize(&keyword), &mut tags, &mut spent);
        }
        tags
    }
}

/// Longest significant keyword of the title (ties broken alphabetically),
/// skipping the category word itself.
fn topic_keyword(title: &str, category: &str) -> Option<String> {
    let mut keywords: Vec<String> =
        significant_keywords(title, HASHTAG_KEYWORD_MIN_LEN)
            .into_iter()
            .filter(|w| !w.eq_ignore_ascii_case(category))
            .collect();
    keywords.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    keywords.into_iter().next()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Cut `s` to at most `max_chars`, ending on a word boundary. Trailing
/// whitespace and dangling punctuation are trimmed.
pub fn truncate_to_word_boundary(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    let truncated = match cut.rfind(char::is_whitespace) {
        Some(idx) => &cut[..idx],
        None => cut.as_str(),
    };
    truncated
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_whole_words() {
        let s = "officials ordered evacuations in three coastal counties";
        let out = truncate_to_word_boundary(s, 30);
        assert!(out.chars().count() <= 30);
        assert_eq!(out, "officials ordered evacuations");
        // every output word is a whole input word
        for word in out.split_whitespace() {
            assert!(s.split_whitespace().any(|w| w == word));
        }
    }

    #[test]
    fn truncate_is_identity_when_short_enough() {
        assert_eq!(truncate_to_word_boundary("short text", 50), "short text");
    }

    #[test]
    fn truncate_trims_dangling_punctuation() {
        let out = truncate_to_word_boundary("storm hits coast, thousands flee", 18);
        assert_eq!(out, "storm hits coast");
    }

    #[test]
    fn capitalize_first_letter_only() {
        assert_eq!(capitalize("business"), "Business");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn topic_keyword_skips_the_category() {
        let kw = topic_keyword("Business outlook darkens as tariffs climb", "business");
        assert_eq!(kw.as_deref(), Some("darkens"));
    }

    #[test]
    fn rendered_layout_is_text_tags_link() {
        let post = GeneratedPost {
            text: "Summary here".into(),
            hashtags: vec!["World".into(), "Storm".into()],
            link: "https://example.com/a".into(),
            title: "t".into(),
        };
        assert_eq!(
            post.rendered(),
            "Summary here #World #Storm https://example.com/a"
        );
    }
}
