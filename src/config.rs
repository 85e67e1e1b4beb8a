// src/config.rs
//! Configuration: credentials from the environment, tuning from TOML.
//!
//! Credentials and endpoints come from `.env`/process env (`Settings`);
//! curation tuning (allocations, thresholds, paywall lists, budgets) comes
//! from `config/curation.toml` (`CurationConfig`), overridable via
//! `CURATION_CONFIG_PATH`. Every knob has a compiled-in default so the
//! pipeline runs from a bare checkout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CurateError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/curation.toml";
pub const ENV_CONFIG_PATH: &str = "CURATION_CONFIG_PATH";

// --- credentials & endpoints (env) ---

#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenAI-compatible chat completions endpoint + key + model.
    pub ai_api_key: String,
    pub ai_api_base: String,
    pub ai_model: String,

    /// Browserless-style rendering service; empty disables the slow path.
    pub renderer_base_url: Option<String>,
    pub renderer_token: Option<String>,

    /// BlueSky app password auth.
    pub bluesky_identifier: Option<String>,
    pub bluesky_password: Option<String>,
    pub bluesky_pds_base: String,

    /// Twitter/X OAuth2 user-context bearer token.
    pub twitter_bearer_token: Option<String>,

    /// Upstream feed export: file path or http(s) URL.
    pub feed_source: Option<String>,
}

impl Settings {
    /// Read everything from the process environment. Call after
    /// `dotenvy::dotenv()`.
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            ai_api_key: var("AI_API_KEY").unwrap_or_default(),
            ai_api_base: var("AI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            ai_model: var("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            renderer_base_url: var("RENDERER_BASE_URL"),
            renderer_token: var("RENDERER_TOKEN"),
            bluesky_identifier: var("BLUESKY_IDENTIFIER"),
            bluesky_password: var("BLUESKY_APP_PASSWORD"),
            bluesky_pds_base: var("BLUESKY_PDS_BASE")
                .unwrap_or_else(|| "https://bsky.social".to_string()),
            twitter_bearer_token: var("TWITTER_BEARER_TOKEN"),
            feed_source: var("NEWS_FEED_SOURCE"),
        }
    }

    pub fn has_bluesky(&self) -> bool {
        self.bluesky_identifier.is_some() && self.bluesky_password.is_some()
    }

    pub fn has_twitter(&self) -> bool {
        self.twitter_bearer_token.is_some()
    }

    /// The AI key is always required; at least one platform must be
    /// configured or there is nowhere to post.
    pub fn validate(&self) -> Result<()> {
        if self.ai_api_key.is_empty() {
            return Err(CurateError::Config("missing AI_API_KEY".into()));
        }
        if !self.has_bluesky() && !self.has_twitter() {
            return Err(CurateError::Config(
                "no platform credentials: set BLUESKY_IDENTIFIER/BLUESKY_APP_PASSWORD \
                 or TWITTER_BEARER_TOKEN"
                    .into(),
            ));
        }
        Ok(())
    }
}

// --- curation tuning (TOML) ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    pub pool: PoolConfig,
    pub extract: ExtractConfig,
    pub similarity: SimilarityConfig,
    pub compose: ComposeConfig,
    pub history: HistoryConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Per-category quotas; pool size is their sum.
    pub allocations: BTreeMap<String, usize>,
    pub shortlist_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub min_word_count: usize,
    pub fetch_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub user_agent: String,
    /// Base domains rejected before any network call.
    pub paywall_domains: Vec<String>,
    /// Markers that, combined with short text, trigger the slow path.
    pub paywall_markers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Keywords shorter than this are ignored by the lexical tier.
    pub keyword_min_len: usize,
    /// Overlap ratio at or above this flags a duplicate with no AI call.
    pub overlap_threshold: f32,
    /// Near-identical title similarity (strsim) that fast-accepts a duplicate.
    pub title_similarity_threshold: f64,
    /// Most-recent entries consulted by the semantic tier.
    pub semantic_window: usize,
    /// Characters of each side handed to the semantic judge.
    pub comparison_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Character budget requested from the AI summary call.
    pub summary_target_chars: usize,
    pub max_hashtags: usize,
    /// Hashtags never consume more than this fraction of the budget left
    /// after summary and link placement.
    pub hashtag_budget_fraction: f32,
    pub continuation_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Recent posts fetched per platform for the similarity window.
    pub window_size: usize,
    /// Post store cap; oldest records beyond this are dropped.
    pub max_records: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Hard cap on judge calls per day; exhaustion fails the calling gate.
    pub daily_limit: u32,
    pub budget_dir: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let mut allocations = BTreeMap::new();
        allocations.insert("world".to_string(), 8);
        allocations.insert("national".to_string(), 8);
        allocations.insert("business".to_string(), 4);
        Self {
            allocations,
            shortlist_size: 5,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_word_count: 50,
            fetch_timeout_secs: 15,
            render_timeout_secs: 45,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            paywall_domains: [
                "wsj.com",
                "nytimes.com",
                "ft.com",
                "economist.com",
                "bloomberg.com",
                "washingtonpost.com",
                "theatlantic.com",
                "newyorker.com",
                "medium.com",
                "wired.com",
                "barrons.com",
                "forbes.com",
                "businessinsider.com",
                "insider.com",
                "scmp.com",
                "themoscowtimes.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            paywall_markers: [
                "subscribe",
                "subscription",
                "sign in",
                "premium content",
                "premium article",
                "paid subscribers only",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            keyword_min_len: 4,
            overlap_threshold: 0.5,
            title_similarity_threshold: 0.9,
            semantic_window: 15,
            comparison_chars: 500,
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            summary_target_chars: 200,
            max_hashtags: 2,
            hashtag_budget_fraction: 0.5,
            continuation_marker: "…".to_string(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            max_records: 100,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            daily_limit: 100,
            budget_dir: PathBuf::from("cache/ai"),
        }
    }
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            extract: ExtractConfig::default(),
            similarity: SimilarityConfig::default(),
            compose: ComposeConfig::default(),
            history: HistoryConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl CurationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CurateError::Config(format!("invalid curation TOML: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CurateError::Config(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolution order: explicit path → `$CURATION_CONFIG_PATH` →
    /// `config/curation.toml` → compiled-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::from_path(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::from_path(Path::new(&p));
        }
        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::from_path(default);
        }
        Ok(Self::default())
    }
}
