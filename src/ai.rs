// src/ai.rs
//! AI judge: provider abstraction + daily call budget.
//!
//! The pipeline consumes three judgment calls (rank, semantic equality,
//! summarize) through one trait and never sees provider identity or prompt
//! wording. The concrete provider speaks an OpenAI-compatible chat
//! completions API over reqwest. Every real call is counted against a
//! file-backed daily budget; exhaustion fails the calling gate instead of
//! silently skipping it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pool::Candidate;

/// Generic judge failure, mapped to a gate-specific `CurateError` by callers.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge call failed: {0}")]
    Call(String),
    #[error("judge reply unparsable: {0}")]
    Parse(String),
    #[error("daily AI call budget exhausted")]
    BudgetExhausted,
}

/// The three judgment calls the pipeline depends on.
#[async_trait::async_trait]
pub trait AiJudge: Send + Sync {
    /// Order the `shortlist_size` most newsworthy candidates, best first,
    /// as indices into `candidates`. Relative order only; no scores.
    async fn rank(
        &self,
        candidates: &[Candidate],
        shortlist_size: usize,
    ) -> std::result::Result<Vec<usize>, JudgeError>;

    /// Do the two texts describe the same underlying news event?
    async fn semantically_equal(
        &self,
        text_a: &str,
        text_b: &str,
    ) -> std::result::Result<bool, JudgeError>;

    /// Summarize `text` within roughly `char_budget` characters.
    async fn summarize(
        &self,
        text: &str,
        char_budget: usize,
    ) -> std::result::Result<String, JudgeError>;

    fn provider_name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Daily call budget (file-backed)
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }

    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Counts real API calls per UTC day. State survives process restarts via a
/// small JSON file written with tmp+rename.
pub struct CallBudget {
    dir: PathBuf,
    limit: u32,
    counter: Mutex<DailyCounter>,
}

impl CallBudget {
    pub fn new(dir: impl Into<PathBuf>, limit: u32) -> Self {
        let dir = dir.into();
        let _ = fs::create_dir_all(&dir);
        let counter = Mutex::new(load_counter(&dir).unwrap_or_default());
        Self { dir, limit, counter }
    }

    /// Consume one call if the budget allows. Returns false when exhausted.
    pub fn try_consume(&self) -> bool {
        let mut g = self.counter.lock().expect("budget mutex poisoned");
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.limit {
            return false;
        }
        g.count += 1;
        let _ = save_counter(&self.dir, &g);
        true
    }

    pub fn remaining(&self) -> u32 {
        let mut g = self.counter.lock().expect("budget mutex poisoned");
        if g.is_expired() {
            g.reset_to_today();
        }
        self.limit.saturating_sub(g.count)
    }
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}

// ------------------------------------------------------------
// OpenAI-compatible provider
// ------------------------------------------------------------

pub struct OpenAiJudge {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    budget: CallBudget,
}

impl OpenAiJudge {
    pub fn new(api_base: &str, api_key: &str, model: &str, budget: CallBudget) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-curator/0.1 (+github.com/ericness/news-curator)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            budget,
        }
    }

    async fn chat(&self, system: &str, user: &str) -> std::result::Result<String, JudgeError> {
        if !self.budget.try_consume() {
            return Err(JudgeError::BudgetExhausted);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            max_tokens: 400,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| JudgeError::Call(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(JudgeError::Call(format!("HTTP {}", resp.status())));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| JudgeError::Parse(e.to_string()))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(JudgeError::Parse("empty completion".into()));
        }
        Ok(content)
    }
}

#[async_trait::async_trait]
impl AiJudge for OpenAiJudge {
    async fn rank(
        &self,
        candidates: &[Candidate],
        shortlist_size: usize,
    ) -> std::result::Result<Vec<usize>, JudgeError> {
        let listing = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{i}. [{}] (reported by {} feeds) {}",
                    c.category, c.source_count, c.title
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let system = "You rank news headlines by newsworthiness: significant public \
                      impact, meaningful developments over speculation, no sensationalism, \
                      diverse topics. Reply with ONLY a comma-separated list of candidate \
                      indices, best first. No other text.";
        let user = format!(
            "Pick the {shortlist_size} most newsworthy candidates:\n{listing}\n\n\
             Reply with exactly {shortlist_size} indices, comma-separated, best first."
        );

        let reply = self.chat(system, &user).await?;
        let indices = parse_index_list(&reply);
        if indices.is_empty() {
            return Err(JudgeError::Parse(format!("no indices in reply: {reply}")));
        }
        Ok(indices)
    }

    async fn semantically_equal(
        &self,
        text_a: &str,
        text_b: &str,
    ) -> std::result::Result<bool, JudgeError> {
        let system = "You compare two news texts. Reply ONLY 'SAME' if they cover the \
                      same specific news event, otherwise 'DIFFERENT'.";
        let user = format!("Text A:\n{text_a}\n\nText B:\n{text_b}");
        let reply = self.chat(system, &user).await?;
        let verdict = reply.trim().to_ascii_uppercase();
        if verdict.starts_with("SAME") {
            Ok(true)
        } else if verdict.starts_with("DIFFERENT") {
            Ok(false)
        } else {
            Err(JudgeError::Parse(format!("unexpected verdict: {reply}")))
        }
    }

    async fn summarize(
        &self,
        text: &str,
        char_budget: usize,
    ) -> std::result::Result<String, JudgeError> {
        let system = "You write brief, factual social media summaries of news articles. \
                      Who, what, where, when. Neutral language, no opinions, no hashtags, \
                      no emojis. Reply with the summary text only.";
        let user = format!(
            "Summarize this article in at most {char_budget} characters:\n\n{text}"
        );
        let reply = self.chat(system, &user).await?;
        let cleaned = sanitize_single_line(&reply);
        if cleaned.is_empty() {
            return Err(JudgeError::Parse("empty summary".into()));
        }
        Ok(cleaned)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Pull candidate indices out of a free-form reply: accepts "2, 0, 4",
/// "2,0,4", or a numbered list. First occurrence wins; duplicates kept so
/// the ranker can reject them.
pub fn parse_index_list(reply: &str) -> Vec<usize> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+").expect("index regex"));
    re.find_iter(reply)
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .collect()
}

/// Collapse a completion to one trimmed line: newlines/tabs become spaces,
/// runs of whitespace collapse.
pub fn sanitize_single_line(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c => c,
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out.trim_end().to_string()
}
