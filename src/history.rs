// src/history.rs
//! Recent-post history window and the persisted post store.
//!
//! The history window is fetched fresh per run and read-only afterwards.
//! The store is a small JSON file of everything this curator has posted,
//! written atomically, bounded, and consulted as the cheapest rejection
//! gate (a URL we already posted never reaches extraction).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One previously published post, as reported by a platform feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentPost {
    pub title: Option<String>,
    pub text: String,
    pub url: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// Bounded, newest-first window of recent posts.
#[derive(Debug, Clone, Default)]
pub struct RecentPostHistory {
    posts: Vec<RecentPost>,
}

impl RecentPostHistory {
    /// Sort newest-first and cut to the window size. Entries outside the
    /// window are never consulted again this run.
    pub fn from_posts(mut posts: Vec<RecentPost>, window_size: usize) -> Self {
        posts.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        posts.truncate(window_size);
        Self { posts }
    }

    pub fn posts(&self) -> &[RecentPost] {
        &self.posts
    }

    /// The `n` most recent entries (for the expensive similarity tier).
    pub fn most_recent(&self, n: usize) -> &[RecentPost] {
        &self.posts[..n.min(self.posts.len())]
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// What gets persisted after a successful publish: enough to reconstruct
/// the post as an embed and to guard future runs against re-posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    pub candidate_url: String,
    pub category: String,
    /// platform name → platform post id
    pub post_ids: std::collections::BTreeMap<String, String>,
    pub generated_text: String,
    pub posted_at: DateTime<Utc>,
}

/// JSON-file-backed store of published posts.
pub struct PostStore {
    path: PathBuf,
    max_records: usize,
}

impl PostStore {
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records,
        }
    }

    pub fn load(&self) -> Result<Vec<PostRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&self.path)?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    /// Append a record, dropping the oldest entries beyond the cap.
    pub fn append(&self, record: PostRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        if records.len() > self.max_records {
            let excess = records.len() - self.max_records;
            records.drain(0..excess);
        }
        self.write_all(&records)
    }

    pub fn contains_url(&self, url: &str) -> Result<bool> {
        Ok(self.load()?.iter().any(|r| r.candidate_url == url))
    }

    fn write_all(&self, records: &[PostRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Default store location next to the config.
pub fn default_store_path() -> &'static Path {
    Path::new("data/posted.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(text: &str, ts: i64) -> RecentPost {
        RecentPost {
            title: Some(text.to_string()),
            text: text.to_string(),
            url: None,
            posted_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    fn record(url: &str) -> PostRecord {
        PostRecord {
            candidate_url: url.to_string(),
            category: "world".to_string(),
            post_ids: [("bluesky".to_string(), "cid123".to_string())].into(),
            generated_text: "text".to_string(),
            posted_at: Utc::now(),
        }
    }

    #[test]
    fn window_is_newest_first_and_bounded() {
        let history = RecentPostHistory::from_posts(
            vec![post("old", 100), post("new", 300), post("mid", 200)],
            2,
        );
        assert_eq!(history.len(), 2);
        assert_eq!(history.posts()[0].text, "new");
        assert_eq!(history.posts()[1].text, "mid");
        assert_eq!(history.most_recent(1)[0].text, "new");
        assert_eq!(history.most_recent(10).len(), 2);
    }

    #[test]
    fn store_roundtrip_and_url_guard() {
        let dir = tempfile::tempdir().unwrap();
        let store = PostStore::new(dir.path().join("posted.json"), 100);

        assert!(store.load().unwrap().is_empty());
        assert!(!store.contains_url("https://example.com/a").unwrap());

        store.append(record("https://example.com/a")).unwrap();
        assert!(store.contains_url("https://example.com/a").unwrap());
        assert!(!store.contains_url("https://example.com/b").unwrap());

        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].post_ids.get("bluesky").unwrap(), "cid123");
    }

    #[test]
    fn store_drops_oldest_beyond_cap() {
        let dir = tempfile::tempdir().unwrap();
        let store = PostStore::new(dir.path().join("posted.json"), 2);
        store.append(record("u1")).unwrap();
        store.append(record("u2")).unwrap();
        store.append(record("u3")).unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].candidate_url, "u2");
        assert_eq!(records[1].candidate_url, "u3");
    }
}
