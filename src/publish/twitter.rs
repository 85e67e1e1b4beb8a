// src/publish/twitter.rs
//! Twitter/X publisher over the v2 API with an OAuth2 user-context bearer.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::compose::GeneratedPost;
use crate::error::{CurateError, PublishErrorKind, Result};
use crate::history::RecentPost;
use crate::publish::{parse_timestamp, status_to_kind, PublishedPost, Publisher};

const PLATFORM: &str = "twitter";
const CHAR_LIMIT: usize = 280;
const DEFAULT_API_BASE: &str = "https://api.x.com/2";

pub struct TwitterPublisher {
    http: reqwest::Client,
    api_base: String,
    bearer: String,
    /// Authenticated user id, resolved once per process.
    user_id: Mutex<Option<String>>,
}

impl TwitterPublisher {
    pub fn new(bearer: &str) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, bearer)
    }

    pub fn with_api_base(api_base: &str, bearer: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-curator/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bearer: bearer.to_string(),
            user_id: Mutex::new(None),
        }
    }

    fn err(&self, kind: PublishErrorKind) -> CurateError {
        CurateError::Publishing {
            platform: PLATFORM.to_string(),
            kind,
        }
    }

    async fn user_id(&self) -> Result<String> {
        let mut guard = self.user_id.lock().await;
        if let Some(id) = guard.as_ref() {
            return Ok(id.clone());
        }

        #[derive(Deserialize)]
        struct Me {
            data: MeData,
        }
        #[derive(Deserialize)]
        struct MeData {
            id: String,
        }

        let resp = self
            .http
            .get(format!("{}/users/me", self.api_base))
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(self.err(status_to_kind(status, message)));
        }
        let me: Me = resp
            .json()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;
        *guard = Some(me.data.id.clone());
        Ok(me.data.id)
    }
}

#[async_trait::async_trait]
impl Publisher for TwitterPublisher {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn char_limit(&self) -> usize {
        CHAR_LIMIT
    }

    async fn publish(&self, post: &GeneratedPost) -> Result<PublishedPost> {
        let resp = self
            .http
            .post(format!("{}/tweets", self.api_base))
            .bearer_auth(&self.bearer)
            .json(&json!({ "text": post.rendered() }))
            .send()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(self.err(status_to_kind(status, message)));
        }

        #[derive(Deserialize)]
        struct Created {
            data: CreatedData,
        }
        #[derive(Deserialize)]
        struct CreatedData {
            id: String,
        }
        let created: Created = resp
            .json()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let id = created.data.id;
        Ok(PublishedPost {
            platform: PLATFORM.to_string(),
            uri: format!("https://x.com/i/web/status/{id}"),
            post_id: id,
            timestamp: chrono::Utc::now(),
        })
    }

    async fn fetch_recent(&self, window: usize) -> Result<Vec<RecentPost>> {
        let user_id = self.user_id().await?;
        // v2 timeline accepts 5..=100
        let max_results = window.clamp(5, 100).to_string();

        let resp = self
            .http
            .get(format!("{}/users/{}/tweets", self.api_base, user_id))
            .bearer_auth(&self.bearer)
            .query(&[
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,entities"),
            ])
            .send()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(self.err(status_to_kind(status, message)));
        }

        #[derive(Deserialize)]
        struct Timeline {
            #[serde(default)]
            data: Vec<Tweet>,
        }
        #[derive(Deserialize)]
        struct Tweet {
            text: String,
            created_at: Option<String>,
            entities: Option<Entities>,
        }
        #[derive(Deserialize)]
        struct Entities {
            #[serde(default)]
            urls: Vec<UrlEntity>,
        }
        #[derive(Deserialize)]
        struct UrlEntity {
            expanded_url: Option<String>,
        }

        let timeline: Timeline = resp
            .json()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let posts = timeline
            .data
            .into_iter()
            .map(|t| RecentPost {
                title: None,
                url: t
                    .entities
                    .and_then(|e| e.urls.into_iter().find_map(|u| u.expanded_url)),
                posted_at: parse_timestamp(t.created_at.as_deref()),
                text: t.text,
            })
            .collect();
        Ok(posts)
    }
}
