// src/publish/bluesky.rs
//! BlueSky publisher over the AT protocol HTTP API.
//!
//! App-password session auth, `createRecord` posts with an external-link
//! embed and rich-text tag facets, `getAuthorFeed` for the history window.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::compose::GeneratedPost;
use crate::error::{CurateError, PublishErrorKind, Result};
use crate::history::RecentPost;
use crate::publish::{parse_timestamp, status_to_kind, PublishedPost, Publisher};

const PLATFORM: &str = "bluesky";
const CHAR_LIMIT: usize = 300;
/// Embed card description cap; the post text itself carries the summary.
const EMBED_DESC_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

pub struct BlueskyPublisher {
    http: reqwest::Client,
    pds_base: String,
    identifier: String,
    password: String,
    session: Mutex<Option<Session>>,
}

impl BlueskyPublisher {
    pub fn new(pds_base: &str, identifier: &str, password: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-curator/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            pds_base: pds_base.trim_end_matches('/').to_string(),
            identifier: identifier.to_string(),
            password: password.to_string(),
            session: Mutex::new(None),
        }
    }

    fn err(&self, kind: PublishErrorKind) -> CurateError {
        CurateError::Publishing {
            platform: PLATFORM.to_string(),
            kind,
        }
    }

    async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(s) = guard.as_ref() {
            return Ok(s.clone());
        }

        let resp = self
            .http
            .post(format!(
                "{}/xrpc/com.atproto.server.createSession",
                self.pds_base
            ))
            .json(&json!({
                "identifier": self.identifier,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(self.err(status_to_kind(status, message)));
        }
        let session: Session = resp
            .json()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;
        tracing::info!(identifier = %self.identifier, "created BlueSky session");
        *guard = Some(session.clone());
        Ok(session)
    }
}

#[async_trait::async_trait]
impl Publisher for BlueskyPublisher {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn char_limit(&self) -> usize {
        CHAR_LIMIT
    }

    async fn publish(&self, post: &GeneratedPost) -> Result<PublishedPost> {
        let session = self.session().await?;
        let rendered = post.rendered();
        let now = chrono::Utc::now();

        let description: String = post.text.chars().take(EMBED_DESC_CHARS).collect();
        let mut record = json!({
            "$type": "app.bsky.feed.post",
            "text": rendered,
            "createdAt": now.to_rfc3339(),
            "embed": {
                "$type": "app.bsky.embed.external",
                "external": {
                    "uri": post.link,
                    "title": post.title,
                    "description": description,
                }
            }
        });
        let facets = tag_facets(&rendered, &post.hashtags);
        if !facets.is_empty() {
            record["facets"] = json!(facets);
        }

        let resp = self
            .http
            .post(format!(
                "{}/xrpc/com.atproto.repo.createRecord",
                self.pds_base
            ))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
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
            uri: String,
            cid: String,
        }
        let created: Created = resp
            .json()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        Ok(PublishedPost {
            platform: PLATFORM.to_string(),
            post_id: created.cid,
            uri: created.uri,
            timestamp: now,
        })
    }

    async fn fetch_recent(&self, window: usize) -> Result<Vec<RecentPost>> {
        let session = self.session().await?;

        let limit = window.to_string();
        let resp = self
            .http
            .get(format!(
                "{}/xrpc/app.bsky.feed.getAuthorFeed",
                self.pds_base
            ))
            .bearer_auth(&session.access_jwt)
            .query(&[
                ("actor", session.did.as_str()),
                ("limit", limit.as_str()),
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
        struct Feed {
            feed: Vec<FeedItem>,
        }
        #[derive(Deserialize)]
        struct FeedItem {
            post: FeedPost,
        }
        #[derive(Deserialize)]
        struct FeedPost {
            record: Option<FeedRecord>,
            embed: Option<FeedEmbed>,
            #[serde(rename = "indexedAt")]
            indexed_at: Option<String>,
        }
        #[derive(Deserialize)]
        struct FeedRecord {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct FeedEmbed {
            external: Option<FeedExternal>,
        }
        #[derive(Deserialize)]
        struct FeedExternal {
            uri: Option<String>,
            title: Option<String>,
        }

        let feed: Feed = resp
            .json()
            .await
            .map_err(|e| self.err(PublishErrorKind::Transport(e.to_string())))?;

        let posts = feed
            .feed
            .into_iter()
            .map(|item| {
                let external = item.post.embed.and_then(|e| e.external);
                RecentPost {
                    title: external.as_ref().and_then(|e| e.title.clone()),
                    text: item
                        .post
                        .record
                        .and_then(|r| r.text)
                        .unwrap_or_default(),
                    url: external.and_then(|e| e.uri),
                    posted_at: parse_timestamp(item.post.indexed_at.as_deref()),
                }
            })
            .collect();
        Ok(posts)
    }
}

/// Rich-text facets for each hashtag, located by byte offset in the
/// rendered text. Tags that cannot be found (shouldn't happen) are skipped
/// rather than producing a bad byte range.
fn tag_facets(rendered: &str, hashtags: &[String]) -> Vec<serde_json::Value> {
    let mut facets = Vec::new();
    let mut cursor = 0usize;
    for tag in hashtags {
        let needle = format!("#{tag}");
        let Some(rel) = rendered[cursor..].find(&needle) else {
            continue;
        };
        let start = cursor + rel;
        let end = start + needle.len();
        facets.push(json!({
            "index": { "byteStart": start, "byteEnd": end },
            "features": [{
                "$type": "app.bsky.richtext.facet#tag",
                "tag": tag,
            }]
        }));
        cursor = end;
    }
    facets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facets_carry_correct_byte_ranges() {
        let rendered = "Summary text #World #Storm https://example.com/a";
        let facets = tag_facets(rendered, &["World".to_string(), "Storm".to_string()]);
        assert_eq!(facets.len(), 2);

        let first = &facets[0]["index"];
        let start = first["byteStart"].as_u64().unwrap() as usize;
        let end = first["byteEnd"].as_u64().unwrap() as usize;
        assert_eq!(&rendered[start..end], "#World");

        let second = &facets[1]["index"];
        let start = second["byteStart"].as_u64().unwrap() as usize;
        let end = second["byteEnd"].as_u64().unwrap() as usize;
        assert_eq!(&rendered[start..end], "#Storm");
    }

    #[test]
    fn missing_tags_are_skipped() {
        let facets = tag_facets("no tags here", &["World".to_string()]);
        assert!(facets.is_empty());
    }
}
