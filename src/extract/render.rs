// src/extract/render.rs
//! Slow-path rendering via a Browserless-style /content endpoint.

use std::time::Duration;

use crate::error::{CurateError, Result};
use crate::extract::PageRenderer;

pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }
}

#[async_trait::async_trait]
impl PageRenderer for BrowserlessRenderer {
    /// Fetch fully-rendered HTML for a URL. The timeout bounds the whole
    /// render round-trip.
    async fn render(&self, url: &str, timeout: Duration) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({ "url": url });

        let resp = self
            .client
            .post(&endpoint)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CurateError::ArticleFetch {
                url: url.to_string(),
                reason: if e.is_timeout() {
                    format!("render timed out after {}s", timeout.as_secs())
                } else {
                    format!("render transport: {e}")
                },
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CurateError::ArticleFetch {
                url: url.to_string(),
                reason: format!("renderer HTTP {status}: {message}"),
            });
        }

        resp.text().await.map_err(|e| CurateError::ArticleFetch {
            url: url.to_string(),
            reason: format!("reading rendered body: {e}"),
        })
    }
}
