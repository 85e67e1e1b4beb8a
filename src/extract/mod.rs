// src/extract/mod.rs
//! Two-stage article extraction with paywall gates.
//!
//! Stage 1 is a plain HTTP fetch plus a CSS-selector readability pass.
//! Stage 2 renders the page through a browser service and re-parses, for
//! JavaScript-gated or partially paywalled content. A static domain
//! blocklist rejects known subscription sites before any network cost, and
//! the fast path's resolved URL (after redirects) is checked against the
//! same list so aggregator links cannot smuggle one in.

pub mod readability;
pub mod render;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::ExtractConfig;
use crate::error::{CurateError, Result};
use self::readability::{parse_article_html, word_count};

/// Extraction success: the article text plus embed metadata.
#[derive(Debug, Clone)]
pub struct ExtractedArticle {
    /// Post-redirect URL; what gets posted and persisted.
    pub resolved_url: String,
    pub title: Option<String>,
    pub text: String,
    pub word_count: usize,
    pub top_image: Option<String>,
}

/// A fetched page: final URL after redirects plus raw HTML.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub html: String,
}

/// Fast-path page retrieval. Implementations map transport failures to
/// [`CurateError::ArticleFetch`].
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage>;
}

/// Slow-path rendering: returns fully rendered HTML for re-parsing.
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// Default `PageFetcher` over reqwest. Follows redirects; the final URL is
/// reported back for the paywall re-check.
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        let resp = self
            .http
            .get(url)
            .timeout(timeout)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| CurateError::ArticleFetch {
                url: url.to_string(),
                reason: if e.is_timeout() {
                    format!("timed out after {}s", timeout.as_secs())
                } else {
                    e.to_string()
                },
            })?;

        if !resp.status().is_success() {
            return Err(CurateError::ArticleFetch {
                url: url.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let final_url = resp.url().to_string();
        let html = resp.text().await.map_err(|e| CurateError::ArticleFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(FetchedPage { final_url, html })
    }
}

pub struct ArticleExtractor {
    cfg: ExtractConfig,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl ArticleExtractor {
    pub fn new(
        cfg: ExtractConfig,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Self {
        Self {
            cfg,
            fetcher,
            renderer,
        }
    }

    /// Extract full article text, escalating from the fast HTTP pass to the
    /// rendered fallback when the fast pass comes back short or paywalled.
    pub async fn extract(&self, url: &str) -> Result<ExtractedArticle> {
        self.paywall_gate(url)?;

        let fetch_timeout = Duration::from_secs(self.cfg.fetch_timeout_secs);
        let page = self.fetcher.fetch(url, fetch_timeout).await?;

        // Aggregator links resolve through redirects; the landing domain
        // gets the same static gate.
        if page.final_url != url {
            self.paywall_gate(&page.final_url)?;
        }

        if page.html.trim().is_empty() {
            return Err(CurateError::ArticleParse {
                url: page.final_url,
                reason: "empty response body".into(),
            });
        }

        let parsed = parse_article_html(&page.html);
        let words = word_count(&parsed.text);
        let paywalled = self.looks_paywalled(&page.html, words);

        if words >= self.cfg.min_word_count && !paywalled {
            return Ok(ExtractedArticle {
                resolved_url: page.final_url,
                title: parsed.title,
                text: parsed.text,
                word_count: words,
                top_image: parsed.top_image,
            });
        }

        let Some(renderer) = &self.renderer else {
            // No slow path configured. A marker plus short text reads as a
            // paywall; plain short text is just thin content.
            if paywalled {
                return Err(CurateError::Paywall {
                    domain: base_domain(&page.final_url).unwrap_or_else(|| page.final_url.clone()),
                });
            }
            return Err(CurateError::InsufficientContent {
                url: page.final_url,
                words,
                minimum: self.cfg.min_word_count,
            });
        };

        tracing::info!(
            url = %page.final_url,
            fast_words = words,
            paywalled,
            "fast pass inconclusive, escalating to rendered fallback"
        );

        let render_timeout = Duration::from_secs(self.cfg.render_timeout_secs);
        let rendered_html = renderer.render(&page.final_url, render_timeout).await?;
        let rendered = parse_article_html(&rendered_html);
        let rendered_words = word_count(&rendered.text);

        if rendered_words >= self.cfg.min_word_count {
            return Ok(ExtractedArticle {
                resolved_url: page.final_url,
                title: rendered.title.or(parsed.title),
                text: rendered.text,
                word_count: rendered_words,
                top_image: rendered.top_image.or(parsed.top_image),
            });
        }

        Err(CurateError::InsufficientContent {
            url: page.final_url,
            words: rendered_words.max(words),
            minimum: self.cfg.min_word_count,
        })
    }

    /// Static blocklist check; no network cost.
    fn paywall_gate(&self, url: &str) -> Result<()> {
        if let Some(base) = base_domain(url) {
            if self
                .cfg
                .paywall_domains
                .iter()
                .any(|d| d.eq_ignore_ascii_case(&base))
            {
                return Err(CurateError::Paywall { domain: base });
            }
        }
        Ok(())
    }

    fn looks_paywalled(&self, html: &str, words: usize) -> bool {
        if words >= self.cfg.min_word_count {
            return false;
        }
        let lower = html.to_lowercase();
        self.cfg
            .paywall_markers
            .iter()
            .any(|marker| lower.contains(marker.as_str()))
    }
}

/// `sub.example.co.uk` → `co.uk` is wrong, but matching the original's
/// last-two-labels rule keeps the blocklist entries 1:1 with it.
pub fn base_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 1 {
        Some(labels[labels.len() - 2..].join("."))
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_domain_takes_last_two_labels() {
        assert_eq!(
            base_domain("https://www.nytimes.com/2026/08/07/world/x.html"),
            Some("nytimes.com".to_string())
        );
        assert_eq!(
            base_domain("https://edition.cnn.com/article"),
            Some("cnn.com".to_string())
        );
        assert_eq!(base_domain("not a url"), None);
    }

    #[test]
    fn paywall_gate_matches_case_insensitively() {
        let extractor = ArticleExtractor::new(
            ExtractConfig::default(),
            Arc::new(HttpFetcher::new("test-agent")),
            None,
        );
        let err = extractor
            .paywall_gate("https://WWW.WSJ.COM/articles/x")
            .unwrap_err();
        assert!(matches!(err, CurateError::Paywall { domain } if domain == "wsj.com"));
    }
}
