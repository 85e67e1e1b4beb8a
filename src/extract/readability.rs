// src/extract/readability.rs
//! Readability pass: harvest article text and embed metadata from HTML.
//!
//! Paragraph-harvest approach: prefer paragraphs inside article containers,
//! fall back to any substantial paragraph on the page. Entities are decoded
//! and whitespace normalized so downstream word counts are honest.

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{Html, Selector};

/// Paragraphs shorter than this are navigation/boilerplate, not prose.
const MIN_PARAGRAPH_CHARS: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub text: String,
    pub top_image: Option<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Extract title, body text, and a representative image from raw HTML.
pub fn parse_article_html(html: &str) -> ParsedPage {
    let doc = Html::parse_document(html);

    let title = meta_content(&doc, "meta[property=\"og:title\"]")
        .or_else(|| first_text(&doc, "title"))
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty());

    let top_image = meta_content(&doc, "meta[property=\"og:image\"]")
        .or_else(|| meta_content(&doc, "meta[name=\"twitter:image\"]"))
        .filter(|u| !u.is_empty());

    // Article containers first; the whole page only as a fallback.
    let scoped = selector("article p, main p, .article-content p, #article-body p");
    let mut paragraphs = collect_paragraphs(&doc, &scoped);
    if paragraphs.is_empty() {
        let any_p = selector("p");
        paragraphs = collect_paragraphs(&doc, &any_p);
    }

    ParsedPage {
        title,
        text: paragraphs.join("\n\n"),
        top_image,
    }
}

fn collect_paragraphs(doc: &Html, sel: &Selector) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    doc.select(sel)
        .map(|el| normalize_text(&el.text().collect::<String>()))
        .filter(|t| t.chars().count() >= MIN_PARAGRAPH_CHARS)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    doc.select(&sel)
        .next()
        .map(|el| el.text().collect::<String>())
}

/// Decode entities, normalize curly quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html><head>
        <title>Fallback Title - Site Name</title>
        <meta property="og:title" content="Storm Makes Landfall on Gulf Coast"/>
        <meta property="og:image" content="https://cdn.example.com/storm.jpg"/>
        </head><body>
        <nav><p>Home</p></nav>
        <article>
          <p>A powerful storm made landfall on the Gulf Coast early Thursday morning.</p>
          <p>Officials ordered evacuations in three coastal counties ahead of the surge.</p>
          <p>ok</p>
        </article>
        </body></html>"#;

    #[test]
    fn parses_title_image_and_paragraphs() {
        let page = parse_article_html(ARTICLE);
        assert_eq!(
            page.title.as_deref(),
            Some("Storm Makes Landfall on Gulf Coast")
        );
        assert_eq!(
            page.top_image.as_deref(),
            Some("https://cdn.example.com/storm.jpg")
        );
        assert!(page.text.contains("made landfall"));
        assert!(page.text.contains("evacuations"));
        // short paragraph filtered out
        assert!(!page.text.contains("ok"));
        // nav paragraph not inside an article container
        assert!(!page.text.contains("Home"));
    }

    #[test]
    fn falls_back_to_page_title_and_bare_paragraphs() {
        let html = r#"<html><head><title>Bare Page</title></head><body>
            <p>First substantial paragraph of a page without article markup.</p>
            </body></html>"#;
        let page = parse_article_html(html);
        assert_eq!(page.title.as_deref(), Some("Bare Page"));
        assert!(page.text.contains("substantial paragraph"));
        assert!(page.top_image.is_none());
    }

    #[test]
    fn normalize_decodes_entities_and_quotes() {
        assert_eq!(
            normalize_text("officials \u{201C}said&nbsp;&nbsp; so\u{201D}  "),
            "officials \"said so\""
        );
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("one two  three\nfour"), 4);
        assert_eq!(word_count(""), 0);
    }
}
