//! Web article connector.
//!
//! Uses SerpAPI (Google engine) when `SERPAPI_KEY` is set, and DuckDuckGo's
//! HTML endpoint otherwise. A failed SerpAPI call also falls back to
//! DuckDuckGo.
//!
//! Only results whose title looks like research (mentions "paper",
//! "research", or "study"; DuckDuckGo also accepts "article") are kept.
//!
//! The DuckDuckGo path scrapes HTML with plain string matching. It depends
//! on the `result__a` / `result__snippet` class names and will silently
//! return nothing if that markup changes.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::WebSourceConfig;
use crate::error::SourceError;
use crate::models::{PaperItem, PaperSource};
use crate::traits::{AuthMode, SourceAdapter};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const SERP_KEYWORDS: &[&str] = &["paper", "research", "study"];
const DDG_KEYWORDS: &[&str] = &["paper", "research", "study", "article"];

pub struct WebSearchAdapter {
    client: reqwest::Client,
    serpapi_url: String,
    duckduckgo_url: String,
    serpapi_key: Option<String>,
}

impl WebSearchAdapter {
    pub fn new(config: &WebSourceConfig, serpapi_key: Option<String>) -> Result<Self> {
        if serpapi_key.is_none() {
            info!("SERPAPI_KEY not set; web search uses DuckDuckGo");
        }
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            serpapi_url: config.serpapi_url.clone(),
            duckduckgo_url: config.duckduckgo_url.clone(),
            serpapi_key,
        })
    }

    async fn search_serpapi(
        &self,
        key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PaperItem>, SourceError> {
        let num = limit.clamp(1, 100).to_string();
        let resp = self
            .client
            .get(&self.serpapi_url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", key),
                ("num", num.as_str()),
            ])
            .send()
            .await
            // the URL carries the key
            .map_err(reqwest::Error::without_url)?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.without_url().to_string()))?;
        Ok(parse_serpapi_response(&body))
    }

    async fn search_duckduckgo(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PaperItem>, SourceError> {
        let resp = self
            .client
            .post(&self.duckduckgo_url)
            .form(&[("q", query), ("kl", "us-en")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let html = resp.text().await?;
        Ok(parse_duckduckgo_html(&html, limit))
    }
}

#[async_trait]
impl SourceAdapter<PaperItem> for WebSearchAdapter {
    fn name(&self) -> &str {
        "web"
    }

    fn description(&self) -> &str {
        "Web articles via SerpAPI, falling back to DuckDuckGo"
    }

    fn auth_mode(&self) -> AuthMode {
        if self.serpapi_key.is_some() {
            AuthMode::Authenticated
        } else {
            AuthMode::Unauthenticated
        }
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<PaperItem>, SourceError> {
        if let Some(key) = self.serpapi_key.as_deref() {
            match self.search_serpapi(key, query, limit).await {
                Ok(mut papers) => {
                    papers.truncate(limit);
                    return Ok(papers);
                }
                Err(e) => warn!(error = %e, "SerpAPI failed; falling back to DuckDuckGo"),
            }
        }

        self.search_duckduckgo(query, limit).await
    }
}

// ============ SerpAPI ============

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

fn parse_serpapi_response(body: &serde_json::Value) -> Vec<PaperItem> {
    let Some(results) = body.get("organic_results").and_then(|r| r.as_array()) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|raw| serde_json::from_value::<OrganicResult>(raw.clone()).ok())
        .filter(|r| !r.link.is_empty() && looks_like_research(&r.title, SERP_KEYWORDS))
        .map(|r| web_paper(r.title, r.link, r.snippet))
        .collect()
}

// ============ DuckDuckGo HTML ============

/// Extract results from DuckDuckGo's HTML page.
///
/// Each result anchor carries `class="result__a"`; its snippet is the next
/// `result__snippet` element before the following result anchor. The first
/// `limit` anchors are considered, before keyword filtering.
fn parse_duckduckgo_html(html: &str, limit: usize) -> Vec<PaperItem> {
    const ANCHOR_CLASS: &str = "class=\"result__a\"";
    const SNIPPET_CLASS: &str = "class=\"result__snippet\"";

    let anchors: Vec<usize> = html
        .match_indices(ANCHOR_CLASS)
        .map(|(i, _)| i)
        .take(limit)
        .collect();

    let mut papers = Vec::new();
    for (n, &pos) in anchors.iter().enumerate() {
        let Some(tag_start) = html[..pos].rfind("<a ") else {
            continue;
        };
        let Some(tag_len) = html[tag_start..].find('>') else {
            continue;
        };
        let open_tag = &html[tag_start..tag_start + tag_len];
        let body_start = tag_start + tag_len + 1;
        let Some(body_len) = html[body_start..].find("</a>") else {
            continue;
        };

        let title = strip_tags(&html[body_start..body_start + body_len]);
        let url = match attribute(open_tag, "href") {
            Some(href) if href.starts_with("//") => format!("https:{}", href),
            Some(href) => href,
            None => continue,
        };
        if title.is_empty() || url.is_empty() {
            debug!("skipping DuckDuckGo result without title or link");
            continue;
        }

        let window_end = anchors.get(n + 1).copied().unwrap_or(html.len());
        let snippet = html
            .get(body_start..window_end)
            .and_then(|window| window.find(SNIPPET_CLASS))
            .map(|i| body_start + i)
            .and_then(|i| element_text(html, i))
            .filter(|s| !s.is_empty());

        if looks_like_research(&title, DDG_KEYWORDS) {
            papers.push(web_paper(title, url, snippet));
        }
    }

    papers
}

/// Text of the element whose opening tag contains byte offset `at`.
fn element_text(html: &str, at: usize) -> Option<String> {
    let tag_start = html[..at].rfind('<')?;
    let tag_name: String = html[tag_start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if tag_name.is_empty() {
        return None;
    }
    let content_start = at + html[at..].find('>')? + 1;
    let content_len = html[content_start..].find(&format!("</{}>", tag_name))?;
    Some(strip_tags(&html[content_start..content_start + content_len]))
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(decode_entities(&tag[start..start + len]))
}

fn strip_tags(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_entities(text.split_whitespace().collect::<Vec<_>>().join(" ").as_str())
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

// ============ Shared ============

fn looks_like_research(title: &str, keywords: &[&str]) -> bool {
    let lower = title.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn web_paper(title: String, url: String, snippet: Option<String>) -> PaperItem {
    PaperItem {
        id: url.clone(),
        title,
        authors: Vec::new(),
        abstract_text: snippet.filter(|s| !s.is_empty()),
        published: None,
        url,
        source: PaperSource::Web,
    }
}
