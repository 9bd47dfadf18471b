//! Semantic Scholar connector.
//!
//! Searches the Semantic Scholar Graph API (`/paper/search`).
//!
//! # Environment Variables
//!
//! - `SEMANTIC_SCHOLAR_KEY` (optional). Without it the shared free tier is
//!   used and HTTP 429 responses are common; they are treated like any other
//!   failed call (no retry).

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ScholarSourceConfig;
use crate::error::SourceError;
use crate::models::{PaperItem, PaperSource};
use crate::traits::{AuthMode, SourceAdapter};

const FIELDS: &str = "paperId,title,authors,abstract,year,url,externalIds";

pub struct ScholarAdapter {
    client: reqwest::Client,
    base_url: String,
    authenticated: bool,
}

impl ScholarAdapter {
    pub fn new(config: &ScholarSourceConfig, api_key: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let authenticated = match api_key {
            Some(key) => {
                let mut value = HeaderValue::from_str(&key)?;
                value.set_sensitive(true);
                headers.insert("x-api-key", value);
                true
            }
            None => {
                warn!("SEMANTIC_SCHOLAR_KEY not set; using the rate-limited free tier");
                false
            }
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("project-scout/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authenticated,
        })
    }
}

#[async_trait]
impl SourceAdapter<PaperItem> for ScholarAdapter {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn description(&self) -> &str {
        "Semantic Scholar academic graph"
    }

    fn auth_mode(&self) -> AuthMode {
        if self.authenticated {
            AuthMode::Authenticated
        } else {
            AuthMode::Unauthenticated
        }
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<PaperItem>, SourceError> {
        let page = limit.clamp(1, 100).to_string();
        let resp = self
            .client
            .get(format!("{}/paper/search", self.base_url))
            .query(&[("query", query), ("limit", page.as_str()), ("fields", FIELDS)])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Semantic Scholar rate limit exceeded");
            return Err(SourceError::Status(status.as_u16()));
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        let mut papers = parse_search_response(&body);
        papers.truncate(limit);
        Ok(papers)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScholarRecord {
    paper_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<ScholarAuthor>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    year: Option<i64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    external_ids: Option<ExternalIds>,
}

#[derive(Deserialize)]
struct ScholarAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ExternalIds {
    #[serde(default, rename = "ArXiv")]
    arxiv: Option<String>,
}

/// Normalize a `/paper/search` body. Records that fail to decode or carry
/// no `paperId` are skipped; a body without `data` yields no papers.
fn parse_search_response(body: &serde_json::Value) -> Vec<PaperItem> {
    let Some(data) = body.get("data").and_then(|d| d.as_array()) else {
        debug!("Semantic Scholar response has no 'data' array");
        return Vec::new();
    };

    data.iter()
        .filter_map(|raw| match serde_json::from_value::<ScholarRecord>(raw.clone()) {
            Ok(record) => record_to_paper(record),
            Err(e) => {
                debug!(error = %e, "skipping malformed Semantic Scholar record");
                None
            }
        })
        .collect()
}

fn record_to_paper(record: ScholarRecord) -> Option<PaperItem> {
    let id = record.paper_id.filter(|id| !id.is_empty())?;

    let url = match record.url.filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => record
            .external_ids
            .and_then(|ids| ids.arxiv)
            .map(|arxiv| format!("https://arxiv.org/abs/{}", arxiv))
            .unwrap_or_default(),
    };

    Some(PaperItem {
        id,
        title: record.title.unwrap_or_default(),
        authors: record
            .authors
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|n| !n.is_empty())
            .collect(),
        abstract_text: record.abstract_text.filter(|a| !a.is_empty()),
        published: record.year.map(|y| y.to_string()),
        url,
        source: PaperSource::SemanticScholar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_records_with_url_fallback() {
        let body = json!({
            "total": 3,
            "data": [
                {
                    "paperId": "abc123",
                    "title": "Attention Is All You Need",
                    "authors": [{ "authorId": "1", "name": "Ashish Vaswani" }, { "name": null }],
                    "abstract": null,
                    "year": 2017,
                    "url": "",
                    "externalIds": { "ArXiv": "1706.03762" }
                },
                { "paperId": null, "title": "orphan" },
                { "paperId": "def456", "title": "Bad authors", "authors": "nobody" },
                {
                    "paperId": "ghi789",
                    "title": "Plain",
                    "url": "https://www.semanticscholar.org/paper/ghi789"
                }
            ]
        });

        let papers = parse_search_response(&body);
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].id, "abc123");
        assert_eq!(papers[0].url, "https://arxiv.org/abs/1706.03762");
        assert_eq!(papers[0].authors, vec!["Ashish Vaswani"]);
        assert_eq!(papers[0].published.as_deref(), Some("2017"));
        assert!(papers[0].abstract_text.is_none());
        assert_eq!(papers[0].source, PaperSource::SemanticScholar);

        assert_eq!(papers[1].id, "ghi789");
        assert_eq!(papers[1].url, "https://www.semanticscholar.org/paper/ghi789");
        assert!(papers[1].published.is_none());
    }

    #[test]
    fn missing_data_yields_nothing() {
        assert!(parse_search_response(&json!({ "message": "Too Many Requests" })).is_empty());
    }
}
