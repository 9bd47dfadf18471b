//! GitHub repository connector.
//!
//! Searches repositories through the GitHub REST search API and doubles as
//! the README fetcher for the enrichment stage.
//!
//! # Configuration
//!
//! ```toml
//! [sources.github]
//! enabled = true
//! base_url = "https://api.github.com"
//! ```
//!
//! # Environment Variables
//!
//! - `GITHUB_TOKEN` (optional). Without it requests are unauthenticated and
//!   subject to much lower rate limits.
//!
//! # Caching
//!
//! Search results are cached per `(query, limit)` in the injected
//! [`ResultCache`]. README lookups are not cached.

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::config::GithubSourceConfig;
use crate::error::SourceError;
use crate::models::RepositoryItem;
use crate::traits::{AuthMode, ReadmeFetcher, SourceAdapter};

const USER_AGENT: &str = concat!("project-scout/", env!("CARGO_PKG_VERSION"));

/// Cache of normalized search results keyed by `(query, limit)`.
pub type RepositoryCache = ResultCache<(String, usize), Vec<RepositoryItem>>;

pub struct GithubAdapter {
    client: reqwest::Client,
    base_url: String,
    authenticated: bool,
    cache: Arc<RepositoryCache>,
}

impl GithubAdapter {
    pub fn new(
        config: &GithubSourceConfig,
        token: Option<String>,
        cache: Arc<RepositoryCache>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let authenticated = match token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("token {}", token))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                true
            }
            None => {
                warn!("GITHUB_TOKEN not set; GitHub requests are unauthenticated and rate limited");
                false
            }
        };

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authenticated,
            cache,
        })
    }
}

#[async_trait]
impl SourceAdapter<RepositoryItem> for GithubAdapter {
    fn name(&self) -> &str {
        "github"
    }

    fn description(&self) -> &str {
        "GitHub repository search, sorted by stars"
    }

    fn auth_mode(&self) -> AuthMode {
        if self.authenticated {
            AuthMode::Authenticated
        } else {
            AuthMode::Unauthenticated
        }
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RepositoryItem>, SourceError> {
        let key = (query.to_string(), limit);
        if let Some(cached) = self.cache.get(&key) {
            info!(query, limit, "returning cached GitHub results");
            return Ok(cached);
        }

        let per_page = limit.clamp(1, 100).to_string();
        let resp = self
            .client
            .get(format!("{}/search/repositories", self.base_url))
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        let repositories = parse_search_response(&body, limit)?;

        self.cache.insert(key, repositories.clone());
        Ok(repositories)
    }
}

#[async_trait]
impl ReadmeFetcher for GithubAdapter {
    async fn fetch_readme(&self, owner: &str, name: &str) -> Result<Option<String>, SourceError> {
        let resp = self
            .client
            .get(format!("{}/repos/{}/{}/readme", self.base_url, owner, name))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(owner, name, "repository has no README");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let payload: ReadmePayload = resp
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        match payload.content {
            Some(content) if !content.trim().is_empty() => decode_readme(&content).map(Some),
            _ => Ok(None),
        }
    }
}

// ============ Response parsing ============

#[derive(Deserialize)]
struct SearchRecord {
    id: u64,
    name: String,
    full_name: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    #[serde(default)]
    language: Option<String>,
    updated_at: String,
    owner: OwnerRecord,
}

#[derive(Deserialize)]
struct OwnerRecord {
    login: String,
}

#[derive(Deserialize)]
struct ReadmePayload {
    #[serde(default)]
    content: Option<String>,
}

/// Normalize a `/search/repositories` body, skipping records that do not
/// have the expected shape.
fn parse_search_response(
    body: &serde_json::Value,
    limit: usize,
) -> Result<Vec<RepositoryItem>, SourceError> {
    let items = body
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SourceError::Malformed("missing 'items' array".to_string()))?;

    let mut repositories = Vec::new();
    for raw in items {
        if repositories.len() >= limit {
            break;
        }
        match serde_json::from_value::<SearchRecord>(raw.clone()) {
            Ok(r) => repositories.push(RepositoryItem {
                id: r.id,
                name: r.name,
                full_name: r.full_name,
                html_url: r.html_url,
                description: r.description,
                stars: r.stargazers_count,
                forks: r.forks_count,
                language: r.language,
                updated_at: r.updated_at,
                owner: r.owner.login,
                readme: None,
            }),
            Err(e) => debug!(error = %e, "skipping malformed GitHub record"),
        }
    }

    Ok(repositories)
}

/// Decode the base64 `content` of a README response. GitHub wraps the
/// encoded text at 60 columns, so whitespace is stripped first.
fn decode_readme(content: &str) -> Result<String, SourceError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SourceError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64, stars: u64) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("repo{}", id),
            "full_name": format!("octo/repo{}", id),
            "html_url": format!("https://github.com/octo/repo{}", id),
            "description": null,
            "stargazers_count": stars,
            "forks_count": 3,
            "language": "Rust",
            "updated_at": "2024-05-01T12:00:00Z",
            "owner": { "login": "octo" }
        })
    }

    #[test]
    fn parses_records_and_skips_malformed_ones() {
        let body = json!({
            "items": [
                record(1, 10),
                { "id": "not-a-number", "name": "bad" },
                record(2, 20)
            ]
        });
        let repos = parse_search_response(&body, 10).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].full_name, "octo/repo1");
        assert_eq!(repos[0].owner, "octo");
        assert_eq!(repos[1].stars, 20);
        assert!(repos[0].description.is_none());
        assert!(repos[0].readme.is_none());
    }

    #[test]
    fn caps_at_limit() {
        let body = json!({ "items": [record(1, 1), record(2, 2), record(3, 3)] });
        assert_eq!(parse_search_response(&body, 2).unwrap().len(), 2);
    }

    #[test]
    fn missing_items_is_malformed() {
        let err = parse_search_response(&json!({ "message": "API rate limit" }), 5).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn decodes_wrapped_base64_readme() {
        // "# Hello\nworld\n" split across lines the way GitHub returns it
        let content = "IyBIZWxs\nbwp3b3Js\nZAo=\n";
        assert_eq!(decode_readme(content).unwrap(), "# Hello\nworld\n");
    }

    #[test]
    fn invalid_base64_is_decode_error() {
        assert!(matches!(
            decode_readme("!!!not base64!!!"),
            Err(SourceError::Decode(_))
        ));
    }
}
