//! Extension traits for search sources and README enrichment.
//!
//! Every external provider sits behind [`SourceAdapter`]. The fan-out
//! coordinator only ever sees the trait, so built-in adapters and custom
//! ones (test fakes, private indexes) are dispatched the same way.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SourceRegistry                 │
//! │  repositories: GitHub, custom...             │
//! │  papers:       arXiv → Semantic Scholar →    │
//! │                web → custom...               │
//! └──────────────┬───────────────────────────────┘
//!                ▼
//!       fan_out() → merge() → Ranker → Enricher
//! ```
//!
//! # Usage
//!
//! ```rust
//! use project_scout::traits::SourceRegistry;
//!
//! let sources = SourceRegistry::new();
//! // sources.register_papers(Arc::new(MyPaperIndex::new()));
//! assert!(sources.is_empty());
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::config::{Config, Credentials};
use crate::connector_arxiv::ArxivAdapter;
use crate::connector_github::GithubAdapter;
use crate::connector_scholar::ScholarAdapter;
use crate::connector_web::WebSearchAdapter;
use crate::error::SourceError;
use crate::models::{PaperItem, RepositoryItem};

// ═══════════════════════════════════════════════════════════════════════
// Source Adapter Trait
// ═══════════════════════════════════════════════════════════════════════

/// How an adapter talks to its provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// A credential was found and is sent with every request.
    Authenticated,
    /// The credential is missing; the adapter runs rate-limited or on a fallback.
    Unauthenticated,
    /// The provider needs no credential.
    NotRequired,
}

/// The typed result of one adapter call inside a fan-out.
#[derive(Debug)]
pub enum SourceOutcome<T> {
    Success(Vec<T>),
    Failure(SourceError),
}

impl<T> SourceOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success(_))
    }

    /// Items on success; nothing on failure.
    pub fn into_items(self) -> Vec<T> {
        match self {
            SourceOutcome::Success(items) => items,
            SourceOutcome::Failure(_) => Vec::new(),
        }
    }
}

/// An external search provider normalized into one item type.
///
/// Implementors only write [`fetch`](SourceAdapter::fetch). Callers use
/// [`search`](SourceAdapter::search) or
/// [`search_outcome`](SourceAdapter::search_outcome), which never fail:
/// the error is logged here, at the adapter boundary, and the caller gets
/// an empty result.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use project_scout::error::SourceError;
/// use project_scout::models::PaperItem;
/// use project_scout::traits::SourceAdapter;
///
/// pub struct StaticPapers;
///
/// #[async_trait]
/// impl SourceAdapter<PaperItem> for StaticPapers {
///     fn name(&self) -> &str { "static" }
///     fn description(&self) -> &str { "A fixed list of papers" }
///
///     async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<PaperItem>, SourceError> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter<T: Send + 'static>: Send + Sync {
    /// Short identifier used in logs and `GET /sources` (e.g. `"github"`).
    fn name(&self) -> &str;

    /// One-line description of the provider.
    fn description(&self) -> &str;

    fn auth_mode(&self) -> AuthMode {
        AuthMode::NotRequired
    }

    /// Query the provider for at most `limit` items.
    ///
    /// A malformed record must be skipped rather than fail the response.
    /// Transport failures, non-2xx statuses, and unreadable payloads are
    /// returned as [`SourceError`].
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<T>, SourceError>;

    /// Run [`fetch`](SourceAdapter::fetch), cap the result at `limit`, and
    /// turn any failure into a logged [`SourceOutcome::Failure`].
    async fn search_outcome(&self, query: &str, limit: usize) -> SourceOutcome<T> {
        match self.fetch(query, limit).await {
            Ok(mut items) => {
                items.truncate(limit);
                debug!(source = self.name(), count = items.len(), "source returned");
                SourceOutcome::Success(items)
            }
            Err(e) => {
                warn!(source = self.name(), error = %e, "source failed; contributing no results");
                SourceOutcome::Failure(e)
            }
        }
    }

    /// Like [`search_outcome`](SourceAdapter::search_outcome), flattened to
    /// an item list.
    async fn search(&self, query: &str, limit: usize) -> Vec<T> {
        self.search_outcome(query, limit).await.into_items()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// README Fetcher Trait
// ═══════════════════════════════════════════════════════════════════════

/// Supplementary content lookup used by the enrichment stage.
#[async_trait]
pub trait ReadmeFetcher: Send + Sync {
    /// Fetch the README of `owner/name`. `Ok(None)` means the repository has none.
    async fn fetch_readme(&self, owner: &str, name: &str) -> Result<Option<String>, SourceError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

pub type RepositorySource = Arc<dyn SourceAdapter<RepositoryItem>>;
pub type PaperSourceAdapter = Arc<dyn SourceAdapter<PaperItem>>;

/// Ordered set of adapters consulted by every search.
///
/// Registration order is merge order: papers from the first registered
/// paper adapter come before those of the second, and so on.
pub struct SourceRegistry {
    repositories: Vec<RepositorySource>,
    papers: Vec<PaperSourceAdapter>,
    readme: Option<Arc<dyn ReadmeFetcher>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            repositories: Vec::new(),
            papers: Vec::new(),
            readme: None,
        }
    }

    /// Create a registry with every built-in adapter enabled in the config.
    ///
    /// Paper sources are registered archive first, then scholarly graph,
    /// then web. The GitHub adapter doubles as the README fetcher.
    pub fn from_config(
        config: &Config,
        credentials: &Credentials,
        cache: Arc<ResultCache<(String, usize), Vec<RepositoryItem>>>,
    ) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        let sources = &config.sources;

        if sources.github.enabled {
            let github = Arc::new(GithubAdapter::new(
                &sources.github,
                credentials.github_token.clone(),
                cache,
            )?);
            registry.register_repositories(github.clone());
            registry.set_readme_fetcher(github);
        }
        if sources.arxiv.enabled {
            registry.register_papers(Arc::new(ArxivAdapter::new(&sources.arxiv)?));
        }
        if sources.semantic_scholar.enabled {
            registry.register_papers(Arc::new(ScholarAdapter::new(
                &sources.semantic_scholar,
                credentials.semantic_scholar_key.clone(),
            )?));
        }
        if sources.web.enabled {
            registry.register_papers(Arc::new(WebSearchAdapter::new(
                &sources.web,
                credentials.serpapi_key.clone(),
            )?));
        }

        Ok(registry)
    }

    pub fn register_repositories(&mut self, adapter: RepositorySource) {
        self.repositories.push(adapter);
    }

    pub fn register_papers(&mut self, adapter: PaperSourceAdapter) {
        self.papers.push(adapter);
    }

    pub fn set_readme_fetcher(&mut self, fetcher: Arc<dyn ReadmeFetcher>) {
        self.readme = Some(fetcher);
    }

    pub fn repositories(&self) -> &[RepositorySource] {
        &self.repositories
    }

    pub fn papers(&self) -> &[PaperSourceAdapter] {
        &self.papers
    }

    pub fn readme_fetcher(&self) -> Option<Arc<dyn ReadmeFetcher>> {
        self.readme.clone()
    }

    /// Check if no adapter is registered.
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty() && self.papers.is_empty()
    }

    /// Return the count of registered adapters.
    pub fn len(&self) -> usize {
        self.repositories.len() + self.papers.len()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperSource;

    struct Broken;

    #[async_trait]
    impl SourceAdapter<PaperItem> for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<PaperItem>, SourceError> {
            Err(SourceError::Status(503))
        }
    }

    struct Chatty;

    #[async_trait]
    impl SourceAdapter<PaperItem> for Chatty {
        fn name(&self) -> &str {
            "chatty"
        }
        fn description(&self) -> &str {
            "ignores the limit"
        }
        async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<PaperItem>, SourceError> {
            Ok((0..10)
                .map(|i| PaperItem {
                    id: i.to_string(),
                    title: format!("paper {}", i),
                    authors: vec![],
                    abstract_text: None,
                    published: None,
                    url: String::new(),
                    source: PaperSource::Web,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn failing_fetch_becomes_empty_search() {
        assert!(Broken.search("q", 5).await.is_empty());
        let outcome = Broken.search_outcome("q", 5).await;
        assert!(matches!(
            outcome,
            SourceOutcome::Failure(SourceError::Status(503))
        ));
    }

    #[tokio::test]
    async fn search_caps_at_limit() {
        let items = Chatty.search("q", 3).await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].id, "2");
    }

    #[test]
    fn all_sources_disabled_gives_empty_registry() {
        let mut config = Config::default();
        config.sources.github.enabled = false;
        config.sources.arxiv.enabled = false;
        config.sources.semantic_scholar.enabled = false;
        config.sources.web.enabled = false;
        let cache = Arc::new(ResultCache::new(std::time::Duration::from_secs(60), 10));
        let registry =
            SourceRegistry::from_config(&config, &Credentials::default(), cache).unwrap();
        assert!(registry.is_empty());
        assert!(registry.readme_fetcher().is_none());
    }

    #[test]
    fn default_config_registers_papers_in_fixed_order() {
        let cache = Arc::new(ResultCache::new(std::time::Duration::from_secs(60), 10));
        let registry =
            SourceRegistry::from_config(&Config::default(), &Credentials::default(), cache)
                .unwrap();
        let names: Vec<&str> = registry.papers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["arxiv", "semantic_scholar", "web"]);
        assert_eq!(registry.repositories().len(), 1);
        assert_eq!(registry.len(), 4);
        assert!(registry.readme_fetcher().is_some());
    }
}
