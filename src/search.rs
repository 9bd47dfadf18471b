//! The aggregation pipeline.
//!
//! ```text
//! query → fan_out → merge → rank → truncate → (enrich) → AggregatedResult
//! ```
//!
//! Requests are validated before any adapter is called. After validation
//! the pipeline cannot fail: every provider-side problem has already been
//! absorbed into an empty contribution by the time results are merged.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::ResultCache;
use crate::config::{Config, Credentials};
use crate::enrich::Enricher;
use crate::error::ValidationError;
use crate::fanout::{fan_out, merge};
use crate::models::{AggregatedResult, RepositoryItem};
use crate::rank::Ranker;
use crate::traits::SourceRegistry;

pub const MAX_RESULTS_LIMIT: usize = 100;

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    max_results: usize,
}

impl SearchRequest {
    /// Reject an empty query or a `max_results` outside `1..=100`.
    pub fn new(query: impl Into<String>, max_results: usize) -> Result<Self, ValidationError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
            return Err(ValidationError::MaxResultsOutOfRange(max_results));
        }
        Ok(Self {
            query,
            max_results,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

/// Everything one search needs, shared across requests.
pub struct SearchPipeline {
    registry: Arc<SourceRegistry>,
    ranker: Ranker,
    enricher: Option<Enricher>,
    adapter_timeout: Duration,
    default_max_results: usize,
}

impl SearchPipeline {
    pub fn new(registry: Arc<SourceRegistry>, ranker: Ranker, adapter_timeout: Duration) -> Self {
        Self {
            registry,
            ranker,
            enricher: None,
            adapter_timeout,
            default_max_results: 10,
        }
    }

    /// Build the pipeline for the configured sources.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
        let cache = Arc::new(ResultCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        ));
        let registry = SourceRegistry::from_config(config, credentials, cache)?;
        let enricher = if config.search.attach_readmes {
            registry
                .readme_fetcher()
                .map(|fetcher| Enricher::new(fetcher, config.search.enrich_concurrency))
        } else {
            None
        };

        let mut pipeline = Self::new(
            Arc::new(registry),
            Ranker::default(),
            config.search.adapter_timeout(),
        )
        .with_default_max_results(config.search.default_max_results);
        pipeline.enricher = enricher;
        Ok(pipeline)
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = max_results;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn default_max_results(&self) -> usize {
        self.default_max_results
    }

    /// Run one aggregated search.
    pub async fn search(&self, request: &SearchRequest) -> AggregatedResult {
        let max_results = request.max_results();
        let batch = fan_out(
            &self.registry,
            request.query(),
            max_results,
            self.adapter_timeout,
        )
        .await;
        let (repositories, papers) = merge(batch);

        let repositories = self.ranker.rank_repositories(repositories, max_results);
        let papers = self.ranker.rank_papers(papers, max_results);
        let repositories = self.enrich(repositories).await;

        info!(
            query = request.query(),
            repositories = repositories.len(),
            papers = papers.len(),
            "search complete"
        );
        AggregatedResult::new(repositories, papers)
    }

    /// Repositories only, ranked and enriched. Used by planning to find
    /// similar projects without querying paper sources.
    pub async fn search_repositories(&self, request: &SearchRequest) -> Vec<RepositoryItem> {
        let max_results = request.max_results();
        let mut repositories_only = SourceRegistry::new();
        for adapter in self.registry.repositories() {
            repositories_only.register_repositories(adapter.clone());
        }

        let batch = fan_out(
            &repositories_only,
            request.query(),
            max_results,
            self.adapter_timeout,
        )
        .await;
        let (repositories, _) = merge(batch);
        let repositories = self.ranker.rank_repositories(repositories, max_results);
        self.enrich(repositories).await
    }

    async fn enrich(&self, repositories: Vec<RepositoryItem>) -> Vec<RepositoryItem> {
        match &self.enricher {
            Some(enricher) if !repositories.is_empty() => enricher.enrich(repositories).await,
            _ => repositories,
        }
    }
}

/// `scout search`: run one search and print both result lists.
pub async fn run_search(
    config: &Config,
    credentials: &Credentials,
    query: &str,
    max_results: Option<usize>,
) -> Result<()> {
    let pipeline = SearchPipeline::from_config(config, credentials)?;
    let request = SearchRequest::new(
        query,
        max_results.unwrap_or(pipeline.default_max_results()),
    )?;

    let result = pipeline.search(&request).await;
    if result.is_empty() {
        println!("No results.");
        return Ok(());
    }

    if !result.repositories().is_empty() {
        println!("Repositories:");
        for (i, repo) in result.repositories().iter().enumerate() {
            println!(
                "{}. {}  ★{}  {}",
                i + 1,
                repo.full_name,
                repo.stars,
                repo.language.as_deref().unwrap_or("-")
            );
            println!("    {}", repo.html_url);
            if let Some(desc) = &repo.description {
                println!("    {}", desc);
            }
        }
        println!();
    }

    if !result.papers().is_empty() {
        println!("Papers:");
        for (i, paper) in result.papers().iter().enumerate() {
            println!("{}. [{}] {}", i + 1, paper.source, paper.title);
            if !paper.authors.is_empty() {
                println!("    {}", paper.authors.join(", "));
            }
            println!("    {}", paper.url);
        }
    }

    Ok(())
}
