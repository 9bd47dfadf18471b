//! README enrichment for ranked repositories.
//!
//! Fetches are issued with bounded concurrency and collected in input
//! order, so the output lines up index-for-index with the input. A fetch
//! that fails leaves that repository's `readme` empty and nothing else.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::RepositoryItem;
use crate::traits::ReadmeFetcher;

pub struct Enricher {
    fetcher: Arc<dyn ReadmeFetcher>,
    concurrency: usize,
}

impl Enricher {
    pub fn new(fetcher: Arc<dyn ReadmeFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Attach a README to every repository that has one.
    pub async fn enrich(&self, repos: Vec<RepositoryItem>) -> Vec<RepositoryItem> {
        let total = repos.len();
        let enriched: Vec<RepositoryItem> = stream::iter(repos)
            .map(|repo| self.attach_readme(repo))
            .buffered(self.concurrency)
            .collect()
            .await;

        let with_readme = enriched.iter().filter(|r| r.readme.is_some()).count();
        debug!(total, with_readme, "enrichment complete");
        enriched
    }

    async fn attach_readme(&self, mut repo: RepositoryItem) -> RepositoryItem {
        repo.readme = match self.fetcher.fetch_readme(&repo.owner, &repo.name).await {
            Ok(readme) => readme,
            Err(e) => {
                warn!(repository = %repo.full_name, error = %e, "README fetch failed");
                None
            }
        };
        repo
    }
}
