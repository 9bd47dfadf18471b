//! Concurrent fan-out over every registered source, and the merge step.
//!
//! All adapter calls of one search are polled together on the caller's
//! task (`join_all`), so a slow source never delays collection of the
//! others beyond its own timeout, and no adapter's failure can abort the
//! batch. Each call yields a [`SourceOutcome`]; the merge step inspects
//! them exhaustively.

use futures::future::join_all;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

use crate::error::SourceError;
use crate::models::{PaperItem, RepositoryItem};
use crate::traits::{SourceAdapter, SourceOutcome, SourceRegistry};

/// The outcome of one adapter, tagged with the adapter's name.
#[derive(Debug)]
pub struct SourceReport<T> {
    pub source: String,
    pub outcome: SourceOutcome<T>,
}

/// Per-adapter outcomes of one fan-out, in registry order.
#[derive(Debug)]
pub struct FanOutBatch {
    pub repositories: Vec<SourceReport<RepositoryItem>>,
    pub papers: Vec<SourceReport<PaperItem>>,
}

impl FanOutBatch {
    /// Names of the sources that failed or timed out.
    pub fn failed_sources(&self) -> Vec<&str> {
        self.repositories
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.source.as_str())
            .chain(
                self.papers
                    .iter()
                    .filter(|r| !r.outcome.is_success())
                    .map(|r| r.source.as_str()),
            )
            .collect()
    }
}

/// Query every adapter in `registry` concurrently.
///
/// Each call is bounded by `timeout`; an expired call is reported as a
/// [`SourceError::Timeout`] failure for that adapter only. Successful
/// batches are capped at `max_results`. Never fails: with zero working
/// sources the batch simply holds only failures.
pub async fn fan_out(
    registry: &SourceRegistry,
    query: &str,
    max_results: usize,
    timeout: Duration,
) -> FanOutBatch {
    let span = info_span!("fan_out", query, max_results);

    async {
        let repo_calls = registry
            .repositories()
            .iter()
            .map(|adapter| call_source(adapter.as_ref(), query, max_results, timeout));
        let paper_calls = registry
            .papers()
            .iter()
            .map(|adapter| call_source(adapter.as_ref(), query, max_results, timeout));

        let (repositories, papers) = tokio::join!(join_all(repo_calls), join_all(paper_calls));
        let batch = FanOutBatch {
            repositories,
            papers,
        };

        let failed = batch.failed_sources();
        info!(
            sources = registry.len(),
            failed = failed.len(),
            failed_sources = ?failed,
            "fan-out complete"
        );
        batch
    }
    .instrument(span)
    .await
}

async fn call_source<T: Send + 'static>(
    adapter: &dyn SourceAdapter<T>,
    query: &str,
    max_results: usize,
    timeout: Duration,
) -> SourceReport<T> {
    let outcome = match tokio::time::timeout(timeout, adapter.search_outcome(query, max_results))
        .await
    {
        Ok(SourceOutcome::Success(mut items)) => {
            items.truncate(max_results);
            SourceOutcome::Success(items)
        }
        Ok(failure) => failure,
        Err(_) => {
            warn!(source = adapter.name(), timeout_secs = timeout.as_secs(), "source timed out");
            SourceOutcome::Failure(SourceError::Timeout(timeout))
        }
    };

    SourceReport {
        source: adapter.name().to_string(),
        outcome,
    }
}

/// Concatenate successful outcomes in registry order.
///
/// Each source keeps its own internal order; sources are not interleaved
/// and nothing is deduplicated across sources.
pub fn merge(batch: FanOutBatch) -> (Vec<RepositoryItem>, Vec<PaperItem>) {
    (concat(batch.repositories), concat(batch.papers))
}

fn concat<T>(reports: Vec<SourceReport<T>>) -> Vec<T> {
    let mut merged = Vec::new();
    for report in reports {
        match report.outcome {
            SourceOutcome::Success(items) => merged.extend(items),
            SourceOutcome::Failure(_) => {}
        }
    }
    merged
}
