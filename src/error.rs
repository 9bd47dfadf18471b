//! Typed failures for the aggregation and planning pipeline.
//!
//! Provider-layer failures ([`SourceError`]) are always absorbed by the
//! pipeline; only [`ValidationError`] is surfaced to callers.

use std::time::Duration;
use thiserror::Error;

/// Why a single source adapter (or a single README fetch) produced nothing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Request-shape failures, rejected before any fan-out begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("max_results must be in [1, 100], got {0}")]
    MaxResultsOutOfRange(usize),

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("max_similar_projects must be in [1, 20], got {0}")]
    SimilarProjectsOutOfRange(usize),
}
