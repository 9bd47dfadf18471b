//! Result ranking.
//!
//! Repositories are scored by popularity with a recency boost:
//!
//! | Last update | Multiplier |
//! |-------------|------------|
//! | < 30 days ago | 1.5 |
//! | < 365 days ago | 1.1 |
//! | older | 1.0 |
//!
//! A repository whose `updated_at` cannot be parsed scores exactly its
//! star count. Papers are ordered by a pluggable [`PaperScorer`]; the
//! baseline scores every paper 1.0, which keeps merge order.
//!
//! Both sorts are stable, so equal scores keep their input order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{PaperItem, RepositoryItem};

const RECENT_DAYS: i64 = 30;
const THIS_YEAR_DAYS: i64 = 365;

/// Strategy for ordering papers.
pub trait PaperScorer: Send + Sync {
    fn score(&self, paper: &PaperItem) -> f64;
}

/// Scores every paper the same.
pub struct ConstantPaperScorer;

impl PaperScorer for ConstantPaperScorer {
    fn score(&self, _paper: &PaperItem) -> f64 {
        1.0
    }
}

/// Parse a provider timestamp.
///
/// Accepts RFC 3339 and the naive forms `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD HH:MM:SS[.fff]` and `YYYY-MM-DD`, which are read as UTC.
pub fn parse_updated_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Popularity score of a repository as of `now`.
pub fn score_repository_at(repo: &RepositoryItem, now: DateTime<Utc>) -> f64 {
    let stars = repo.stars as f64;
    let Some(updated) = parse_updated_at(&repo.updated_at) else {
        return stars;
    };

    let age_days = (now - updated).num_days();
    let multiplier = if age_days < RECENT_DAYS {
        1.5
    } else if age_days < THIS_YEAR_DAYS {
        1.1
    } else {
        1.0
    };
    stars * multiplier
}

/// Sort descending by score (stable) and keep the first `max_results`.
pub fn rank_repositories(
    repos: Vec<RepositoryItem>,
    max_results: usize,
    now: DateTime<Utc>,
) -> Vec<RepositoryItem> {
    let mut scored: Vec<(f64, RepositoryItem)> = repos
        .into_iter()
        .map(|r| (score_repository_at(&r, now), r))
        .collect();
    scored.sort_by(|a, b| descending(a.0, b.0));
    scored
        .into_iter()
        .take(max_results)
        .map(|(_, r)| r)
        .collect()
}

/// Sort papers descending by `scorer` (stable) and keep the first `max_results`.
pub fn rank_papers(
    papers: Vec<PaperItem>,
    max_results: usize,
    scorer: &dyn PaperScorer,
) -> Vec<PaperItem> {
    let mut scored: Vec<(f64, PaperItem)> =
        papers.into_iter().map(|p| (scorer.score(&p), p)).collect();
    scored.sort_by(|a, b| descending(a.0, b.0));
    scored
        .into_iter()
        .take(max_results)
        .map(|(_, p)| p)
        .collect()
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Ranks both result lists against a clock.
#[derive(Clone)]
pub struct Ranker {
    paper_scorer: Arc<dyn PaperScorer>,
    clock: fn() -> DateTime<Utc>,
}

impl Ranker {
    pub fn new(paper_scorer: Arc<dyn PaperScorer>) -> Self {
        Self {
            paper_scorer,
            clock: Utc::now,
        }
    }

    /// Use a fixed clock instead of the system time.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn rank_repositories(
        &self,
        repos: Vec<RepositoryItem>,
        max_results: usize,
    ) -> Vec<RepositoryItem> {
        rank_repositories(repos, max_results, (self.clock)())
    }

    pub fn rank_papers(&self, papers: Vec<PaperItem>, max_results: usize) -> Vec<PaperItem> {
        rank_papers(papers, max_results, self.paper_scorer.as_ref())
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(Arc::new(ConstantPaperScorer))
    }
}
