//! Core data models used throughout Project Scout.
//!
//! These types represent the normalized items produced by source adapters,
//! the aggregated search result, and the roadmap produced by the planner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A code repository, normalized from the code-hosting provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryItem {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    /// Raw ISO-8601 timestamp as reported by the provider. May be naive or
    /// timezone-aware, and may not parse at all.
    pub updated_at: String,
    pub owner: String,
    /// README text, absent until the enrichment stage runs.
    pub readme: Option<String>,
}

/// Where a paper came from. Ids are only unique within one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSource {
    Arxiv,
    SemanticScholar,
    Web,
}

impl PaperSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::Arxiv => "arxiv",
            PaperSource::SemanticScholar => "semantic_scholar",
            PaperSource::Web => "web",
        }
    }
}

impl fmt::Display for PaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A paper or article, normalized from an archive, scholarly graph, or web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperItem {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub published: Option<String>,
    pub url: String,
    pub source: PaperSource,
}

/// The sole output of the aggregation pipeline.
///
/// Fields are private: once built, a result is only read or taken apart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedResult {
    repositories: Vec<RepositoryItem>,
    papers: Vec<PaperItem>,
}

impl AggregatedResult {
    pub fn new(repositories: Vec<RepositoryItem>, papers: Vec<PaperItem>) -> Self {
        Self {
            repositories,
            papers,
        }
    }

    pub fn repositories(&self) -> &[RepositoryItem] {
        &self.repositories
    }

    pub fn papers(&self) -> &[PaperItem] {
        &self.papers
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty() && self.papers.is_empty()
    }

    pub fn into_parts(self) -> (Vec<RepositoryItem>, Vec<PaperItem>) {
        (self.repositories, self.papers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: '{}'", other)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One roadmap entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapTask {
    pub task: String,
    pub priority: Priority,
    pub estimated_hours: u32,
    pub description: String,
}

/// A synthesized project roadmap. Built once per planning request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapPlan {
    pub project_summary: String,
    pub tech_stack: Vec<String>,
    pub roadmap: Vec<RoadmapTask>,
    pub similar_projects_found: usize,
    pub key_insights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" Medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn paper_serializes_source_tag_and_abstract_key() {
        let paper = PaperItem {
            id: "2401.00001".into(),
            title: "A Study".into(),
            authors: vec![],
            abstract_text: Some("text".into()),
            published: None,
            url: "http://arxiv.org/abs/2401.00001".into(),
            source: PaperSource::SemanticScholar,
        };
        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["source"], "semantic_scholar");
        assert_eq!(json["abstract"], "text");
    }

    #[test]
    fn aggregated_result_serializes_both_lists() {
        let result = AggregatedResult::default();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["repositories"].as_array().unwrap().is_empty());
        assert!(json["papers"].as_array().unwrap().is_empty());
        assert!(result.is_empty());
    }
}
