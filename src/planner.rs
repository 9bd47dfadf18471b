//! Roadmap synthesis.
//!
//! Turns a project idea plus a handful of similar repositories into a
//! [`RoadmapPlan`] through one [`Generator`] call.
//!
//! ```text
//! Idle ─▶ Prompting ─┬─▶ Parsed ───────┐
//!                    └─▶ FallbackUsed ─┴─▶ Done
//! ```
//!
//! There is exactly one attempt. A generator error, text that is not the
//! expected JSON, or a plan with no summary or tech stack all end in the
//! deterministic fallback plan; synthesis itself never fails.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ValidationError;
use crate::generate::Generator;
use crate::models::{Priority, RepositoryItem, RoadmapPlan, RoadmapTask};
use crate::search::{SearchPipeline, SearchRequest};

/// README characters sent per project by `POST /plan/create`.
pub const CREATE_SNIPPET_CHARS: usize = 1000;
/// README characters sent per project by `POST /plan/from-search`.
pub const FROM_SEARCH_SNIPPET_CHARS: usize = 2000;

const PROMPT_PROJECTS: usize = 3;

/// Why model output could not be used as a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("response is not valid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid priority: {0}")]
    Priority(String),

    #[error("invalid estimated_hours: {0}")]
    Hours(f64),

    #[error("plan has an empty {0}")]
    Empty(&'static str),
}

/// Which terminal branch produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOrigin {
    Generated,
    Fallback,
}

/// The view of a repository that is embedded in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarProject {
    pub name: String,
    pub description: String,
    pub readme_snippet: String,
    pub stars: u64,
    pub language: String,
}

impl SimilarProject {
    /// Project a repository, keeping at most `snippet_chars` characters of its README.
    pub fn from_repository(repo: &RepositoryItem, snippet_chars: usize) -> Self {
        Self {
            name: repo.name.clone(),
            description: repo.description.clone().unwrap_or_default(),
            readme_snippet: repo
                .readme
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(snippet_chars)
                .collect(),
            stars: repo.stars,
            language: repo
                .language
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Body of `POST /plan/create` and `POST /plan/from-search`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_include_similar")]
    pub include_similar_projects: bool,
    #[serde(default = "default_max_similar")]
    pub max_similar_projects: usize,
}

fn default_include_similar() -> bool {
    true
}
fn default_max_similar() -> usize {
    5
}

impl PlanRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !(1..=20).contains(&self.max_similar_projects) {
            return Err(ValidationError::SimilarProjectsOutOfRange(
                self.max_similar_projects,
            ));
        }
        Ok(())
    }

    /// Query used to look for similar repositories.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title.trim(), self.description.trim())
            .trim()
            .to_string()
    }

    /// The request shown by `GET /plan/example`.
    pub fn example() -> Self {
        Self {
            title: "chatbot".to_string(),
            description: "A chatbot that introduces me to visitors of my website".to_string(),
            include_similar_projects: true,
            max_similar_projects: 5,
        }
    }
}

// ============ Prompt ============

pub fn build_prompt(title: &str, description: &str, projects: &[SimilarProject]) -> String {
    let shown = &projects[..projects.len().min(PROMPT_PROJECTS)];
    let projects_json =
        serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"A user wants to build the following project.

Project title: {title}
User description: {description}

Similar projects found:
{projects_json}

Based on this information, write a detailed project plan. Reply with JSON only, in exactly this shape:

{{
  "project_summary": "Short analysis of the project",
  "tech_stack": ["Python", "Flask"],
  "roadmap": [
    {{
      "task": "Task name",
      "priority": "high",
      "estimated_hours": 8,
      "description": "Detailed description"
    }}
  ],
  "key_insights": ["Insight 1", "Insight 2"]
}}"#
    )
}

// ============ Response parsing ============

/// Remove a Markdown code fence around model output.
///
/// Takes the text between ```` ```json ```` and the next fence if present,
/// otherwise between the first two plain fences, otherwise the whole text.
pub fn strip_fence(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        let mut parts = text.split("```");
        match (parts.next(), parts.next()) {
            (Some(_), Some(inside)) => inside,
            _ => text,
        }
    };
    inner.trim()
}

#[derive(Deserialize)]
struct RawPlan {
    project_summary: String,
    tech_stack: Vec<String>,
    roadmap: Vec<RawTask>,
    key_insights: Vec<String>,
}

#[derive(Deserialize)]
struct RawTask {
    task: String,
    priority: String,
    estimated_hours: f64,
    description: String,
}

impl RawTask {
    fn into_task(self) -> Result<RoadmapTask, PlanError> {
        let priority: Priority = self.priority.parse().map_err(PlanError::Priority)?;
        if !self.estimated_hours.is_finite() || self.estimated_hours < 0.0 {
            return Err(PlanError::Hours(self.estimated_hours));
        }
        Ok(RoadmapTask {
            task: self.task,
            priority,
            estimated_hours: self.estimated_hours.round() as u32,
            description: self.description,
        })
    }
}

/// Parse model output into a plan with `similar_projects_found` filled in.
pub fn parse_plan(text: &str, similar_projects_found: usize) -> Result<RoadmapPlan, PlanError> {
    let raw: RawPlan = serde_json::from_str(strip_fence(text))?;

    if raw.project_summary.trim().is_empty() {
        return Err(PlanError::Empty("project_summary"));
    }
    if raw.tech_stack.is_empty() {
        return Err(PlanError::Empty("tech_stack"));
    }

    let roadmap = raw
        .roadmap
        .into_iter()
        .map(RawTask::into_task)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RoadmapPlan {
        project_summary: raw.project_summary,
        tech_stack: raw.tech_stack,
        roadmap,
        similar_projects_found,
        key_insights: raw.key_insights,
    })
}

/// The plan returned whenever generation does not produce a usable one.
pub fn fallback_plan(title: &str, similar_projects_found: usize) -> RoadmapPlan {
    RoadmapPlan {
        project_summary: format!("{}: baseline plan", title),
        tech_stack: vec!["Python".to_string()],
        roadmap: vec![RoadmapTask {
            task: "Set up project structure".to_string(),
            priority: Priority::High,
            estimated_hours: 16,
            description: "Create the basic file and module layout".to_string(),
        }],
        similar_projects_found,
        key_insights: vec![
            "Start simple".to_string(),
            "Iterate incrementally".to_string(),
        ],
    }
}

// ============ Synthesizer ============

pub struct RoadmapPlanner {
    generator: Arc<dyn Generator>,
}

impl RoadmapPlanner {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Build a plan for the idea. Never fails; see [`PlanOrigin`].
    pub async fn synthesize(
        &self,
        title: &str,
        description: &str,
        projects: &[SimilarProject],
    ) -> (RoadmapPlan, PlanOrigin) {
        let prompt = build_prompt(title, description, projects);
        let found = projects.len();

        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model = self.generator.model_name(), error = %e, "generation failed; using fallback plan");
                return (fallback_plan(title, found), PlanOrigin::Fallback);
            }
        };

        match parse_plan(&text, found) {
            Ok(plan) => {
                info!(tasks = plan.roadmap.len(), "roadmap generated");
                (plan, PlanOrigin::Generated)
            }
            Err(e) => {
                warn!(error = %e, "unusable model output; using fallback plan");
                (fallback_plan(title, found), PlanOrigin::Fallback)
            }
        }
    }
}

/// Validate, gather similar projects, and synthesize.
pub async fn plan_project(
    pipeline: &SearchPipeline,
    planner: &RoadmapPlanner,
    request: &PlanRequest,
    snippet_chars: usize,
) -> Result<(RoadmapPlan, PlanOrigin), ValidationError> {
    request.validate()?;

    let projects: Vec<SimilarProject> = if request.include_similar_projects {
        let search = SearchRequest::new(request.search_query(), request.max_similar_projects)?;
        pipeline
            .search_repositories(&search)
            .await
            .iter()
            .take(request.max_similar_projects)
            .map(|repo| SimilarProject::from_repository(repo, snippet_chars))
            .collect()
    } else {
        Vec::new()
    };

    info!(
        title = %request.title,
        similar_projects = projects.len(),
        "synthesizing roadmap"
    );
    Ok(planner
        .synthesize(&request.title, &request.description, &projects)
        .await)
}
