//! End-to-end tests of the HTTP server with in-memory sources and generators.
//!
//! Each test binds the router to an ephemeral port and drives it with
//! `reqwest`, exercising the same path a real client would take.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use project_scout::enrich::Enricher;
use project_scout::error::SourceError;
use project_scout::generate::{DisabledGenerator, Generator};
use project_scout::models::{PaperItem, PaperSource, RepositoryItem};
use project_scout::planner::RoadmapPlanner;
use project_scout::rank::Ranker;
use project_scout::search::SearchPipeline;
use project_scout::server::{run_server_with_state, AppState};
use project_scout::traits::{AuthMode, ReadmeFetcher, SourceAdapter, SourceRegistry};

// ═══════════════════════════════════════════════════════════════════════
// Fakes
// ═══════════════════════════════════════════════════════════════════════

struct FakeRepos {
    calls: Arc<AtomicUsize>,
}

fn repo(id: u64, stars: u64) -> RepositoryItem {
    RepositoryItem {
        id,
        name: format!("project-{}", id),
        full_name: format!("octo/project-{}", id),
        html_url: format!("https://github.com/octo/project-{}", id),
        description: Some(format!("Project number {}", id)),
        stars,
        forks: 1,
        language: Some("Rust".to_string()),
        updated_at: "2018-03-01T00:00:00Z".to_string(),
        owner: "octo".to_string(),
        readme: None,
    }
}

#[async_trait]
impl SourceAdapter<RepositoryItem> for FakeRepos {
    fn name(&self) -> &str {
        "fake_repos"
    }
    fn description(&self) -> &str {
        "in-memory repositories"
    }
    fn auth_mode(&self) -> AuthMode {
        AuthMode::Authenticated
    }
    async fn fetch(&self, _query: &str, limit: usize) -> Result<Vec<RepositoryItem>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![repo(1, 100), repo(3, 200), repo(2, 50)]
            .into_iter()
            .take(limit)
            .collect())
    }
}

struct FakePapers {
    name: &'static str,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceAdapter<PaperItem> for FakePapers {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "in-memory papers"
    }
    async fn fetch(&self, query: &str, _limit: usize) -> Result<Vec<PaperItem>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Status(503));
        }
        Ok(vec![PaperItem {
            id: format!("{}-1", self.name),
            title: format!("A study of {}", query),
            authors: vec!["Ada Lovelace".to_string()],
            abstract_text: None,
            published: Some("2024".to_string()),
            url: format!("https://{}.example/1", self.name),
            source: PaperSource::Arxiv,
        }])
    }
}

struct FakeReadmes;

#[async_trait]
impl ReadmeFetcher for FakeReadmes {
    async fn fetch_readme(&self, _owner: &str, name: &str) -> Result<Option<String>, SourceError> {
        if name == "project-2" {
            return Err(SourceError::Status(500));
        }
        Ok(Some(format!("# {}\n{}", name, "x".repeat(3000))))
    }
}

/// Returns a fixed plan and records the prompt it was given.
struct ScriptedGenerator {
    prompts: Arc<std::sync::Mutex<Vec<String>>>,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(r#"```json
{
  "project_summary": "Portfolio chatbot",
  "tech_stack": ["Rust"],
  "roadmap": [
    { "task": "Scaffold", "priority": "Medium", "estimated_hours": 3, "description": "cargo new" }
  ],
  "key_insights": ["Reuse project-3"]
}
```"#
            .to_string())
    }
}

/// Panics mid-call, standing in for a bug inside planning.
struct PanickingGenerator;

#[async_trait]
impl Generator for PanickingGenerator {
    fn model_name(&self) -> &str {
        "panicking"
    }
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        panic!("generator blew up");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════════════════

struct Harness {
    base: String,
    repo_calls: Arc<AtomicUsize>,
    paper_calls: Arc<AtomicUsize>,
}

async fn start(generator: Arc<dyn Generator>) -> Harness {
    let repo_calls = Arc::new(AtomicUsize::new(0));
    let paper_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = SourceRegistry::new();
    registry.register_repositories(Arc::new(FakeRepos {
        calls: repo_calls.clone(),
    }));
    for (name, fail) in [("alpha", true), ("beta", false), ("gamma", true)] {
        registry.register_papers(Arc::new(FakePapers {
            name,
            fail,
            calls: paper_calls.clone(),
        }));
    }

    let pipeline = SearchPipeline::new(
        Arc::new(registry),
        Ranker::default(),
        Duration::from_secs(5),
    )
    .with_enricher(Enricher::new(Arc::new(FakeReadmes), 2));
    let state = AppState::new(Arc::new(pipeline), Arc::new(RoadmapPlanner::new(generator)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        run_server_with_state(listener, state).await.unwrap();
    });

    Harness {
        base,
        repo_calls,
        paper_calls,
    }
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post_json(url: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ═══════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn health_and_root() {
    let h = start(Arc::new(DisabledGenerator)).await;

    let (status, body) = get_json(&format!("{}/health", h.base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = get_json(&format!("{}/", h.base)).await;
    assert_eq!(status, 200);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn search_survives_two_failing_sources() {
    let h = start(Arc::new(DisabledGenerator)).await;

    let (status, body) = get_json(&format!("{}/search?query=graphs&max_results=2", h.base)).await;
    assert_eq!(status, 200);

    let repos = body["repositories"].as_array().unwrap();
    let stars: Vec<u64> = repos.iter().map(|r| r["stars"].as_u64().unwrap()).collect();
    assert_eq!(stars, vec![200, 100]);
    assert!(repos[0]["readme"].as_str().unwrap().starts_with("# project-3"));

    let papers = body["papers"].as_array().unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0]["id"], "beta-1");
    assert_eq!(papers[0]["source"], "arxiv");
    assert_eq!(h.paper_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn search_validation_happens_before_fan_out() {
    let h = start(Arc::new(DisabledGenerator)).await;

    for query in [
        "query=rust&max_results=0",
        "query=rust&max_results=101",
        "query=rust&max_results=lots",
        "query=&max_results=5",
        "max_results=5",
    ] {
        let (status, body) = get_json(&format!("{}/search?{}", h.base, query)).await;
        assert_eq!(status, 400, "expected 400 for {}", query);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["message"].is_string());
    }

    assert_eq!(h.repo_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.paper_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sources_lists_registry_in_order() {
    let h = start(Arc::new(DisabledGenerator)).await;
    let (status, body) = get_json(&format!("{}/sources", h.base)).await;
    assert_eq!(status, 200);

    let sources = body["sources"].as_array().unwrap();
    let names: Vec<&str> = sources.iter().map(|s| s["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["fake_repos", "alpha", "beta", "gamma"]);
    assert_eq!(sources[0]["kind"], "repositories");
    assert_eq!(sources[0]["auth"], "authenticated");
    assert_eq!(sources[1]["auth"], "not_required");
}

#[tokio::test]
async fn plan_create_uses_generated_plan_and_snippet_cap() {
    let prompts = Arc::new(std::sync::Mutex::new(Vec::new()));
    let h = start(Arc::new(ScriptedGenerator {
        prompts: prompts.clone(),
    }))
    .await;

    let (status, body) = post_json(
        &format!("{}/plan/create", h.base),
        serde_json::json!({ "title": "chatbot", "description": "portfolio" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["project_summary"], "Portfolio chatbot");
    assert_eq!(body["roadmap"][0]["priority"], "medium");
    assert_eq!(body["similar_projects_found"], 3);
    assert_eq!(h.paper_calls.load(Ordering::SeqCst), 0);

    let prompt = prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Project title: chatbot"));
    assert!(prompt.contains("\"language\": \"Rust\""));
    assert!(!prompt.contains(&"x".repeat(1000)));
}

#[tokio::test]
async fn plan_from_search_falls_back_when_generation_fails() {
    let h = start(Arc::new(DisabledGenerator)).await;

    let (status, body) = post_json(
        &format!("{}/plan/from-search", h.base),
        serde_json::json!({
            "title": "chatbot",
            "description": "portfolio",
            "max_similar_projects": 2
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["project_summary"], "chatbot: baseline plan");
    assert_eq!(body["tech_stack"], serde_json::json!(["Python"]));
    assert_eq!(
        body["key_insights"],
        serde_json::json!(["Start simple", "Iterate incrementally"])
    );
    assert_eq!(body["similar_projects_found"], 2);
}

#[tokio::test]
async fn plan_without_similar_projects_skips_search() {
    let h = start(Arc::new(DisabledGenerator)).await;

    let (status, body) = post_json(
        &format!("{}/plan/create", h.base),
        serde_json::json!({ "title": "chatbot", "include_similar_projects": false }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["similar_projects_found"], 0);
    assert_eq!(h.repo_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn plan_validation_errors() {
    let h = start(Arc::new(DisabledGenerator)).await;

    for body in [
        serde_json::json!({ "title": "" }),
        serde_json::json!({ "title": "bot", "max_similar_projects": 0 }),
        serde_json::json!({ "title": "bot", "max_similar_projects": 21 }),
        serde_json::json!({ "description": "no title" }),
    ] {
        let (status, resp) = post_json(&format!("{}/plan/create", h.base), body.clone()).await;
        assert_eq!(status, 400, "expected 400 for {}", body);
        assert_eq!(resp["error"]["code"], "bad_request");
    }
    assert_eq!(h.repo_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn plan_example_and_unknown_route() {
    let h = start(Arc::new(DisabledGenerator)).await;

    let (status, body) = get_json(&format!("{}/plan/example", h.base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["example"]["title"], "chatbot");
    assert_eq!(body["example"]["max_similar_projects"], 5);
    assert!(body["usage"].as_str().unwrap().contains("/plan/create"));

    let (status, body) = get_json(&format!("{}/nope", h.base)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn plan_panic_becomes_internal_error() {
    let h = start(Arc::new(PanickingGenerator)).await;

    let (status, body) = post_json(
        &format!("{}/plan/create", h.base),
        serde_json::json!({ "title": "chatbot", "include_similar_projects": false }),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "internal");
    assert!(body["error"]["message"].is_string());

    let (status, _) = get_json(&format!("{}/health", h.base)).await;
    assert_eq!(status, 200);
}
