//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/sources` | Registered sources and their auth mode |
//! | `GET`  | `/search?query=&max_results=` | Aggregated repositories and papers |
//! | `POST` | `/plan/create` | Roadmap from an idea (1000-char README snippets) |
//! | `POST` | `/plan/from-search` | Roadmap from an idea (2000-char README snippets) |
//! | `GET`  | `/plan/example` | Example plan request |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Provider failures never reach this layer; they show up as missing
//! results instead.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::{Config, Credentials};
use crate::error::ValidationError;
use crate::generate::create_generator;
use crate::models::{AggregatedResult, RoadmapPlan};
use crate::planner::{
    plan_project, PlanRequest, RoadmapPlanner, CREATE_SNIPPET_CHARS, FROM_SEARCH_SNIPPET_CHARS,
};
use crate::search::{SearchPipeline, SearchRequest};
use crate::sources::{get_sources, SourceStatus};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<SearchPipeline>,
    planner: Arc<RoadmapPlanner>,
}

impl AppState {
    pub fn new(pipeline: Arc<SearchPipeline>, planner: Arc<RoadmapPlanner>) -> Self {
        Self { pipeline, planner }
    }
}

/// Starts the HTTP server on `[server].bind`.
///
/// Fails before binding if the planner provider is `gemini` and
/// `GEMINI_API_KEY` is not set.
pub async fn run_server(config: &Config, credentials: &Credentials) -> anyhow::Result<()> {
    let pipeline = SearchPipeline::from_config(config, credentials)?;
    let generator = create_generator(&config.planner, credentials)?;
    let state = AppState::new(
        Arc::new(pipeline),
        Arc::new(RoadmapPlanner::new(generator)),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    run_server_with_state(listener, state).await
}

/// Serve `state` on an already bound listener.
///
/// Lets callers bring their own adapters and generator, or bind to an
/// ephemeral port.
pub async fn run_server_with_state(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> anyhow::Result<()> {
    let sources = state.pipeline.registry().len();
    info!(addr = %listener.local_addr()?, sources, "server listening");
    println!("Project Scout listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/sources", get(handle_sources))
        .route("/search", get(handle_search))
        .route("/plan/create", post(handle_plan_create))
        .route("/plan/from-search", post(handle_plan_from_search))
        .route("/plan/example", get(handle_plan_example))
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        bad_request(err.to_string())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

async fn handle_not_found() -> AppError {
    not_found("no such endpoint")
}

// ============ GET / and GET /health ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Project Scout: multi-source search and project roadmaps".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
}

async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: get_sources(state.pipeline.registry()),
    })
}

// ============ GET /search ============

/// Raw query string. Parsed by hand so that bad values get the JSON error body.
#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
    max_results: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<AggregatedResult>, AppError> {
    let max_results = match params.max_results.as_deref() {
        None => state.pipeline.default_max_results(),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| bad_request(format!("max_results must be an integer, got '{}'", raw)))?,
    };
    let request = SearchRequest::new(params.query.unwrap_or_default(), max_results)?;

    Ok(Json(state.pipeline.search(&request).await))
}

// ============ POST /plan/* ============

async fn handle_plan_create(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<RoadmapPlan>, AppError> {
    plan(state, payload, CREATE_SNIPPET_CHARS).await
}

async fn handle_plan_from_search(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<RoadmapPlan>, AppError> {
    plan(state, payload, FROM_SEARCH_SNIPPET_CHARS).await
}

/// Runs planning on its own task so that a panic anywhere in the chain
/// becomes a 500 instead of a dropped connection.
async fn plan(
    state: AppState,
    payload: Result<Json<PlanRequest>, JsonRejection>,
    snippet_chars: usize,
) -> Result<Json<RoadmapPlan>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;
    request.validate()?;

    let handle = tokio::spawn(async move {
        plan_project(&state.pipeline, &state.planner, &request, snippet_chars).await
    });

    match handle.await {
        Ok(Ok((plan, origin))) => {
            info!(?origin, "plan ready");
            Ok(Json(plan))
        }
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            error!(error = %e, "planning task failed");
            Err(internal(format!("planning failed: {}", e)))
        }
    }
}

// ============ GET /plan/example ============

#[derive(Serialize)]
struct PlanExampleResponse {
    example: PlanRequest,
    usage: String,
}

async fn handle_plan_example() -> Json<PlanExampleResponse> {
    Json(PlanExampleResponse {
        example: PlanRequest::example(),
        usage: "POST /plan/create or /plan/from-search with this JSON body".to_string(),
    })
}
