//! # Project Scout
//!
//! Fan-out search across code, paper, and web sources, with optional
//! LLM-backed project roadmaps.
//!
//! One query goes to every enabled source at once (GitHub, arXiv, Semantic
//! Scholar, and a web search). Whatever comes back in time is normalized,
//! merged, ranked, and returned; a source that fails or times out simply
//! contributes nothing. Planning requests reuse the repository side of that
//! pipeline, attach READMEs, and ask a generative model for a roadmap.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌────────┐   ┌──────────┐
//! │   Sources    │──▶│  fan_out │──▶│ merge  │──▶│  Ranker  │
//! │ GH/arXiv/... │   │ +timeout │   │        │   │          │
//! └──────────────┘   └──────────┘   └────────┘   └────┬─────┘
//!                                                     ▼
//!                    ┌──────────┐   ┌──────────┐  ┌──────────┐
//!                    │ Planner  │◀──│ Enricher │◀─│ truncate │
//!                    │ (Gemini) │   │ (README) │  └──────────┘
//!                    └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! scout sources                          # show enabled sources
//! scout search "vector database"         # one aggregated search
//! scout plan --title chatbot             # roadmap for an idea
//! scout serve                            # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`models`] | Core data types |
//! | [`error`] | Typed source and validation errors |
//! | [`traits`] | Source adapter trait and registry |
//! | [`cache`] | TTL result cache |
//! | [`connector_github`] | GitHub repositories and READMEs |
//! | [`connector_arxiv`] | arXiv preprints |
//! | [`connector_scholar`] | Semantic Scholar papers |
//! | [`connector_web`] | Web articles (SerpAPI / DuckDuckGo) |
//! | [`fanout`] | Concurrent fan-out and merge |
//! | [`rank`] | Repository and paper ranking |
//! | [`enrich`] | README enrichment |
//! | [`search`] | The aggregation pipeline |
//! | [`generate`] | Generative model collaborators |
//! | [`planner`] | Roadmap synthesis |
//! | [`sources`] | Source listing |
//! | [`server`] | HTTP server |

pub mod cache;
pub mod config;
pub mod connector_arxiv;
pub mod connector_github;
pub mod connector_scholar;
pub mod connector_web;
pub mod enrich;
pub mod error;
pub mod fanout;
pub mod generate;
pub mod models;
pub mod planner;
pub mod rank;
pub mod search;
pub mod server;
pub mod sources;
pub mod traits;
