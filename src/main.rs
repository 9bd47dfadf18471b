//! # Project Scout CLI (`scout`)
//!
//! ## Usage
//!
//! ```bash
//! scout --config ./config/scout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout serve` | Start the HTTP server |
//! | `scout search "<query>"` | Run one aggregated search |
//! | `scout plan --title <title>` | Generate a project roadmap |
//! | `scout sources` | List enabled sources and their auth mode |
//!
//! Credentials come from the environment: `GITHUB_TOKEN`,
//! `SEMANTIC_SCHOLAR_KEY`, `SERPAPI_KEY`, `GEMINI_API_KEY`.
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use project_scout::config::{self, Credentials};
use project_scout::generate::create_generator;
use project_scout::planner::{
    plan_project, PlanOrigin, PlanRequest, RoadmapPlanner, CREATE_SNIPPET_CHARS,
};
use project_scout::search::{self, SearchPipeline};
use project_scout::{server, sources};

/// Project Scout: search code, papers, and the web at once, and turn
/// project ideas into roadmaps.
#[derive(Parser)]
#[command(name = "scout", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/scout.toml`. A missing file means built-in
    /// defaults for every setting.
    #[arg(long, global = true, default_value = "./config/scout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Run one aggregated search and print the results.
    Search {
        /// The search query string.
        query: String,

        /// Results per list (1-100). Defaults to `[search].default_max_results`.
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Generate a roadmap for a project idea and print it as JSON.
    Plan {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// How many similar repositories to consult (1-20).
        #[arg(long, default_value_t = 5)]
        max_similar: usize,

        /// Do not look for similar repositories.
        #[arg(long)]
        no_similar: bool,
    },

    /// List enabled sources and their auth mode.
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let credentials = Credentials::from_env();

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg, &credentials).await?;
        }
        Commands::Search { query, max_results } => {
            search::run_search(&cfg, &credentials, &query, max_results).await?;
        }
        Commands::Plan {
            title,
            description,
            max_similar,
            no_similar,
        } => {
            let pipeline = SearchPipeline::from_config(&cfg, &credentials)?;
            let planner = RoadmapPlanner::new(create_generator(&cfg.planner, &credentials)?);
            let request = PlanRequest {
                title,
                description,
                include_similar_projects: !no_similar,
                max_similar_projects: max_similar,
            };

            let (plan, origin) =
                plan_project(&pipeline, &planner, &request, CREATE_SNIPPET_CHARS).await?;
            if origin == PlanOrigin::Fallback {
                eprintln!("note: model output unavailable; showing the baseline plan");
            }
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Sources => {
            sources::list_sources(&cfg, &credentials)?;
        }
    }

    Ok(())
}
