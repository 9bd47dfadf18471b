use anyhow::Result;
use serde::Serialize;

use crate::config::{Config, Credentials};
use crate::search::SearchPipeline;
use crate::traits::{AuthMode, SourceRegistry};

/// One registered adapter as reported by `GET /sources` and `scout sources`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    /// `repositories` or `papers`.
    pub kind: &'static str,
    pub description: String,
    pub auth: AuthMode,
}

/// Every registered adapter, repositories first, in registry order.
pub fn get_sources(registry: &SourceRegistry) -> Vec<SourceStatus> {
    let repositories = registry.repositories().iter().map(|a| SourceStatus {
        name: a.name().to_string(),
        kind: "repositories",
        description: a.description().to_string(),
        auth: a.auth_mode(),
    });
    let papers = registry.papers().iter().map(|a| SourceStatus {
        name: a.name().to_string(),
        kind: "papers",
        description: a.description().to_string(),
        auth: a.auth_mode(),
    });
    repositories.chain(papers).collect()
}

pub fn list_sources(config: &Config, credentials: &Credentials) -> Result<()> {
    let pipeline = SearchPipeline::from_config(config, credentials)?;
    let sources = get_sources(pipeline.registry());

    if sources.is_empty() {
        println!("No sources enabled.");
        return Ok(());
    }

    println!("{:<18} {:<14} {:<16} DESCRIPTION", "SOURCE", "KIND", "AUTH");
    for s in &sources {
        let auth = match s.auth {
            AuthMode::Authenticated => "authenticated",
            AuthMode::Unauthenticated => "unauthenticated",
            AuthMode::NotRequired => "not required",
        };
        println!("{:<18} {:<14} {:<16} {}", s.name, s.kind, auth, s.description);
    }

    Ok(())
}
