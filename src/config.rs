use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub attach_readmes: bool,
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: default_max_results(),
            adapter_timeout_secs: default_adapter_timeout_secs(),
            attach_readmes: true,
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

impl SearchConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }
}

fn default_max_results() -> usize {
    10
}
fn default_adapter_timeout_secs() -> u64 {
    15
}
fn default_enrich_concurrency() -> usize {
    4
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    3600
}
fn default_max_entries() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub github: GithubSourceConfig,
    #[serde(default)]
    pub arxiv: ArxivSourceConfig,
    #[serde(default)]
    pub semantic_scholar: ScholarSourceConfig,
    #[serde(default)]
    pub web: WebSourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_github_url")]
    pub base_url: String,
}

impl Default for GithubSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_github_url(),
        }
    }
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArxivSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_arxiv_url")]
    pub base_url: String,
}

impl Default for ArxivSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_arxiv_url(),
        }
    }
}

fn default_arxiv_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScholarSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_scholar_url")]
    pub base_url: String,
}

impl Default for ScholarSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_scholar_url(),
        }
    }
}

fn default_scholar_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_serpapi_url")]
    pub serpapi_url: String,
    #[serde(default = "default_duckduckgo_url")]
    pub duckduckgo_url: String,
}

impl Default for WebSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            serpapi_url: default_serpapi_url(),
            duckduckgo_url: default_duckduckgo_url(),
        }
    }
}

fn default_serpapi_url() -> String {
    "https://serpapi.com/search".to_string()
}
fn default_duckduckgo_url() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlannerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_planner_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_gemini_url(),
            timeout_secs: default_planner_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_planner_timeout_secs() -> u64 {
    60
}

/// Provider credentials, read once from the environment at startup.
///
/// Every key is optional here; whether a missing key is fatal is decided
/// by the component that consumes it.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub semantic_scholar_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            github_token: non_empty_env("GITHUB_TOKEN"),
            semantic_scholar_key: non_empty_env("SEMANTIC_SCHOLAR_KEY"),
            serpapi_key: non_empty_env("SERPAPI_KEY"),
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load and validate the configuration file.
///
/// A missing file is not an error: every section has defaults, so the
/// service can run with no configuration at all.
pub fn load_config(path: &Path) -> Result<Config> {
    let config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(1..=100).contains(&config.search.default_max_results) {
        anyhow::bail!("search.default_max_results must be in [1, 100]");
    }
    if config.search.adapter_timeout_secs == 0 {
        anyhow::bail!("search.adapter_timeout_secs must be > 0");
    }
    if config.search.enrich_concurrency == 0 {
        anyhow::bail!("search.enrich_concurrency must be > 0");
    }
    if config.cache.max_entries == 0 {
        anyhow::bail!("cache.max_entries must be > 0");
    }

    match config.planner.provider.as_str() {
        "gemini" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown planner provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    Ok(())
}
