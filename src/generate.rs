//! Generative model collaborators for roadmap synthesis.
//!
//! Defines the [`Generator`] trait and its implementations:
//! - **[`DisabledGenerator`]**: always errors; every plan becomes the fallback plan.
//! - **[`GeminiGenerator`]**: calls the Gemini `generateContent` API.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use project_scout::config::{Credentials, PlannerConfig};
//! # use project_scout::generate::create_generator;
//! let mut config = PlannerConfig::default();
//! config.provider = "disabled".to_string();
//! let generator = create_generator(&config, &Credentials::default()).unwrap();
//! assert_eq!(generator.model_name(), "disabled");
//! ```
//!
//! A single call is made per plan. Failures are not retried; the planner
//! falls back instead.

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Credentials, PlannerConfig};

/// A text-in, text-out model call.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Pick the generator named by `planner.provider`.
///
/// # Errors
///
/// Fails when the provider is `gemini` and `GEMINI_API_KEY` is missing.
pub fn create_generator(
    config: &PlannerConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "gemini" => Ok(Arc::new(GeminiGenerator::new(
            config,
            credentials.gemini_api_key.clone(),
        )?)),
        other => bail!("Unknown planner provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Planner provider is disabled")
    }
}

// ============ Gemini ============

/// Gemini `models/{model}:generateContent` client.
///
/// The key travels in the `x-goog-api-key` header so it never appears in
/// request URLs or the error text derived from them.
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    /// # Errors
    ///
    /// Returns an error if no API key is given.
    pub fn new(config: &PlannerConfig, api_key: Option<String>) -> Result<Self> {
        let Some(api_key) = api_key else {
            bail!("GEMINI_API_KEY environment variable not set");
        };

        let mut key = HeaderValue::from_str(&api_key)?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, text);
        }

        let parsed: GenerateResponse = resp.json().await.map_err(reqwest::Error::without_url)?;
        candidate_text(parsed)
    }
}

fn candidate_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        bail!("Gemini response contained no text");
    }
    Ok(text)
}
