//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and two HTTP-backed providers:
//! - **[`VoyageProvider`]**: calls the Voyage AI embeddings API (default).
//! - **[`OpenAIProvider`]**: calls the OpenAI embeddings API.
//!
//! Also provides [`cosine_similarity`], used by the in-memory vector store.
//!
//! # Provider Selection
//!
//! | Config Value | Provider | Credential |
//! |-------------|----------|------------|
//! | `"voyage"` | [`VoyageProvider`] | `VOYAGE_API_KEY` |
//! | `"openai"` | [`OpenAIProvider`] | `OPENAI_API_KEY` |
//!
//! Each call is a single request. Errors are returned to the caller as
//! [`ChunkError::Upstream`] without retry.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::config::{EmbeddingConfig, OPENAI_API_KEY, VOYAGE_API_KEY};
use crate::error::{ChunkError, Result};

const VOYAGE_BASE_URL: &str = "https://api.voyageai.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"voyage-3"`).
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Environment variable holding the credential for the configured provider.
pub fn api_key_var(config: &EmbeddingConfig) -> &'static str {
    match config.provider.as_str() {
        "openai" => OPENAI_API_KEY,
        _ => VOYAGE_API_KEY,
    }
}

/// Create the configured provider.
///
/// Construction is pure; no request is made until [`EmbeddingProvider::embed`].
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: String,
    client: reqwest::Client,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "voyage" => Ok(Arc::new(VoyageProvider::new(config, api_key, client))),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config, api_key, client))),
        other => Err(ChunkError::invalid(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Voyage Provider ============

/// Embedding provider using the Voyage AI API.
///
/// Calls `POST /v1/embeddings` with the configured model, `input_type`
/// and truncation flag.
pub struct VoyageProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    input_type: String,
    truncation: bool,
    base_url: String,
}

impl VoyageProvider {
    pub fn new(config: &EmbeddingConfig, api_key: String, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key,
            model: config.model.clone(),
            input_type: config.input_type.clone(),
            truncation: config.truncation,
            base_url: base_url(config, VOYAGE_BASE_URL),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "voyage", model = %self.model, text_len = text.len(), "embedding text");
        let body = json!({
            "input": [text],
            "model": self.model,
            "input_type": self.input_type,
            "truncation": self.truncation,
        });
        let json = post_json(
            &self.client,
            "voyage",
            &format!("{}/embeddings", self.base_url),
            &self.api_key,
            &body,
        )
        .await?;
        parse_embedding_response("voyage", &json)
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig, api_key: String, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: base_url(config, OPENAI_BASE_URL),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "openai", model = %self.model, text_len = text.len(), "embedding text");
        let body = json!({
            "model": self.model,
            "input": [text],
        });
        let json = post_json(
            &self.client,
            "openai",
            &format!("{}/embeddings", self.base_url),
            &self.api_key,
            &body,
        )
        .await?;
        parse_embedding_response("openai", &json)
    }
}

fn base_url(config: &EmbeddingConfig, default: &str) -> String {
    config
        .base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// POST a JSON body with bearer auth and decode the JSON reply.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: &str,
    body: &Value,
) -> Result<Value> {
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| ChunkError::upstream(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(ChunkError::upstream(
            provider,
            format!("HTTP {}: {}", status, body_text),
        ));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ChunkError::upstream(provider, format!("invalid response: {}", e)))
}

/// Extract `data[0].embedding`, the shape shared by Voyage and OpenAI.
fn parse_embedding_response(provider: &str, json: &Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|items| items.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| ChunkError::upstream(provider, "response is missing data[0].embedding"))?;

    let vec: Vec<f32> = embedding
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ChunkError::upstream(provider, "non-numeric embedding value"))?;

    if vec.is_empty() {
        return Err(ChunkError::upstream(provider, "API returned an empty embedding"));
    }
    Ok(vec)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors of
/// different lengths.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
