//! Language-model client used by the query processor.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::LlmConfig;
use crate::embedding::post_json;
use crate::error::{ChunkError, Result};

const PROVIDER: &str = "openai";

/// Single-prompt text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI chat-completions model, prompted with a single user message.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
    base_url: String,
}

impl OpenAIChatModel {
    pub fn new(config: &LlmConfig, api_key: String, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "chat completion");
        let body = self.request_body(prompt);
        let json = post_json(
            &self.client,
            PROVIDER,
            &format!("{}/chat/completions", self.base_url),
            &self.api_key,
            &body,
        )
        .await?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_chat_response(json: &Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ChunkError::upstream(PROVIDER, "response is missing choices[0].message.content")
        })
}
