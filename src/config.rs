use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variables holding provider credentials. They are read at
/// first use of the matching collaborator, never from the config file.
pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const VOYAGE_API_KEY: &str = "VOYAGE_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Lookup used for environment access; swapped out in tests.
pub type EnvLookup = fn(&str) -> Option<String>;

/// Reads a variable from the process environment, treating empty values as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
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
    "0.0.0.0:3102".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_page")]
    pub default_page: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Upper bound for the widened `topK` of a filter-only query.
    #[serde(default = "default_max_filter_top_k")]
    pub max_filter_top_k: usize,
    /// Text embedded to obtain a vector when a query carries only filters.
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            default_page: default_page(),
            default_page_size: default_page_size(),
            max_filter_top_k: default_max_filter_top_k(),
            placeholder_text: default_placeholder_text(),
        }
    }
}

fn default_top_k() -> usize {
    100
}
fn default_page() -> usize {
    1
}
fn default_page_size() -> usize {
    20
}
fn default_max_filter_top_k() -> usize {
    1000
}
fn default_placeholder_text() -> String {
    "document".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_input_type")]
    pub input_type: String,
    #[serde(default = "default_true")]
    pub truncation: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            input_type: default_input_type(),
            truncation: true,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "voyage".to_string()
}
fn default_embedding_model() -> String {
    "voyage-3".to_string()
}
fn default_input_type() -> String {
    "document".to_string()
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub index: Option<String>,
    /// Data-plane host; when absent it is discovered through the control plane.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            index: None,
            host: None,
            namespace: None,
            control_plane_url: default_control_plane_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    #[serde(default)]
    pub url: Option<String>,
}

impl Config {
    /// Overlay the recognized environment variables on top of file values.
    pub fn apply_env(&mut self, env: EnvLookup) {
        if let Some(port) = env("PORT") {
            self.server.bind = with_port(&self.server.bind, &port);
        }
        if let Some(index) = env("PINECONE_INDEX") {
            self.vector_store.index = Some(index);
        }
        if let Some(host) = env("PINECONE_HOST") {
            self.vector_store.host = Some(host);
        }
        if let Some(namespace) = env("PINECONE_NAMESPACE") {
            self.vector_store.namespace = Some(namespace);
        }
        if let Some(model) = env("VOYAGE_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(model) = env("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = ["HTTP_PROXY", "HTTPS_PROXY", "PROXY_URL"]
            .iter()
            .find_map(|key| env(key))
        {
            self.proxy.url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.default_top_k == 0 {
            anyhow::bail!("query.default_top_k must be >= 1");
        }
        if self.query.default_page == 0 {
            anyhow::bail!("query.default_page must be >= 1");
        }
        if self.query.default_page_size == 0 {
            anyhow::bail!("query.default_page_size must be >= 1");
        }
        if self.query.max_filter_top_k == 0 {
            anyhow::bail!("query.max_filter_top_k must be >= 1");
        }
        if self.query.placeholder_text.trim().is_empty() {
            anyhow::bail!("query.placeholder_text must not be empty");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }

        if let Some(url) = &self.proxy.url {
            if let Err(e) = reqwest::Proxy::all(url.as_str()) {
                anyhow::bail!("proxy url '{}' is invalid: {}", url, e);
            }
        }

        match self.embedding.provider.as_str() {
            "voyage" | "openai" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be voyage or openai.",
                other
            ),
        }

        Ok(())
    }
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind: &str, port: &str) -> String {
    match bind.rsplit_once(':') {
        Some((host, _)) => format!("{}:{}", host, port),
        None => format!("{}:{}", bind, port),
    }
}

pub fn load_config(path: &Path, env: EnvLookup) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_env(env);
    config.validate()?;
    Ok(config)
}

/// Configuration from defaults and environment only, for runs without a file.
pub fn env_config(env: EnvLookup) -> Result<Config> {
    let mut config = Config::default();
    config.apply_env(env);
    config.validate()?;
    Ok(config)
}
