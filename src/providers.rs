//! Process-scoped collaborator handles.
//!
//! Each client (embedding, vector store, language model) is built on first
//! use and then shared. Builders are pure, so two tasks racing to build the
//! same handle is harmless: the first `set` wins and the other is dropped.
//! A failed build is not cached; a later call tries again.
//!
//! A missing credential only fails the operation that needs it. The server
//! starts without any of them.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::info;

use crate::config::{process_env, Config, EnvLookup, OPENAI_API_KEY, PINECONE_API_KEY};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{ChunkError, Result};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::store::pinecone::PineconeStore;
use crate::store::VectorStore;

pub struct Providers {
    config: Arc<Config>,
    env: EnvLookup,
    embedder: OnceLock<Arc<dyn EmbeddingProvider>>,
    vector_store: OnceLock<Arc<dyn VectorStore>>,
    language_model: OnceLock<Arc<dyn LanguageModel>>,
}

impl Providers {
    /// Handles resolved from `config` and the process environment.
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_env(config, process_env)
    }

    /// Handles resolved from `config` and a custom environment lookup.
    pub fn with_env(config: Arc<Config>, env: EnvLookup) -> Self {
        Self {
            config,
            env,
            embedder: OnceLock::new(),
            vector_store: OnceLock::new(),
            language_model: OnceLock::new(),
        }
    }

    pub fn with_embedder(self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let _ = self.embedder.set(embedder);
        self
    }

    pub fn with_vector_store(self, store: Arc<dyn VectorStore>) -> Self {
        let _ = self.vector_store.set(store);
        self
    }

    pub fn with_language_model(self, model: Arc<dyn LanguageModel>) -> Self {
        let _ = self.language_model.set(model);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        if let Some(existing) = self.embedder.get() {
            return Ok(existing.clone());
        }
        let cfg = &self.config.embedding;
        let api_key = self.require(embedding::api_key_var(cfg))?;
        let client = http_client(cfg.timeout_secs, self.config.proxy.url.as_deref())?;
        let built = embedding::create_provider(cfg, api_key, client)?;
        info!(provider = %cfg.provider, model = %built.model_name(), "embedding client ready");
        Ok(self.embedder.get_or_init(|| built).clone())
    }

    pub fn vector_store(&self) -> Result<Arc<dyn VectorStore>> {
        if let Some(existing) = self.vector_store.get() {
            return Ok(existing.clone());
        }
        let cfg = &self.config.vector_store;
        let api_key = self.require(PINECONE_API_KEY)?;
        let index = cfg
            .index
            .clone()
            .ok_or_else(|| ChunkError::ConfigurationMissing("PINECONE_INDEX".into()))?;
        let client = http_client(cfg.timeout_secs, self.config.proxy.url.as_deref())?;
        let built: Arc<dyn VectorStore> = Arc::new(PineconeStore::new(cfg, index.clone(), api_key, client));
        info!(index = %index, "vector store client ready");
        Ok(self.vector_store.get_or_init(|| built).clone())
    }

    pub fn language_model(&self) -> Result<Arc<dyn LanguageModel>> {
        if let Some(existing) = self.language_model.get() {
            return Ok(existing.clone());
        }
        let cfg = &self.config.llm;
        let api_key = self.require(OPENAI_API_KEY)?;
        let client = http_client(cfg.timeout_secs, self.config.proxy.url.as_deref())?;
        let built: Arc<dyn LanguageModel> = Arc::new(OpenAIChatModel::new(cfg, api_key, client));
        info!(model = %cfg.model, "language model client ready");
        Ok(self.language_model.get_or_init(|| built).clone())
    }

    /// Readiness of each collaborator, without constructing anything.
    pub fn status(&self) -> ProviderStatus {
        let embedding_key = embedding::api_key_var(&self.config.embedding);
        ProviderStatus {
            vector_store: self.vector_store.get().is_some() || self.has(PINECONE_API_KEY),
            index: self.vector_store.get().is_some() || self.config.vector_store.index.is_some(),
            embedding: self.embedder.get().is_some() || self.has(embedding_key),
            llm: self.language_model.get().is_some() || self.has(OPENAI_API_KEY),
        }
    }

    fn has(&self, key: &str) -> bool {
        (self.env)(key).is_some()
    }

    fn require(&self, key: &str) -> Result<String> {
        (self.env)(key).ok_or_else(|| ChunkError::ConfigurationMissing(key.to_string()))
    }
}

/// Which collaborators can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderStatus {
    pub vector_store: bool,
    pub index: bool,
    pub embedding: bool,
    pub llm: bool,
}

/// Shared `reqwest` client construction: per-provider timeout, optional proxy.
pub fn http_client(timeout_secs: u64, proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));
    if let Some(url) = proxy {
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| ChunkError::upstream("http", format!("invalid proxy url '{}': {}", url, e)))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| ChunkError::upstream("http", e))
}
