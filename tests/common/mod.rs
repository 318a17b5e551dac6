//! Shared fakes for the integration tests.
//!
//! Every collaborator is injected through [`Providers`], so no test touches
//! the network or needs credentials.

#![allow(dead_code)]

use async_trait::async_trait;
use chunk_admin::config::Config;
use chunk_admin::error::{ChunkError, Result};
use chunk_admin::embedding::EmbeddingProvider;
use chunk_admin::llm::LanguageModel;
use chunk_admin::providers::Providers;
use chunk_admin::store::memory::InMemoryVectorStore;
use chunk_admin::store::{Match, QueryRequest, Record, VectorStore};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn no_env(_: &str) -> Option<String> {
    None
}

// ─── Embedder ───────────────────────────────────────────────────────

/// Records every text it embeds. Vectors are `[1.0, len(text)]`.
#[derive(Default)]
pub struct FakeEmbedder {
    pub texts: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeEmbedder {
    pub fn vector_for(text: &str) -> Vec<f32> {
        vec![1.0, text.len() as f32]
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChunkError::upstream("voyage", "HTTP 500: boom"));
        }
        Ok(Self::vector_for(text))
    }
}

// ─── Vector store ───────────────────────────────────────────────────

/// In-memory store that remembers every query it receives and can be made
/// to fail individual operations.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryVectorStore,
    pub queries: Mutex<Vec<QueryRequest>>,
    pub calls: AtomicUsize,
    pub fail_query: AtomicBool,
    pub fail_upsert: AtomicBool,
}

impl RecordingStore {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            inner: InMemoryVectorStore::with_records(records),
            ..Default::default()
        }
    }

    pub fn last_query(&self) -> Option<QueryRequest> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Match>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(request.clone());
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(ChunkError::upstream("pinecone", "HTTP 503: unavailable"));
        }
        self.inner.query(request).await
    }

    async fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(ids).await
    }

    async fn upsert(&self, records: &[Record]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(ChunkError::upstream("pinecone", "HTTP 500: write failed"));
        }
        self.inner.upsert(records).await
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(ids).await
    }

    async fn describe_index_stats(&self) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.describe_index_stats().await
    }
}

// ─── Language model ─────────────────────────────────────────────────

/// Echoes the line it was asked about as `"rewritten: <line>"`, padded with
/// whitespace. Lines listed in `delays` sleep first; lines in `blank` get a
/// whitespace-only reply.
#[derive(Default)]
pub struct FakeModel {
    pub delays: HashMap<String, u64>,
    pub blank: Vec<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

fn line_of(prompt: &str) -> String {
    prompt
        .rsplit_once("Content to process: \"")
        .map(|(_, rest)| rest.trim_end_matches('"').to_string())
        .unwrap_or_default()
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let line = line_of(prompt);
        if let Some(ms) = self.delays.get(&line) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.blank.contains(&line) {
            return Ok("   \n".to_string());
        }
        Ok(format!("  rewritten: {}\n", line))
    }
}

// ─── Builders ───────────────────────────────────────────────────────

pub struct Harness {
    pub providers: Arc<Providers>,
    pub embedder: Arc<FakeEmbedder>,
    pub store: Arc<RecordingStore>,
    pub model: Arc<FakeModel>,
}

pub fn harness(records: Vec<Record>) -> Harness {
    harness_with_model(records, FakeModel::default())
}

pub fn harness_with_model(records: Vec<Record>, model: FakeModel) -> Harness {
    let embedder = Arc::new(FakeEmbedder::default());
    let store = Arc::new(RecordingStore::with_records(records));
    let model = Arc::new(model);
    let providers = Providers::with_env(Arc::new(Config::default()), no_env)
        .with_embedder(embedder.clone())
        .with_vector_store(store.clone())
        .with_language_model(model.clone());
    Harness {
        providers: Arc::new(providers),
        embedder,
        store,
        model,
    }
}

/// A stored chunk whose vector is `[1.0, 0.0]`, so every record scores the
/// same against any query and results come back in insertion order.
pub fn record(id: &str, module: &str, name: &str, path: &str, content: &str) -> Record {
    record_with_values(id, module, name, path, content, vec![1.0, 0.0])
}

pub fn record_with_values(
    id: &str,
    module: &str,
    name: &str,
    path: &str,
    content: &str,
    values: Vec<f32>,
) -> Record {
    let metadata = json!({
        "module": module,
        "name": name,
        "path": path,
        "pageContent": content,
        "text": content,
        "tags": ["seed"],
    });
    Record {
        id: id.to_string(),
        values,
        metadata: as_map(metadata),
    }
}

pub fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {}", other),
    }
}
