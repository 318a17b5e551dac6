//! In-memory [`VectorStore`] implementation for tests and local runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, so insertion order is
//! preserved. Query is brute-force cosine similarity; ties keep insertion
//! order. Filters are evaluated with the same exact-match rule the hosted
//! index applies.
//!
//! `chunk-admin serve --in-memory --seed chunks.json` loads a JSON array of
//! `{"id", "values"?, "pageContent"?, "metadata"?}` objects with
//! [`load_seed`]. Seeds without `values` get a vector when their content
//! is next updated.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::embedding::cosine_similarity;
use crate::error::{ChunkError, Result};
use crate::models::ChunkMetadata;

use super::{Match, QueryRequest, Record, VectorStore};

/// In-memory store for testing and offline development.
pub struct InMemoryVectorStore {
    records: RwLock<Vec<Record>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRecord {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    page_content: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// Parse seed records from a JSON array.
pub fn parse_seed(json: &str) -> anyhow::Result<Vec<Record>> {
    let seeds: Vec<SeedRecord> =
        serde_json::from_str(json).context("seed file must be a JSON array of chunk records")?;

    let mut records = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if seed.id.trim().is_empty() {
            anyhow::bail!("seed record has an empty id");
        }
        let mut metadata = ChunkMetadata::from(seed.metadata);
        if let Some(content) = seed.page_content {
            metadata.set_content(&content);
        }
        records.push(Record {
            id: seed.id,
            values: seed.values,
            metadata: metadata.0,
        });
    }
    Ok(records)
}

/// Read and parse a seed file.
pub fn load_seed(path: &Path) -> anyhow::Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    parse_seed(&content).with_context(|| format!("Invalid seed file: {}", path.display()))
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> ChunkError {
    ChunkError::upstream("memory", "store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Match>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut matches: Vec<Match> = records
            .iter()
            .filter(|r| {
                request
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.accepts(&r.metadata))
            })
            .map(|r| Match {
                id: r.id.clone(),
                score: cosine_similarity(&request.vector, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();
        // stable sort: equal scores keep insertion order
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(request.top_k);
        Ok(matches)
    }

    async fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .filter(|r| ids.contains(&r.id.as_str()))
            .map(|r| (r.id.clone(), r.clone()))
            .collect())
    }

    async fn upsert(&self, incoming: &[Record]) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        for record in incoming {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.retain(|r| !ids.contains(&r.id.as_str()));
        Ok(())
    }

    async fn describe_index_stats(&self) -> Result<Value> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let dimension = records.first().map(|r| r.values.len()).unwrap_or(0);
        Ok(json!({
            "dimension": dimension,
            "indexFullness": 0.0,
            "totalVectorCount": records.len(),
            "namespaces": { "": { "vectorCount": records.len() } },
        }))
    }
}
