//! Vector index abstraction.
//!
//! The [`VectorStore`] trait is the only seam through which chunks are
//! read and written. [`pinecone::PineconeStore`] talks to the hosted index;
//! [`memory::InMemoryVectorStore`] keeps records in process for tests and
//! local UI work.
//!
//! Filters are exact-match only (see [`crate::filter`]); implementations must
//! not add substring semantics.

pub mod memory;
pub mod pinecone;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Result;
use crate::filter::MetadataFilter;

/// A similarity query against the index.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
}

/// One scored hit from a similarity query, in descending score order.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

/// A stored vector with its metadata.
///
/// `values` is empty when the store could not return the vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// Operations the admin service needs from a vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query`](VectorStore::query) | Similarity search with optional exact filter |
/// | [`fetch`](VectorStore::fetch) | Load records by id, vectors included |
/// | [`upsert`](VectorStore::upsert) | Insert or replace records in one write |
/// | [`delete`](VectorStore::delete) | Remove records; unknown ids are ignored |
/// | [`describe_index_stats`](VectorStore::describe_index_stats) | Raw index statistics |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend label used in logs and errors.
    fn name(&self) -> &str;

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Match>>;

    /// Records keyed by id. Missing ids are simply absent from the map.
    async fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>>;

    async fn upsert(&self, records: &[Record]) -> Result<()>;

    async fn delete(&self, ids: &[&str]) -> Result<()>;

    async fn describe_index_stats(&self) -> Result<Value>;
}
