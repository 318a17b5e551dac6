//! Core data models used throughout the chunk admin service.
//!
//! A [`Chunk`] is a unit of indexed text owned by the remote vector index.
//! Its metadata is an open-ended JSON object; recognized fields are exposed
//! through typed accessors while unknown keys are carried through verbatim.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChunkError, Result};

/// Metadata keys with a known meaning.
pub mod keys {
    pub const PATH: &str = "path";
    pub const MODULE: &str = "module";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const CHUNK_INDEX: &str = "chunkIndex";
    pub const SUMMARY: &str = "summary";
    pub const TAGS: &str = "tags";
    pub const KEYWORDS: &str = "keywords";
    pub const EXTRA: &str = "extra";
    pub const LAST_MODIFIED: &str = "lastModified";
    pub const PAGE_CONTENT: &str = "pageContent";
    pub const TEXT: &str = "text";
}

/// Open-ended chunk metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkMetadata(pub Map<String, Value>);

impl ChunkMetadata {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.get_str(keys::PATH)
    }

    pub fn module(&self) -> Option<&str> {
        self.get_str(keys::MODULE)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(keys::NAME)
    }

    pub fn chunk_type(&self) -> Option<&str> {
        self.get_str(keys::TYPE)
    }

    pub fn summary(&self) -> Option<&str> {
        self.get_str(keys::SUMMARY)
    }

    pub fn chunk_index(&self) -> Option<i64> {
        self.0.get(keys::CHUNK_INDEX).and_then(Value::as_i64)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.str_list(keys::TAGS)
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.str_list(keys::KEYWORDS)
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.get_str(keys::LAST_MODIFIED)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Stored chunk text: `pageContent`, falling back to `text`.
    ///
    /// Empty values fall through, so a blank `pageContent` next to a
    /// populated `text` yields the latter.
    pub fn content(&self) -> &str {
        [keys::PAGE_CONTENT, keys::TEXT]
            .iter()
            .filter_map(|key| self.get_str(key))
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// Shallow merge: every key in `patch` replaces the existing value.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn set_last_modified(&mut self, at: DateTime<Utc>) {
        self.0.insert(
            keys::LAST_MODIFIED.to_string(),
            Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }

    /// Write the content under both `pageContent` and `text`.
    pub fn set_content(&mut self, content: &str) {
        for key in [keys::PAGE_CONTENT, keys::TEXT] {
            self.0
                .insert(key.to_string(), Value::String(content.to_string()));
        }
    }

    fn str_list(&self, key: &str) -> Vec<&str> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for ChunkMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A unit of indexed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub page_content: String,
    pub metadata: ChunkMetadata,
    /// Similarity score; only present on query results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Chunk {
    /// Build a chunk from a stored record's id and metadata.
    pub fn from_metadata(id: impl Into<String>, metadata: ChunkMetadata, score: Option<f32>) -> Self {
        Self {
            id: id.into(),
            page_content: metadata.content().to_string(),
            metadata,
            score,
        }
    }
}

/// Search criteria for one chunk query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryChunksRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Forward module/name/path to the store as an exact-match filter.
    #[serde(default)]
    pub metadata_filter: bool,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// Returns the field value unless it is absent or blank.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

impl QueryChunksRequest {
    pub fn id(&self) -> Option<&str> {
        present(&self.id)
    }

    pub fn module(&self) -> Option<&str> {
        present(&self.module)
    }

    pub fn name(&self) -> Option<&str> {
        present(&self.name)
    }

    pub fn path(&self) -> Option<&str> {
        present(&self.path)
    }

    pub fn query_text(&self) -> Option<&str> {
        present(&self.query_text)
    }

    pub fn prompt(&self) -> Option<&str> {
        present(&self.prompt)
    }

    /// At least one search criterion must be supplied.
    pub fn validate(&self) -> Result<()> {
        let any = self.id().is_some()
            || self.module().is_some()
            || self.name().is_some()
            || self.path().is_some()
            || self.query_text().is_some()
            || self.prompt().is_some();
        if any {
            Ok(())
        } else {
            Err(ChunkError::invalid(
                "At least one query parameter (id, module, name, path, queryText, or prompt) is required",
            ))
        }
    }
}

/// Partial update body for a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChunkRequest {
    #[serde(default)]
    pub page_content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl UpdateChunkRequest {
    pub fn validate(&self) -> Result<()> {
        if self.page_content.is_none() && self.metadata.is_none() {
            return Err(ChunkError::invalid(
                "At least one field (pageContent or metadata) must be provided for update",
            ));
        }
        Ok(())
    }
}

/// Multi-line query rewrite request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessQueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub prompt: String,
}

impl ProcessQueryRequest {
    pub fn validate(&self) -> Result<()> {
        if self.query.is_empty() || self.prompt.is_empty() {
            return Err(ChunkError::invalid("Query and prompt are required"));
        }
        Ok(())
    }
}
