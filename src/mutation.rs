//! Chunk retrieval, update and deletion by id.
//!
//! Used by both the CLI (`chunk-admin get|update|delete`) and the
//! `/api/chunks/{id}` HTTP endpoints.
//!
//! # Update Semantics
//!
//! 1. Fetch the stored record; a missing id is [`ChunkError::NotFound`].
//! 2. Shallow-merge the metadata patch over the stored metadata, then set
//!    `lastModified` to now.
//! 3. If new content differs from the stored content, embed it. Otherwise
//!    reuse the stored vector, embedding only when the store returned none.
//! 4. Write the content to both `pageContent` and `text`.
//! 5. Upsert id, vector and metadata in a single write.
//!
//! Nothing is written when any step fails; an embedding computed before a
//! failed upsert is discarded.

use anyhow::Context;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{ChunkError, Result};
use crate::models::{Chunk, ChunkMetadata, UpdateChunkRequest};
use crate::providers::Providers;
use crate::store::Record;

/// Fetch one chunk. A missing id is `Ok(None)`, not an error.
pub async fn fetch_chunk(providers: &Providers, id: &str) -> Result<Option<Chunk>> {
    let store = providers.vector_store()?;
    let mut records = store.fetch(&[id]).await?;
    Ok(records
        .remove(id)
        .map(|record| Chunk::from_metadata(record.id, record.metadata.into(), None)))
}

/// Apply a partial update and return the chunk as written.
pub async fn update_chunk(
    providers: &Providers,
    id: &str,
    page_content: Option<&str>,
    patch: Option<&Map<String, Value>>,
) -> Result<Chunk> {
    let store = providers.vector_store()?;
    let existing = store
        .fetch(&[id])
        .await?
        .remove(id)
        .ok_or_else(|| ChunkError::not_found(id))?;

    let mut metadata = ChunkMetadata::from(existing.metadata);
    let current_content = metadata.content().to_string();

    if let Some(patch) = patch {
        metadata.merge(patch);
    }
    metadata.set_last_modified(Utc::now());

    let content_changed = page_content.is_some_and(|c| c != current_content);
    let final_content = page_content
        .map(str::to_string)
        .unwrap_or(current_content);

    let values = if content_changed || existing.values.is_empty() {
        providers.embedder()?.embed(&final_content).await?
    } else {
        existing.values
    };

    metadata.set_content(&final_content);

    store
        .upsert(&[Record {
            id: id.to_string(),
            values,
            metadata: metadata.0.clone(),
        }])
        .await?;

    info!(id, reembedded = content_changed, "chunk updated");

    Ok(Chunk {
        id: id.to_string(),
        page_content: final_content,
        metadata,
        score: None,
    })
}

/// Update driven by an HTTP/CLI request body.
pub async fn apply_update(
    providers: &Providers,
    id: &str,
    request: &UpdateChunkRequest,
) -> Result<Chunk> {
    request.validate()?;
    update_chunk(
        providers,
        id,
        request.page_content.as_deref(),
        request.metadata.as_ref(),
    )
    .await
}

/// Delete by id. Unknown ids are not an error.
pub async fn delete_chunk(providers: &Providers, id: &str) -> Result<()> {
    let store = providers.vector_store()?;
    store.delete(&[id]).await?;
    info!(id, "chunk deleted");
    Ok(())
}

/// CLI entry point: fetch and print one chunk.
pub async fn run_get(providers: &Providers, id: &str) -> anyhow::Result<()> {
    match fetch_chunk(providers, id).await? {
        Some(chunk) => print_chunk(&chunk),
        None => anyhow::bail!("Chunk with id {} not found", id),
    }
    Ok(())
}

/// CLI entry point: update content and/or metadata, then print the result.
pub async fn run_update(
    providers: &Providers,
    id: &str,
    content: Option<String>,
    metadata_json: Option<String>,
) -> anyhow::Result<()> {
    let metadata = match metadata_json {
        Some(raw) => {
            let value: Value =
                serde_json::from_str(&raw).context("--metadata must be a JSON object")?;
            match value {
                Value::Object(map) => Some(map),
                _ => anyhow::bail!("--metadata must be a JSON object"),
            }
        }
        None => None,
    };

    let request = UpdateChunkRequest {
        page_content: content,
        metadata,
    };
    let chunk = apply_update(providers, id, &request).await?;
    println!("Chunk updated.");
    println!();
    print_chunk(&chunk);
    Ok(())
}

/// CLI entry point: delete one chunk.
pub async fn run_delete(providers: &Providers, id: &str) -> anyhow::Result<()> {
    delete_chunk(providers, id).await?;
    println!("Chunk with id {} deleted.", id);
    Ok(())
}

pub(crate) fn print_chunk(chunk: &Chunk) {
    let m = &chunk.metadata;
    println!("--- Chunk ---");
    println!("id:            {}", chunk.id);
    if let Some(score) = chunk.score {
        println!("score:         {:.4}", score);
    }
    println!("module:        {}", m.module().unwrap_or("-"));
    println!("name:          {}", m.name().unwrap_or("-"));
    println!("path:          {}", m.path().unwrap_or("-"));
    if let Some(kind) = m.chunk_type() {
        println!("type:          {}", kind);
    }
    if let Some(index) = m.chunk_index() {
        println!("chunkIndex:    {}", index);
    }
    if let Some(summary) = m.summary() {
        println!("summary:       {}", summary);
    }
    if !m.tags().is_empty() {
        println!("tags:          {}", m.tags().join(", "));
    }
    if !m.keywords().is_empty() {
        println!("keywords:      {}", m.keywords().join(", "));
    }
    if let Some(ts) = m.last_modified() {
        println!("lastModified:  {}", ts.format("%Y-%m-%dT%H:%M:%SZ"));
    }
    println!();
    println!("--- Content ---");
    println!("{}", chunk.page_content);
    println!();
}
