//! Chunk query engine.
//!
//! Turns a loose set of optional criteria into one result page. The first
//! applicable branch wins:
//!
//! 1. **Id lookup**: `id` set: fetch that chunk; every other field is ignored.
//! 2. **Semantic**: `queryText` set: embed it and query the index with
//!    `topK` and the exact filter (when `metadataFilter` is on).
//! 3. **Filter-only**: an exact filter exists: embed the placeholder text
//!    and query with `topK = min(2 × topK, max_filter_top_k)`.
//! 4. Otherwise the result is empty.
//!
//! Branches 2 and 3 then re-filter client-side with [`fuzzy::matches`] on
//! each of `module`, `name`, `path` that the request carries. Names and paths
//! are normalized on both sides first; modules are compared as is. The
//! remote filter is exact-match only, so this local pass is what gives
//! substring behaviour.
//!
//! Pagination slices the filtered list: `start = (page - 1) × pageSize`.
//! A page past the end is empty. Zero or absent `topK`, `page`, `pageSize`
//! take the configured defaults.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::QueryConfig;
use crate::error::Result;
use crate::filter;
use crate::fuzzy;
use crate::models::{Chunk, QueryChunksRequest};
use crate::mutation::{fetch_chunk, print_chunk};
use crate::normalize::{normalize_name, normalize_path};
use crate::providers::Providers;
use crate::store::QueryRequest;

/// One page of query results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPage {
    pub chunks: Vec<Chunk>,
    /// Number of matches before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Effective `(top_k, page, page_size)` after applying defaults.
fn effective_params(request: &QueryChunksRequest, defaults: &QueryConfig) -> (usize, usize, usize) {
    let pick = |v: Option<usize>, default: usize| v.filter(|n| *n > 0).unwrap_or(default);
    (
        pick(request.top_k, defaults.default_top_k),
        pick(request.page, defaults.default_page),
        pick(request.page_size, defaults.default_page_size),
    )
}

/// Run a query and return the requested page.
pub async fn query_page(providers: &Providers, request: &QueryChunksRequest) -> Result<ChunkPage> {
    let defaults = &providers.config().query;
    let (top_k, page, page_size) = effective_params(request, defaults);

    let matched = collect_matches(providers, request, top_k, defaults).await?;
    let total = matched.len();
    let chunks = paginate(matched, page, page_size);

    info!(total, page, page_size, returned = chunks.len(), "chunk query");
    Ok(ChunkPage {
        chunks,
        total,
        page,
        page_size,
    })
}

/// Run a query and return only the paginated chunks.
pub async fn query_chunks(providers: &Providers, request: &QueryChunksRequest) -> Result<Vec<Chunk>> {
    Ok(query_page(providers, request).await?.chunks)
}

async fn collect_matches(
    providers: &Providers,
    request: &QueryChunksRequest,
    top_k: usize,
    defaults: &QueryConfig,
) -> Result<Vec<Chunk>> {
    if let Some(id) = request.id() {
        debug!(id, "query by id");
        return Ok(fetch_chunk(providers, id).await?.into_iter().collect());
    }

    let exact = filter::build(request);

    let (text, top_k) = match (request.query_text(), &exact) {
        (Some(text), _) => (text, top_k),
        (None, Some(_)) => (
            defaults.placeholder_text.as_str(),
            top_k.saturating_mul(2).min(defaults.max_filter_top_k),
        ),
        (None, None) => return Ok(Vec::new()),
    };

    debug!(top_k, filtered = exact.is_some(), semantic = request.query_text().is_some(), "query by vector");
    let vector = providers.embedder()?.embed(text).await?;
    let store = providers.vector_store()?;
    let matches = store
        .query(&QueryRequest {
            vector,
            top_k,
            filter: exact,
        })
        .await?;

    Ok(matches
        .into_iter()
        .map(|m| Chunk::from_metadata(m.id, m.metadata.into(), Some(m.score)))
        .filter(|chunk| fuzzy_accepts(request, chunk))
        .collect())
}

/// Client-side AND of the fuzzy module/name/path conditions present in the request.
pub fn fuzzy_accepts(request: &QueryChunksRequest, chunk: &Chunk) -> bool {
    let m = &chunk.metadata;
    if let Some(module) = request.module() {
        if !fuzzy::matches(m.module().unwrap_or(""), module) {
            return false;
        }
    }
    if let Some(name) = request.name() {
        if !fuzzy::matches(&normalize_name(m.name().unwrap_or("")), &normalize_name(name)) {
            return false;
        }
    }
    if let Some(path) = request.path() {
        if !fuzzy::matches(&normalize_path(m.path().unwrap_or("")), &normalize_path(path)) {
            return false;
        }
    }
    true
}

/// Slice one page out of `items`; out-of-range pages are empty.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    items.into_iter().skip(start).take(page_size).collect()
}

/// CLI entry point: run a query and print the page.
pub async fn run_query(providers: &Providers, request: &QueryChunksRequest) -> anyhow::Result<()> {
    request.validate()?;
    let page = query_page(providers, request).await?;

    if page.chunks.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "Page {} ({} per page), {} of {} matches",
        page.page,
        page.page_size,
        page.chunks.len(),
        page.total
    );
    println!();
    for chunk in &page.chunks {
        print_chunk(chunk);
    }
    Ok(())
}
