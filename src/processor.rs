//! Batch rewriting of multi-line queries through a language model.
//!
//! Each non-empty line is sent independently, combined with the caller's
//! instruction. Calls run concurrently; results come back in input order.
//! One failed line fails the whole batch.

use futures::future::try_join_all;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ChunkError, Result};
use crate::llm::LanguageModel;
use crate::providers::Providers;

/// Trimmed, non-empty lines of `input`.
pub fn split_lines(input: &str) -> Vec<&str> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// The single request sent to the model for one line.
pub fn compose_prompt(prompt: &str, line: &str) -> String {
    format!("{}\n\nContent to process: \"{}\"", prompt, line)
}

/// Rewrite every line of `query` with `prompt`, preserving line order.
pub async fn process_lines(
    model: &dyn LanguageModel,
    query: &str,
    prompt: &str,
) -> Result<Vec<String>> {
    let lines = split_lines(query);
    if lines.is_empty() {
        return Err(ChunkError::invalid("Query is empty after trimming lines"));
    }

    info!(lines = lines.len(), model = %model.model_name(), "processing query lines");

    try_join_all(lines.iter().map(|line| process_line(model, line, prompt))).await
}

async fn process_line(model: &dyn LanguageModel, line: &str, prompt: &str) -> Result<String> {
    let reply = model.complete(&compose_prompt(prompt, line)).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        warn!(line, "language model returned an empty response");
        return Err(ChunkError::upstream(
            "llm",
            format!("empty response for line: {}", line),
        ));
    }
    Ok(reply.to_string())
}

/// Resolve the model and process the query.
pub async fn process_query(providers: &Providers, query: &str, prompt: &str) -> Result<Vec<String>> {
    if query.is_empty() || prompt.is_empty() {
        return Err(ChunkError::invalid("Query and prompt are required"));
    }
    let model = providers.language_model()?;
    process_lines(model.as_ref(), query, prompt).await
}

/// CLI entry point. Reads the query from an argument or a file and prints
/// one result per line.
pub async fn run_process(
    providers: &Providers,
    prompt: &str,
    query: Option<String>,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let query = match (query, file) {
        (Some(q), _) => q,
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?,
        (None, None) => anyhow::bail!("Provide a query argument or --file"),
    };

    let results = process_query(providers, &query, prompt).await?;
    for (i, result) in results.iter().enumerate() {
        println!("{}. {}", i + 1, result);
    }
    Ok(())
}
