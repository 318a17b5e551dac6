//! Index statistics, proxied verbatim from the vector store.
//!
//! Used by `chunk-admin stats` and `GET /api/stats`.

use serde_json::Value;

use crate::error::Result;
use crate::providers::Providers;

pub async fn index_stats(providers: &Providers) -> Result<Value> {
    providers.vector_store()?.describe_index_stats().await
}

/// Run the stats command: print a short summary, then the raw payload.
pub async fn run_stats(providers: &Providers) -> anyhow::Result<()> {
    let stats = index_stats(providers).await?;

    println!("Index Stats");
    println!("===========");
    println!();
    if let Some(index) = &providers.config().vector_store.index {
        println!("  Index:       {}", index);
    }
    if let Some(total) = stats.get("totalVectorCount").and_then(Value::as_u64) {
        println!("  Vectors:     {}", total);
    }
    if let Some(dimension) = stats.get("dimension").and_then(Value::as_u64) {
        println!("  Dimension:   {}", dimension);
    }
    if let Some(namespaces) = stats.get("namespaces").and_then(Value::as_object) {
        if !namespaces.is_empty() {
            println!();
            println!("  {:<32} {:>10}", "NAMESPACE", "VECTORS");
            println!("  {}", "-".repeat(43));
            for (name, ns) in namespaces {
                let label = if name.is_empty() { "(default)" } else { name.as_str() };
                let count = ns.get("vectorCount").and_then(Value::as_u64).unwrap_or(0);
                println!("  {:<32} {:>10}", label, count);
            }
        }
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
