//! Pinecone REST client.
//!
//! Speaks the data-plane endpoints of a single index:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | query | `POST /query` |
//! | fetch | `GET /vectors/fetch?ids=...` |
//! | upsert | `POST /vectors/upsert` |
//! | delete | `POST /vectors/delete` |
//! | stats | `POST /describe_index_stats` |
//!
//! When no data-plane host is configured, the host is looked up once via
//! the control plane (`GET /indexes/{name}`) and cached for the life of the
//! client. Requests are sent once; there is no retry.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::VectorStoreConfig;
use crate::error::{ChunkError, Result};

use super::{Match, QueryRequest, Record, VectorStore};

const PROVIDER: &str = "pinecone";
const API_VERSION: &str = "2024-07";

pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    index: String,
    namespace: Option<String>,
    control_plane_url: String,
    host: OnceCell<String>,
}

impl PineconeStore {
    /// Construct the client. No network traffic happens here.
    pub fn new(
        config: &VectorStoreConfig,
        index: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            index: index.into(),
            namespace: config.namespace.clone(),
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            host: OnceCell::new_with(config.host.as_deref().map(host_url)),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", self.control_plane_url, self.index);
                debug!(index = %self.index, "resolving index host");
                let description: IndexDescription = self.send(self.client.get(url)).await?;
                Ok::<_, ChunkError>(host_url(&description.host))
            })
            .await?;
        Ok(host.as_str())
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| ChunkError::upstream(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChunkError::upstream(
                PROVIDER,
                format!("HTTP {}: {}", status, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChunkError::upstream(PROVIDER, format!("invalid response: {}", e)))
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Normalise a host into a base URL without trailing slash.
fn host_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, WireRecord>,
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl From<WireMatch> for Match {
    fn from(m: WireMatch) -> Self {
        Match {
            id: m.id,
            score: m.score,
            metadata: m.metadata.unwrap_or_default(),
        }
    }
}

impl From<WireRecord> for Record {
    fn from(r: WireRecord) -> Self {
        Record {
            id: r.id,
            values: r.values,
            metadata: r.metadata.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Match>> {
        let host = self.host().await?;
        let body = QueryBody {
            vector: &request.vector,
            top_k: request.top_k,
            include_metadata: true,
            include_values: false,
            filter: request.filter.as_ref().map(|f| f.to_json()),
            namespace: self.namespace(),
        };
        debug!(top_k = request.top_k, filtered = body.filter.is_some(), "pinecone query");
        let response: QueryResponse = self
            .send(self.client.post(format!("{}/query", host)).json(&body))
            .await?;
        Ok(response.matches.into_iter().map(Match::from).collect())
    }

    async fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>> {
        let host = self.host().await?;
        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", *id)).collect();
        if let Some(ns) = self.namespace() {
            params.push(("namespace", ns));
        }
        let response: FetchResponse = self
            .send(
                self.client
                    .get(format!("{}/vectors/fetch", host))
                    .query(&params),
            )
            .await?;
        Ok(response
            .vectors
            .into_iter()
            .map(|(id, record)| (id, Record::from(record)))
            .collect())
    }

    async fn upsert(&self, records: &[Record]) -> Result<()> {
        let host = self.host().await?;
        let vectors: Vec<WireRecord> = records
            .iter()
            .map(|r| WireRecord {
                id: r.id.clone(),
                values: r.values.clone(),
                metadata: Some(r.metadata.clone()),
            })
            .collect();
        let mut body = json!({ "vectors": vectors });
        if let Some(ns) = self.namespace() {
            body["namespace"] = json!(ns);
        }
        let _: Value = self
            .send(
                self.client
                    .post(format!("{}/vectors/upsert", host))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        let host = self.host().await?;
        let mut body = json!({ "ids": ids });
        if let Some(ns) = self.namespace() {
            body["namespace"] = json!(ns);
        }
        let _: Value = self
            .send(
                self.client
                    .post(format!("{}/vectors/delete", host))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn describe_index_stats(&self) -> Result<Value> {
        let host = self.host().await?;
        self.send(
            self.client
                .post(format!("{}/describe_index_stats", host))
                .json(&json!({})),
        )
        .await
    }
}
