//! HTTP API tests.
//!
//! Most tests drive the router in process with `oneshot`; one binds a real
//! port to cover the serve loop.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chunk_admin::config::Config;
use chunk_admin::providers::Providers;
use chunk_admin::server::{build_router, run_server_with_providers};
use chunk_admin::store::VectorStore;
use common::{harness, no_env, record};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn seed() -> Vec<chunk_admin::store::Record> {
    vec![
        record("c1", "Core", "intro.md", "docs/intro.md", "Welcome"),
        record("c2", "Billing", "invoices.md", "docs/invoices.md", "Invoices"),
    ]
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// ─── Health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_configuration() {
    let h = harness(Vec::new());
    let (status, body) = send(build_router(h.providers.clone()), Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["service"], "chunk-admin");
    assert_eq!(body["config"]["vectorStore"], "Configured");
    assert_eq!(body["config"]["embedding"], "Configured");
    assert_eq!(body["config"]["llm"], "Configured");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_health_without_credentials() {
    let providers = Arc::new(Providers::with_env(Arc::new(Config::default()), no_env));
    let (status, body) = send(build_router(providers), Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["vectorStore"], "Not configured");
    assert_eq!(body["config"]["index"], "Not configured");
    assert_eq!(body["config"]["embedding"], "Not configured");
    assert_eq!(body["config"]["llm"], "Not configured");
}

// ─── Query ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_without_criteria_is_rejected_before_any_call() {
    let h = harness(seed());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::POST,
        "/api/chunks/query",
        Some(json!({"page": 2, "metadataFilter": true})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(h.store.calls(), 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_query_malformed_body_is_bad_request() {
    let h = harness(seed());
    let app = build_router(h.providers.clone());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chunks/query")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_query_returns_page_envelope() {
    let h = harness(seed());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::POST,
        "/api/chunks/query",
        Some(json!({"queryText": "welcome", "module": "core", "pageSize": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["chunks"][0]["id"], "c1");
    assert_eq!(body["chunks"][0]["pageContent"], "Welcome");
    assert!(body["chunks"][0]["score"].is_number());
}

#[tokio::test]
async fn test_query_by_id() {
    let h = harness(seed());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::POST,
        "/api/chunks/query",
        Some(json!({"id": "c2"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chunks"].as_array().unwrap().len(), 1);
    assert_eq!(body["chunks"][0]["metadata"]["module"], "Billing");
}

// ─── Get / update / delete ──────────────────────────────────────────

#[tokio::test]
async fn test_get_chunk() {
    let h = harness(seed());
    let (status, body) = send(build_router(h.providers.clone()), Method::GET, "/api/chunks/c1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["chunk"]["id"], "c1");
    assert!(body["chunk"].get("score").is_none());
}

#[tokio::test]
async fn test_get_missing_chunk_is_404() {
    let h = harness(seed());
    let (status, body) = send(build_router(h.providers.clone()), Method::GET, "/api/chunks/zzz", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "Chunk with id zzz not found");
}

#[tokio::test]
async fn test_update_requires_a_field() {
    let h = harness(seed());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::PUT,
        "/api/chunks/c1",
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn test_update_chunk() {
    let h = harness(seed());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::PUT,
        "/api/chunks/c1",
        Some(json!({"pageContent": "Hello again", "metadata": {"tags": ["faq"]}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chunk"]["pageContent"], "Hello again");
    assert_eq!(body["chunk"]["metadata"]["tags"], json!(["faq"]));
    assert_eq!(body["chunk"]["metadata"]["text"], "Hello again");
    assert_eq!(h.embedder.calls(), 1);
}

#[tokio::test]
async fn test_update_missing_chunk_is_404() {
    let h = harness(seed());
    let (status, _) = send(
        build_router(h.providers.clone()),
        Method::PUT,
        "/api/chunks/zzz",
        Some(json!({"metadata": {"tags": []}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_chunk() {
    let h = harness(seed());
    let (status, body) = send(build_router(h.providers.clone()), Method::DELETE, "/api/chunks/c1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Chunk with id c1 deleted successfully");
    assert!(h.store.inner.fetch(&["c1"]).await.unwrap().is_empty());

    // Deleting again still succeeds.
    let (status, _) = send(build_router(h.providers.clone()), Method::DELETE, "/api/chunks/c1", None).await;
    assert_eq!(status, StatusCode::OK);
}

// ─── Stats / process ────────────────────────────────────────────────

#[tokio::test]
async fn test_stats() {
    let h = harness(seed());
    let (status, body) = send(build_router(h.providers.clone()), Method::GET, "/api/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalVectorCount"], 2);
    assert_eq!(body["stats"]["dimension"], 2);
}

#[tokio::test]
async fn test_process_query() {
    let h = harness(Vec::new());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::POST,
        "/api/query/process",
        Some(json!({"query": "first\n\nsecond", "prompt": "Rewrite"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!(["rewritten: first", "rewritten: second"]));
}

#[tokio::test]
async fn test_process_requires_query_and_prompt() {
    let h = harness(Vec::new());
    let (status, body) = send(
        build_router(h.providers.clone()),
        Method::POST,
        "/api/query/process",
        Some(json!({"query": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Query and prompt are required");
    assert_eq!(h.model.calls(), 0);
}

// ─── Missing configuration ──────────────────────────────────────────

#[tokio::test]
async fn test_missing_credential_is_upstream_error() {
    let providers = Arc::new(Providers::with_env(Arc::new(Config::default()), no_env));
    let (status, body) = send(build_router(providers), Method::GET, "/api/chunks/c1", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "upstream_error");
    assert_eq!(body["error"]["message"], "PINECONE_API_KEY is not configured");
}

fn keys_env(key: &str) -> Option<String> {
    match key {
        "PINECONE_API_KEY" | "VOYAGE_API_KEY" | "OPENAI_API_KEY" => Some("test-key".to_string()),
        _ => None,
    }
}

#[tokio::test]
async fn test_malformed_proxy_is_upstream_error() {
    let mut cfg = Config::default();
    cfg.vector_store.index = Some("docs".into());
    cfg.proxy.url = Some("http://[bad".into());
    let providers = Arc::new(Providers::with_env(Arc::new(cfg), keys_env));

    let (status, body) = send(build_router(providers), Method::GET, "/api/chunks/c1", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "upstream_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("invalid proxy url"));
}

// ─── Real socket ────────────────────────────────────────────────────

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/api/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not start within 5 seconds");
}

#[tokio::test]
async fn test_server_over_tcp_with_cors() {
    let port = find_free_port();
    let h = harness(seed());
    let providers = h.providers.clone();
    let bind = format!("127.0.0.1:{}", port);

    let server_handle = tokio::spawn(async move {
        run_server_with_providers(&bind, providers).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/api/chunks/query", port))
        .header("Origin", "http://localhost:5173")
        .json(&json!({"queryText": "invoices", "module": "billing"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["chunks"][0]["id"], "c2");

    server_handle.abort();
}
