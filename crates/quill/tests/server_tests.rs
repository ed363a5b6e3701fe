mod common;

use axum::{
  body::{to_bytes, Body},
  http::{header, Method, Request, StatusCode},
  Router,
};
use common::{engine, fixture_catalog, CountingStore, FakeEmbedder};
use quill::server::create_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
  let embedder = Arc::new(FakeEmbedder::returning(vec![1.0, 0.0, 0.0, 0.0]));
  create_router(Arc::new(engine(Arc::new(fixture_catalog()), embedder)))
}

fn failing_app() -> Router {
  let store = Arc::new(CountingStore::failing(fixture_catalog()));
  create_router(Arc::new(engine(store, Arc::new(FakeEmbedder::failing()))))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let request = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(body) => request
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => request.body(Body::empty()).unwrap(),
  };

  let response = app.oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_version_envelope() {
  let (status, body) = send(app(), Method::GET, "/version", None).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
  assert_eq!(body["versioning"]["latest"], env!("CARGO_PKG_VERSION"));
  assert!(body["transaction_id"].is_string());
  assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_status_reports_catalog_size() {
  let (status, body) = send(app(), Method::GET, "/status", None).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["products"], 9);
  assert_eq!(body["with_embeddings"], 8);
}

#[tokio::test]
async fn test_query_returns_answer_with_citations() {
  let (status, body) =
    send(app(), Method::POST, "/query", Some(json!({ "query": "What's the power of DM6SE?" })))
      .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["query_type"], "direct_lookup");
  assert_eq!(body["confidence"], 1.0);
  assert_eq!(body["products_used"], json!(["DM6SE"]));

  let citations = body["citations"].as_array().unwrap();
  let power = citations.iter().find(|c| c["field"] == "power_watts").unwrap();
  assert_eq!(power["value"], 60);
  assert_eq!(power["source_reference"], "DM6SE_spec_sheet.pdf");
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
  let (status, body) = send(app(), Method::POST, "/query", Some(json!({ "query": " " }))).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "empty_query");
}

#[tokio::test]
async fn test_query_store_failure_is_an_error_answer() {
  let (status, body) =
    send(failing_app(), Method::POST, "/query", Some(json!({ "query": "specs for DM6SE" }))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["query_type"], "error");
  assert_eq!(body["citations"], json!([]));
}

#[tokio::test]
async fn test_get_product() {
  let (status, body) =
    send(app(), Method::POST, "/products/get", Some(json!({ "model_name": "fs2se" }))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["product"]["model_name"], "FS2SE");
  assert_eq!(body["product"]["match_kind"], "exact");
  assert_eq!(body["product"]["specs"]["power_watts"], 100);
  assert!(body["product"].get("embedding").is_none());
}

#[tokio::test]
async fn test_get_missing_product_is_404() {
  let (status, body) =
    send(app(), Method::POST, "/products/get", Some(json!({ "model_name": "XX1" }))).await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["errors"][0]["key"], "product_not_found");
}

#[tokio::test]
async fn test_store_outage_is_503() {
  let (status, body) =
    send(failing_app(), Method::POST, "/products/get", Some(json!({ "model_name": "DM6SE" })))
      .await;

  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["errors"][0]["key"], "catalog_unavailable");
}

#[tokio::test]
async fn test_similar_products() {
  let (status, body) = send(
    app(),
    Method::POST,
    "/products/similar",
    Some(json!({ "model_name": "DM3SE", "limit": 2 })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 2);
  assert_eq!(body["products"][0]["model_name"], "DM6SE");
  assert_eq!(body["products"][0]["match_kind"], "vector");
}

#[tokio::test]
async fn test_compare_needs_two_models() {
  let (status, _) =
    send(app(), Method::POST, "/products/compare", Some(json!({ "model_names": ["DM6SE"] })))
      .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send(
    app(),
    Method::POST,
    "/products/compare",
    Some(json!({ "model_names": ["DM6SE", "DM8SE"] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["answer"].as_str().unwrap().starts_with("| Metric | DM6SE | DM8SE |"));
}

#[tokio::test]
async fn test_list_products_by_category() {
  let (status, body) =
    send(app(), Method::GET, "/products/list?category=amplifier", None).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["models"], json!(["IZA 250-LZ", "IZA 500-70V"]));
  assert_eq!(body["count"], 2);

  let (_, body) = send(app(), Method::GET, "/products/list?limit=3", None).await;
  assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_catalog_stats() {
  let (status, body) = send(app(), Method::GET, "/products/stats", None).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total_products"], 9);
  assert_eq!(body["by_category"]["amplifier"], 2);
}

#[tokio::test]
async fn test_search_with_explicit_filters() {
  let (status, body) = send(
    app(),
    Method::POST,
    "/products/search",
    Some(json!({ "query": "speakers", "min_watts": 100, "category": "loudspeaker" })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  let products = body["products"].as_array().unwrap();
  let names: Vec<&str> = products.iter().map(|p| p["model_name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["AM10/60", "DM8SE", "EM90"]);
  assert_eq!(body["products"][0]["match_kind"], "vector");
}

#[tokio::test]
async fn test_search_does_not_infer_filters_from_text() {
  let (status, body) = send(
    app(),
    Method::POST,
    "/products/search",
    Some(json!({ "query": "Find 70V speakers", "limit": 20 })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 8);

  let (_, body) = send(
    app(),
    Method::POST,
    "/products/search",
    Some(json!({ "query": "Find speakers", "voltage_type": "70V", "limit": 2 })),
  )
  .await;
  assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_search_rejects_bad_requests() {
  let (status, body) =
    send(app(), Method::POST, "/products/search", Some(json!({ "query": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "empty_query");

  let (status, body) = send(
    app(),
    Method::POST,
    "/products/search",
    Some(json!({ "query": "amps", "min_watts": 500, "max_watts": 100 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "invalid_filter");
}

#[tokio::test]
async fn test_search_store_outage_is_503() {
  let (status, _) =
    send(failing_app(), Method::POST, "/products/search", Some(json!({ "query": "speakers" })))
      .await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
