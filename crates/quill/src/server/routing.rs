//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};
use std::sync::Arc;

use crate::engine::QueryEngine;
use crate::server::handlers::{products, query, status};
use crate::server::middleware::request_context_middleware;

/// Create the main application router around a shared engine
pub fn create_router(engine: Arc<QueryEngine>) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    // Free-text questions
    .route("/query", post(query::query))
    // Product endpoints
    .route("/products/get", post(products::get_product))
    .route("/products/similar", post(products::similar_products))
    .route("/products/search", post(products::search_products))
    .route("/products/compare", post(products::compare_products))
    .route("/products/list", get(products::list_products))
    .route("/products/stats", get(products::catalog_stats))
    .layer(middleware::from_fn(request_context_middleware))
    .with_state(engine)
}
