//! Status and version endpoint handlers

use axum::{
  extract::{Extension, State},
  response::Json,
};
use std::sync::Arc;

use crate::engine::QueryEngine;
use crate::server::handlers::{engine_failure, Failure};
use crate::server::middleware::RequestContext;
use crate::server::types::{BaseResponse, StatusResponse, VersionResponse};

/// GET /status - Health check endpoint
pub async fn status(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
) -> Result<Json<BaseResponse<StatusResponse>>, Failure> {
  let stats = engine.stats().await.map_err(|e| {
    context.log_error(&format!("status check failed: {e}"));
    engine_failure(&e, context.request_id)
  })?;

  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    products: stats.total_products,
    with_embeddings: stats.with_embeddings,
  };
  Ok(Json(BaseResponse::success(response, context.request_id)))
}

/// GET /version - Returns current API version
pub async fn version(
  Extension(context): Extension<RequestContext>,
) -> Json<BaseResponse<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(BaseResponse::success(response, context.request_id))
}
