//! Free-text query endpoint

use axum::{
  extract::{Extension, Json, State},
  http::StatusCode,
  response::Json as ResponseJson,
};
use std::sync::Arc;

use crate::engine::QueryEngine;
use crate::server::handlers::{failure, Failure};
use crate::server::middleware::RequestContext;
use crate::server::types::{AnswerResponse, BaseResponse, QueryRequest};

/// POST /query - Answer a question about the catalog
///
/// Engine failures are already folded into the answer (`query_type: error`),
/// so only a blank query is rejected here.
pub async fn query(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<QueryRequest>,
) -> Result<ResponseJson<BaseResponse<AnswerResponse>>, Failure> {
  if request.query.trim().is_empty() {
    return Err(failure(
      StatusCode::BAD_REQUEST,
      "empty_query",
      "Query must not be empty",
      context.request_id,
    ));
  }

  let answer = engine.query(&request.query).await;
  context.log_info(&format!(
    "answered as {} with {} citation(s)",
    answer.query_type().as_str(),
    answer.citations().len()
  ));

  Ok(ResponseJson(BaseResponse::success(AnswerResponse::from(&answer), context.request_id)))
}
