//! Endpoint handlers, grouped by resource

use axum::{http::StatusCode, response::Json};
use uuid::Uuid;

use crate::error::{Operation, QuillError};
use crate::server::types::{ApiError, BaseResponse};

pub mod products;
pub mod query;
pub mod status;

/// Error half of every handler's return type
pub type Failure = (StatusCode, Json<BaseResponse<()>>);

pub(crate) fn failure(
  status: StatusCode,
  key: &str,
  message: &str,
  transaction_id: Uuid,
) -> Failure {
  let error = ApiError::new(key, message);
  (status, Json(BaseResponse::<()>::error(vec![error], transaction_id)))
}

/// Map an engine error onto a status code. Store outages are 503.
pub(crate) fn engine_failure(error: &QuillError, transaction_id: Uuid) -> Failure {
  match error {
    QuillError::Store { .. } | QuillError::Timeout { operation: Operation::Store, .. } => failure(
      StatusCode::SERVICE_UNAVAILABLE,
      "catalog_unavailable",
      &error.to_string(),
      transaction_id,
    ),
    _ => failure(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", &error.to_string(), transaction_id),
  }
}
