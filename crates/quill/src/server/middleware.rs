//! Per-request context and logging middleware

use axum::{
  extract::Request,
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Request metadata injected into every handler
#[derive(Debug, Clone)]
pub struct RequestContext {
  /// Unique ID for this request; echoed as the response transaction id
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri }
  }

  fn describe(&self, message: &str) -> String {
    format!("[{}] {} {} - {message}", self.request_id, self.method, self.uri.path())
  }

  pub fn log_info(&self, message: &str) {
    bentley::event_info!("{}", self.describe(message));
  }

  pub fn log_warn(&self, message: &str) {
    bentley::event_warn!("{}", self.describe(message));
  }

  pub fn log_error(&self, message: &str) {
    bentley::event_error!("{}", self.describe(message));
  }
}

/// Inject a `RequestContext` and log request start and completion
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let context = RequestContext::new(request.method().clone(), request.uri().clone());

  let started = Instant::now();
  bentley::verbose!("{}", context.describe("request started"));
  request.extensions_mut().insert(context.clone());

  let response = next.run(request).await;

  let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
  context.log_info(&format!("{} in {duration_ms:.2}ms", response.status().as_u16()));

  response
}
