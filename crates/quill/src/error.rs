use thiserror::Error;

/// Failures that can cross a component boundary inside the engine.
///
/// Only `Store` and `Timeout { operation: Operation::Store, .. }` are fatal for
/// a request. Embedding and completion failures are caught at their call
/// sites and turned into degraded answers.
#[derive(Error, Debug)]
pub enum QuillError {
  #[error("Catalog store error: {message}")]
  Store { message: String },

  #[error("{operation} timed out after {after_ms}ms")]
  Timeout { operation: Operation, after_ms: u64 },

  #[error("Embedding failed: {message}")]
  Embedding { message: String },

  #[error("Completion failed: {message}")]
  Completion { message: String },

  #[error("Invalid configuration: {message}")]
  Config { message: String },

  #[error("Failed to load catalog: {message}")]
  CatalogLoad { message: String },

  #[error("Invalid pattern: {0}")]
  Pattern(#[from] regex::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),
}

/// The outbound call a timeout applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Store,
  Embedding,
  Completion,
}

impl std::fmt::Display for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Operation::Store => write!(f, "Catalog store call"),
      Operation::Embedding => write!(f, "Embedding call"),
      Operation::Completion => write!(f, "Completion call"),
    }
  }
}

impl QuillError {
  pub fn store(message: impl Into<String>) -> Self {
    QuillError::Store { message: message.into() }
  }

  pub fn embedding(message: impl Into<String>) -> Self {
    QuillError::Embedding { message: message.into() }
  }

  pub fn completion(message: impl Into<String>) -> Self {
    QuillError::Completion { message: message.into() }
  }

  pub fn config(message: impl Into<String>) -> Self {
    QuillError::Config { message: message.into() }
  }

  pub fn catalog_load(message: impl Into<String>) -> Self {
    QuillError::CatalogLoad { message: message.into() }
  }
}

pub type Result<T> = std::result::Result<T, QuillError>;
