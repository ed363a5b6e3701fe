//! Capability traits for the external collaborators the engine talks to.
//!
//! The engine only ever holds these as `Arc<dyn ...>`, so the in-memory
//! catalog, the Ollama adapter, and test fakes are interchangeable.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{Filter, ProductRecord};

pub mod ollama;

pub use ollama::OllamaClient;

/// Text to fixed-length vector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Sampling bounds for one completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
  pub temperature: f32,
  pub max_tokens: u32,
}

/// Prompt to text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionPort: Send + Sync {
  async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String>;
}

/// Nearest-neighbour request against the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborQuery {
  pub vector: Vec<f32>,
  pub filter: Filter,
  /// Model excluded from the ranking (the reference row in similarity search)
  pub exclude_model: Option<String>,
  /// Rows in this category sort ahead of every other row
  pub prefer_category: Option<String>,
  pub limit: usize,
}

/// Aggregate counts over the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
  pub total_products: usize,
  pub with_embeddings: usize,
  pub by_category: BTreeMap<String, usize>,
}

/// Read-only access to catalog rows
#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// Case-insensitive exact match on `model_name`
  async fn find_exact(&self, model_name: &str) -> Result<Option<ProductRecord>>;

  /// Case-insensitive substring match; lexicographically first model wins
  async fn find_containing(&self, fragment: &str) -> Result<Option<ProductRecord>>;

  /// Rows passing `filter`, ordered by `model_name`, at most `limit`
  async fn scan(&self, filter: &Filter, limit: usize) -> Result<Vec<ProductRecord>>;

  /// Rows with an embedding that pass the filter, ranked by ascending cosine
  /// distance, returned with that distance
  async fn nearest(&self, query: &NeighborQuery) -> Result<Vec<(ProductRecord, f32)>>;

  /// All model names in lexicographic order
  async fn model_names(&self) -> Result<Vec<String>>;

  async fn stats(&self) -> Result<CatalogStats>;
}
