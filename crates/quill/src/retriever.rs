//! Hybrid retrieval: hard filters plus vector ranking in one store query.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Operation, QuillError, Result};
use crate::models::{Filter, MatchKind, ProductRecord, RetrievalResult};
use crate::ports::{CatalogStats, CatalogStore, EmbeddingPort, NeighborQuery};

fn similarity(distance: f32) -> f32 {
  (1.0 - distance).clamp(0.0, 1.0)
}

fn unscored(records: Vec<ProductRecord>, kind: MatchKind) -> Vec<RetrievalResult> {
  records.into_iter().map(|record| RetrievalResult::new(record, kind, 0.0)).collect()
}

fn scored(ranked: Vec<(ProductRecord, f32)>) -> Vec<RetrievalResult> {
  ranked
    .into_iter()
    .map(|(record, distance)| RetrievalResult::new(record, MatchKind::Vector, similarity(distance)))
    .collect()
}

/// Store failures (including timeouts) propagate; embedding failures degrade
/// to a filter-only scan.
pub struct HybridRetriever {
  embedder: Arc<dyn EmbeddingPort>,
  store: Arc<dyn CatalogStore>,
  store_timeout: Duration,
}

impl HybridRetriever {
  pub fn new(
    embedder: Arc<dyn EmbeddingPort>,
    store: Arc<dyn CatalogStore>,
    store_timeout: Duration,
  ) -> Self {
    Self { embedder, store, store_timeout }
  }

  async fn store_call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(self.store_timeout, call).await {
      Ok(result) => result,
      Err(_) => Err(QuillError::Timeout {
        operation: Operation::Store,
        after_ms: self.store_timeout.as_millis() as u64,
      }),
    }
  }

  /// Exact (case-insensitive) match, else the lexicographically first
  /// substring match
  pub async fn direct_lookup(&self, model_name: &str) -> Result<Option<RetrievalResult>> {
    let model_name = model_name.trim();
    if model_name.is_empty() {
      return Ok(None);
    }

    if let Some(record) = self.store_call(self.store.find_exact(model_name)).await? {
      return Ok(Some(RetrievalResult::new(record, MatchKind::Exact, 0.0)));
    }

    let partial = self.store_call(self.store.find_containing(model_name)).await?;
    if let Some(record) = &partial {
      bentley::debug!("'{model_name}' resolved to '{}' by substring", record.model_name);
    }
    Ok(partial.map(|record| RetrievalResult::new(record, MatchKind::Substring, 0.0)))
  }

  pub async fn semantic_search(
    &self,
    query: &str,
    filter: &Filter,
    limit: usize,
  ) -> Result<Vec<RetrievalResult>> {
    let vector = match self.embedder.embed(query).await {
      Ok(vector) => vector,
      Err(e) => {
        bentley::warn!("query embedding unavailable, falling back to filter-only scan: {e}");
        let records = self.store_call(self.store.scan(filter, limit)).await?;
        return Ok(unscored(records, MatchKind::FilterOnly));
      }
    };

    let query = NeighborQuery { vector, filter: filter.clone(), limit, ..Default::default() };
    let ranked = self.store_call(self.store.nearest(&query)).await?;
    Ok(scored(ranked))
  }

  /// Rows nearest to a reference product, same category first.
  /// Empty when the reference is missing or has no embedding.
  pub async fn find_similar(&self, model_name: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
    let Some(reference) = self.store_call(self.store.find_exact(model_name)).await? else {
      return Ok(Vec::new());
    };
    let Some(vector) = reference.embedding.filter(|v| !v.is_empty()) else {
      bentley::debug!("'{}' has no embedding; nothing to compare", reference.model_name);
      return Ok(Vec::new());
    };

    let query = NeighborQuery {
      vector,
      filter: Filter::default(),
      exclude_model: Some(reference.model_name),
      prefer_category: reference.category,
      limit,
    };
    let ranked = self.store_call(self.store.nearest(&query)).await?;
    Ok(scored(ranked))
  }

  /// Rows in one category, by model name
  pub async fn browse_category(&self, category: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
    let filter = Filter { category: Some(category.to_string()), ..Default::default() };
    let records = self.store_call(self.store.scan(&filter, limit)).await?;
    Ok(unscored(records, MatchKind::FilterOnly))
  }

  pub async fn all_models(&self) -> Result<Vec<String>> {
    self.store_call(self.store.model_names()).await
  }

  pub async fn stats(&self) -> Result<CatalogStats> {
    self.store_call(self.store.stats()).await
  }
}
