//! Query embedding with a process-wide cache, timeouts and bounded batching.

use async_trait::async_trait;
use futures::future::join_all;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{Operation, QuillError, Result};
use crate::ports::EmbeddingPort;

const CACHE_IDLE_TTL: Duration = Duration::from_secs(3600);

/// Content hash used as the cache key
pub fn content_key(text: &str) -> String {
  blake3::hash(text.trim().as_bytes()).to_hex().to_string()
}

/// Wraps an embedding port with caching and a per-call timeout.
///
/// Concurrent misses for the same text may both reach the port; the later
/// write simply overwrites an identical vector.
pub struct CachedEmbedder {
  inner: Arc<dyn EmbeddingPort>,
  cache: Cache<String, Vec<f32>>,
  timeout: Duration,
  permits: Arc<Semaphore>,
}

impl CachedEmbedder {
  pub fn new(
    inner: Arc<dyn EmbeddingPort>,
    capacity: u64,
    timeout: Duration,
    concurrency: usize,
  ) -> Self {
    let cache = Cache::builder().max_capacity(capacity).time_to_idle(CACHE_IDLE_TTL).build();
    Self { inner, cache, timeout, permits: Arc::new(Semaphore::new(concurrency.max(1))) }
  }

  /// Cache size, timeout and batch concurrency taken from `config`
  pub fn from_config(inner: Arc<dyn EmbeddingPort>, config: &Config) -> Self {
    Self::new(inner, config.cache_capacity, config.embedding_timeout(), config.embed_concurrency)
  }

  /// Embed many texts with at most `concurrency` calls in flight.
  /// Results are in input order.
  pub async fn embed_batch(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
    let calls = texts.iter().map(|text| async move {
      let _permit =
        self.permits.acquire().await.map_err(|e| QuillError::embedding(e.to_string()))?;
      self.embed(text).await
    });
    join_all(calls).await
  }

  async fn fetch(&self, text: &str) -> Result<Vec<f32>> {
    match tokio::time::timeout(self.timeout, self.inner.embed(text)).await {
      Ok(result) => result,
      Err(_) => Err(QuillError::Timeout {
        operation: Operation::Embedding,
        after_ms: self.timeout.as_millis() as u64,
      }),
    }
  }
}

#[async_trait]
impl EmbeddingPort for CachedEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
      return Err(QuillError::embedding("cannot embed empty text"));
    }

    let key = content_key(trimmed);
    if let Some(hit) = self.cache.get(&key) {
      return Ok(hit);
    }

    let vector = self.fetch(trimmed).await?;
    self.cache.insert(key, vector.clone());
    Ok(vector)
  }
}
