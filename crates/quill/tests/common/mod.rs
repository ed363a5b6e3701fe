#![allow(dead_code)]

use async_trait::async_trait;
use quill::catalog::InMemoryCatalog;
use quill::config::Config;
use quill::engine::QueryEngine;
use quill::error::{QuillError, Result};
use quill::models::{Filter, ProductRecord};
use quill::ports::{
  CatalogStats, CatalogStore, CompletionOptions, CompletionPort, EmbeddingPort, NeighborQuery,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn fixture_path() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("catalog.json")
}

pub fn fixture_catalog() -> InMemoryCatalog {
  InMemoryCatalog::from_path(fixture_path()).unwrap()
}

/// Embedder returning one fixed vector, or failing on demand
pub struct FakeEmbedder {
  pub vector: Vec<f32>,
  pub should_fail: bool,
  pub calls: AtomicUsize,
}

impl FakeEmbedder {
  pub fn returning(vector: Vec<f32>) -> Self {
    Self { vector, should_fail: false, calls: AtomicUsize::new(0) }
  }

  pub fn failing() -> Self {
    Self { vector: Vec::new(), should_fail: true, calls: AtomicUsize::new(0) }
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl EmbeddingPort for FakeEmbedder {
  async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.should_fail {
      return Err(QuillError::embedding("embedding service unavailable"));
    }
    Ok(self.vector.clone())
  }
}

/// Completion port with a canned reply; `None` fails every call
pub struct FakeCompletion {
  pub reply: Option<String>,
  pub prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
  pub fn replying(reply: &str) -> Self {
    Self { reply: Some(reply.to_string()), prompts: Mutex::new(Vec::new()) }
  }

  pub fn failing() -> Self {
    Self { reply: None, prompts: Mutex::new(Vec::new()) }
  }

  pub fn prompts(&self) -> Vec<String> {
    self.prompts.lock().unwrap().clone()
  }
}

#[async_trait]
impl CompletionPort for FakeCompletion {
  async fn complete(&self, prompt: &str, _options: CompletionOptions) -> Result<String> {
    self.prompts.lock().unwrap().push(prompt.to_string());
    match &self.reply {
      Some(reply) => Ok(reply.clone()),
      None => Err(QuillError::completion("model offline")),
    }
  }
}

/// Wraps the in-memory catalog, counting every call and optionally failing
pub struct CountingStore {
  pub inner: InMemoryCatalog,
  pub should_fail: bool,
  pub calls: AtomicUsize,
}

impl CountingStore {
  pub fn new(inner: InMemoryCatalog) -> Self {
    Self { inner, should_fail: false, calls: AtomicUsize::new(0) }
  }

  pub fn failing(inner: InMemoryCatalog) -> Self {
    Self { inner, should_fail: true, calls: AtomicUsize::new(0) }
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn enter(&self) -> Result<()> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.should_fail {
      return Err(QuillError::store("connection refused"));
    }
    Ok(())
  }
}

#[async_trait]
impl CatalogStore for CountingStore {
  async fn find_exact(&self, model_name: &str) -> Result<Option<ProductRecord>> {
    self.enter()?;
    self.inner.find_exact(model_name).await
  }

  async fn find_containing(&self, fragment: &str) -> Result<Option<ProductRecord>> {
    self.enter()?;
    self.inner.find_containing(fragment).await
  }

  async fn scan(&self, filter: &Filter, limit: usize) -> Result<Vec<ProductRecord>> {
    self.enter()?;
    self.inner.scan(filter, limit).await
  }

  async fn nearest(&self, query: &NeighborQuery) -> Result<Vec<(ProductRecord, f32)>> {
    self.enter()?;
    self.inner.nearest(query).await
  }

  async fn model_names(&self) -> Result<Vec<String>> {
    self.enter()?;
    self.inner.model_names().await
  }

  async fn stats(&self) -> Result<CatalogStats> {
    self.enter()?;
    self.inner.stats().await
  }
}

/// Store that never answers
pub struct HangingStore;

#[async_trait]
impl CatalogStore for HangingStore {
  async fn find_exact(&self, _model_name: &str) -> Result<Option<ProductRecord>> {
    std::future::pending().await
  }

  async fn find_containing(&self, _fragment: &str) -> Result<Option<ProductRecord>> {
    std::future::pending().await
  }

  async fn scan(&self, _filter: &Filter, _limit: usize) -> Result<Vec<ProductRecord>> {
    std::future::pending().await
  }

  async fn nearest(&self, _query: &NeighborQuery) -> Result<Vec<(ProductRecord, f32)>> {
    std::future::pending().await
  }

  async fn model_names(&self) -> Result<Vec<String>> {
    std::future::pending().await
  }

  async fn stats(&self) -> Result<CatalogStats> {
    std::future::pending().await
  }
}

/// Engine over the given store and embedder, with no completion model
pub fn engine(store: Arc<dyn CatalogStore>, embedder: Arc<dyn EmbeddingPort>) -> QueryEngine {
  QueryEngine::build(&Config::default(), store, embedder, None).unwrap()
}

pub fn engine_with_completion(
  store: Arc<dyn CatalogStore>,
  embedder: Arc<dyn EmbeddingPort>,
  completion: Arc<dyn CompletionPort>,
) -> QueryEngine {
  QueryEngine::build(&Config::default(), store, embedder, Some(completion)).unwrap()
}
