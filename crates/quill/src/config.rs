//! Configuration management for Quill
//!
//! Every field has a default, so a partial config file (or none at all) is
//! valid. CLI flags override the Ollama URL and catalog path after loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{QuillError, Result};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// Base URL of the Ollama-compatible inference server
  #[serde(default = "default_ollama_base_url")]
  pub ollama_base_url: String,
  #[serde(default = "default_embedding_model")]
  pub embedding_model: String,
  #[serde(default = "default_completion_model")]
  pub completion_model: String,
  /// Expected embedding length; mismatches are logged, not rejected
  #[serde(default = "default_embedding_dimension")]
  pub embedding_dimension: usize,

  #[serde(default = "default_embedding_timeout_ms")]
  pub embedding_timeout_ms: u64,
  #[serde(default = "default_completion_timeout_ms")]
  pub completion_timeout_ms: u64,
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms: u64,

  /// Default result count for semantic search
  #[serde(default = "default_search_limit")]
  pub search_limit: usize,
  #[serde(default = "default_similar_limit")]
  pub similar_limit: usize,
  /// Products handed to the completion model as context
  #[serde(default = "default_context_products")]
  pub context_products: usize,
  /// Concurrent embedding calls during batch embedding
  #[serde(default = "default_embed_concurrency")]
  pub embed_concurrency: usize,
  /// Entries kept in the query embedding cache
  #[serde(default = "default_cache_capacity")]
  pub cache_capacity: u64,

  /// Ask the completion model when no classification rule matches
  #[serde(default = "default_use_llm_classifier")]
  pub use_llm_classifier: bool,
  /// Use the completion model to write semantic search answers
  #[serde(default = "default_use_llm_answers")]
  pub use_llm_answers: bool,

  /// JSON export of catalog rows
  #[serde(default = "default_catalog_path")]
  pub catalog_path: PathBuf,

  #[serde(default = "default_purchase_response")]
  pub purchase_response: String,
  #[serde(default = "default_domain_response")]
  pub domain_response: String,
}

fn default_ollama_base_url() -> String {
  "http://localhost:11434".to_string()
}
fn default_embedding_model() -> String {
  "bge-m3".to_string()
}
fn default_completion_model() -> String {
  "llama3.2:3b".to_string()
}
fn default_embedding_dimension() -> usize {
  1024
}
fn default_embedding_timeout_ms() -> u64 {
  10_000
}
fn default_completion_timeout_ms() -> u64 {
  60_000
}
fn default_store_timeout_ms() -> u64 {
  3_000
}
fn default_search_limit() -> usize {
  10
}
fn default_similar_limit() -> usize {
  5
}
fn default_context_products() -> usize {
  5
}
fn default_embed_concurrency() -> usize {
  5
}
fn default_cache_capacity() -> u64 {
  10_000
}
fn default_use_llm_classifier() -> bool {
  true
}
fn default_use_llm_answers() -> bool {
  true
}
fn default_catalog_path() -> PathBuf {
  PathBuf::from("data/catalog.json")
}
fn default_purchase_response() -> String {
  "I am a technical assistant. For pricing and availability, please contact your sales \
   representative."
    .to_string()
}
fn default_domain_response() -> String {
  "I can only provide information on products in this catalog.".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      ollama_base_url: default_ollama_base_url(),
      embedding_model: default_embedding_model(),
      completion_model: default_completion_model(),
      embedding_dimension: default_embedding_dimension(),
      embedding_timeout_ms: default_embedding_timeout_ms(),
      completion_timeout_ms: default_completion_timeout_ms(),
      store_timeout_ms: default_store_timeout_ms(),
      search_limit: default_search_limit(),
      similar_limit: default_similar_limit(),
      context_products: default_context_products(),
      embed_concurrency: default_embed_concurrency(),
      cache_capacity: default_cache_capacity(),
      use_llm_classifier: default_use_llm_classifier(),
      use_llm_answers: default_use_llm_answers(),
      catalog_path: default_catalog_path(),
      purchase_response: default_purchase_response(),
      domain_response: default_domain_response(),
    }
  }
}

impl Config {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load from the first config file found, or defaults
  pub fn load() -> Result<Self> {
    for path in Self::search_paths() {
      if path.exists() {
        bentley::debug!("loading config from {}", path.display());
        return Self::load_from_file(path);
      }
    }

    Ok(Config::default())
  }

  /// Save configuration to a file
  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  /// `.quill.json`, `quill.json`, then `~/.quill/config.json`
  pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".quill.json"), PathBuf::from("quill.json")];
    if let Some(home) = dirs::home_dir() {
      paths.push(home.join(".quill").join("config.json"));
    }
    paths
  }

  pub fn validate(&self) -> Result<()> {
    if !self.ollama_base_url.starts_with("http://") && !self.ollama_base_url.starts_with("https://")
    {
      return Err(QuillError::config("ollama_base_url must start with http:// or https://"));
    }
    if self.embed_concurrency == 0 {
      return Err(QuillError::config("embed_concurrency must be at least 1"));
    }
    if self.search_limit == 0 || self.similar_limit == 0 {
      return Err(QuillError::config("search and similar limits must be at least 1"));
    }
    Ok(())
  }

  pub fn embedding_timeout(&self) -> Duration {
    Duration::from_millis(self.embedding_timeout_ms)
  }

  pub fn completion_timeout(&self) -> Duration {
    Duration::from_millis(self.completion_timeout_ms)
  }

  pub fn store_timeout(&self) -> Duration {
    Duration::from_millis(self.store_timeout_ms)
  }

  /// Base URL without a trailing slash
  pub fn base_url(&self) -> &str {
    self.ollama_base_url.trim_end_matches('/')
  }
}
