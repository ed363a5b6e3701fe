//! Ollama HTTP adapter for embeddings and completions.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionOptions, CompletionPort, EmbeddingPort};
use crate::config::Config;
use crate::error::{QuillError, Result};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to one Ollama server; cheap to clone
#[derive(Debug, Clone)]
pub struct OllamaClient {
  http: reqwest::Client,
  base_url: String,
  embedding_model: String,
  completion_model: String,
  dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateOptions {
  temperature: f32,
  num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: &'a str,
  stream: bool,
  options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  response: String,
}

impl OllamaClient {
  pub fn new(config: &Config) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: config.base_url().to_string(),
      embedding_model: config.embedding_model.clone(),
      completion_model: config.completion_model.clone(),
      dimension: config.embedding_dimension,
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// `true` if the server answers `/api/tags` with a success status
  pub async fn health_check(&self) -> bool {
    let url = format!("{}/api/tags", self.base_url);
    match self.http.get(&url).timeout(HEALTH_CHECK_TIMEOUT).send().await {
      Ok(response) if response.status().is_success() => {
        bentley::debug!("ollama reachable at {}", self.base_url);
        true
      }
      Ok(response) => {
        bentley::warn!("ollama health check failed: {}", response.status());
        false
      }
      Err(e) => {
        bentley::warn!("ollama unreachable at {}: {e}", self.base_url);
        false
      }
    }
  }

  async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
    &self,
    path: &str,
    body: &Req,
  ) -> Result<Resp> {
    let url = format!("{}{path}", self.base_url);
    let response = self.http.post(&url).json(body).send().await?.error_for_status()?;
    Ok(response.json().await?)
  }
}

#[async_trait]
impl EmbeddingPort for OllamaClient {
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let request = EmbeddingRequest { model: &self.embedding_model, prompt: text };
    let response: EmbeddingResponse = self.post_json("/api/embeddings", &request).await?;

    if response.embedding.is_empty() {
      return Err(QuillError::embedding("server returned an empty embedding"));
    }
    if response.embedding.len() != self.dimension {
      bentley::warn!(
        "embedding dimension mismatch: expected {}, got {}",
        self.dimension,
        response.embedding.len()
      );
    }

    Ok(response.embedding)
  }
}

#[async_trait]
impl CompletionPort for OllamaClient {
  async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
    let request = GenerateRequest {
      model: &self.completion_model,
      prompt,
      stream: false,
      options: GenerateOptions { temperature: options.temperature, num_predict: options.max_tokens },
    };
    let response: GenerateResponse = self.post_json("/api/generate", &request).await?;

    let text = response.response.trim();
    if text.is_empty() {
      return Err(QuillError::completion("server returned an empty response"));
    }
    Ok(text.to_string())
  }
}
