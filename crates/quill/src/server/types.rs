//! REST API types with schemars annotations for OpenAPI generation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{Citation, Filter, GeneratedAnswer, RetrievalResult};
use crate::ports::CatalogStats;

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  /// The latest version of the API
  pub latest: String,

  /// The version of the API requested by the client
  pub requested: String,

  /// The version of the API that was used in producing the response
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

// Status/Version Endpoints
// =======================

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  /// Products in the loaded catalog
  pub products: usize,
  pub with_embeddings: usize,
}

// Query Endpoint
// ==============

/// Request for /query endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryRequest {
  /// Free-text question
  pub query: String,
}

/// Answer envelope for /query and /products/compare
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AnswerResponse {
  pub answer: String,
  pub citations: Vec<CitationData>,
  /// 0.0 - 1.0
  pub confidence: f32,
  /// Intent tag, or `error`
  pub query_type: String,
  pub products_used: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CitationData {
  pub model_name: String,
  /// Spec label as stored in the catalog
  pub field: String,
  pub value: serde_json::Value,
  pub source_reference: Option<String>,
}

// Product Endpoints
// =================

/// Request for /products/get endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetProductRequest {
  pub model_name: String,
}

/// Response for /products/get endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetProductResponse {
  pub product: ProductData,
}

/// Request for /products/similar endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimilarProductsRequest {
  /// Reference product
  pub model_name: String,

  /// Max results (server default when omitted)
  #[serde(default)]
  pub limit: Option<usize>,
}

/// Default result count for /products/search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Request for /products/search endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchProductsRequest {
  /// Text ranked by embedding similarity
  pub query: String,

  #[serde(default)]
  pub min_watts: Option<i64>,

  #[serde(default)]
  pub max_watts: Option<i64>,

  /// "70V", "100V", "70V/100V" or "Low-Z"
  #[serde(default)]
  pub voltage_type: Option<String>,

  #[serde(default)]
  pub category: Option<String>,

  #[serde(default)]
  pub series: Option<String>,

  #[serde(default)]
  pub limit: Option<usize>,
}

impl SearchProductsRequest {
  /// Explicit predicates only; nothing is inferred from the query text
  pub fn filter(&self) -> Filter {
    Filter {
      min_watts: self.min_watts,
      max_watts: self.max_watts,
      voltage_type: self.voltage_type.clone(),
      category: self.category.clone(),
      series: self.series.clone(),
    }
  }
}

/// Request for /products/compare endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CompareProductsRequest {
  /// Two or more model names
  pub model_names: Vec<String>,
}

/// Query parameters for /products/list
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListProductsParams {
  /// Restrict to one category
  pub category: Option<String>,

  #[serde(default)]
  pub limit: Option<usize>,
}

/// Response for /products/list endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListProductsResponse {
  pub models: Vec<String>,
  pub count: usize,
}

/// Response for /products/similar and /products/search
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProductsResponse {
  pub products: Vec<ProductData>,
  pub count: usize,
}

/// One catalog row as returned by the API
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProductData {
  pub model_name: String,
  pub category: Option<String>,
  pub series: Option<String>,
  /// Spec label to value, in catalog order
  pub specs: serde_json::Value,
  pub ai_summary: Option<String>,
  pub source_reference: Option<String>,
  pub similarity_score: f32,
  /// exact, substring, vector or filter_only
  pub match_kind: String,
}

/// Response for /products/stats endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatsResponse {
  pub total_products: usize,
  pub with_embeddings: usize,
  pub by_category: BTreeMap<String, usize>,
}

// Conversions
// ===========

impl From<&Citation> for CitationData {
  fn from(citation: &Citation) -> Self {
    Self {
      model_name: citation.model_name.clone(),
      field: citation.field.clone(),
      value: serde_json::to_value(&citation.value).unwrap_or_default(),
      source_reference: citation.source_reference.clone(),
    }
  }
}

impl From<&GeneratedAnswer> for AnswerResponse {
  fn from(answer: &GeneratedAnswer) -> Self {
    Self {
      answer: answer.answer().to_string(),
      citations: answer.citations().iter().map(CitationData::from).collect(),
      confidence: answer.confidence(),
      query_type: answer.query_type().as_str().to_string(),
      products_used: answer.products_used().to_vec(),
    }
  }
}

impl From<&RetrievalResult> for ProductData {
  fn from(result: &RetrievalResult) -> Self {
    let record = &result.record;
    Self {
      model_name: record.model_name.clone(),
      category: record.category.clone(),
      series: record.series.clone(),
      specs: serde_json::to_value(&record.specs).unwrap_or_default(),
      ai_summary: result.ai_summary.clone(),
      source_reference: record.source_reference.clone(),
      similarity_score: result.similarity_score,
      match_kind: result.match_kind.as_str().to_string(),
    }
  }
}

impl From<CatalogStats> for StatsResponse {
  fn from(stats: CatalogStats) -> Self {
    Self {
      total_products: stats.total_products,
      with_embeddings: stats.with_embeddings,
      by_category: stats.by_category,
    }
  }
}

// Helper Functions
// ================

fn version_info() -> VersionInfo {
  let version = env!("CARGO_PKG_VERSION");
  VersionInfo {
    latest: version.to_string(),
    requested: version.to_string(),
    resolved: version.to_string(),
  }
}

impl<T> BaseResponse<T> {
  /// Create a successful response
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: version_info(), transaction_id, errors: Vec::new(), data }
  }

  /// Create an error response
  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: version_info(), transaction_id, errors, data: () }
  }
}

impl ApiError {
  /// Create a new API error
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string(), context: serde_json::Value::Null }
  }
}
