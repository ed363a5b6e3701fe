//! Quill - Citation-bearing question answering over a product catalog
//!
//! Classifies a free-text question, retrieves matching catalog rows with
//! hybrid filter-plus-vector search or runs a deterministic calculation, and
//! synthesizes an answer whose facts are tied back to stored spec fields.

pub mod calculator;
pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod models;
pub mod ports;
pub mod retriever;
pub mod server;
pub mod synthesizer;

pub use calculator::{CalculationEngine, CalculationError, CalculationParams, CalculationResult};
pub use catalog::InMemoryCatalog;
pub use classifier::IntentClassifier;
pub use config::Config;
pub use engine::QueryEngine;
pub use error::{QuillError, Result};
pub use models::{
  Citation, Filter, GeneratedAnswer, Intent, MatchKind, ProductRecord, QueryType, RetrievalResult,
  SpecSheet, SpecValue,
};
pub use retriever::HybridRetriever;
pub use synthesizer::AnswerSynthesizer;
