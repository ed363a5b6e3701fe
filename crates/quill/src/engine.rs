//! End-to-end query processing.
//!
//! A request moves through `classify -> route -> answer`. Routing either
//! resolves the query, blocks it with a canned response, or fails; failures
//! become a generic error answer so callers always get a `GeneratedAnswer`.

use std::sync::Arc;

use crate::calculator::{CalculationEngine, CalculationError, CalculationParams, CalculationResult};
use crate::classifier::IntentClassifier;
use crate::config::Config;
use crate::embeddings::CachedEmbedder;
use crate::error::Result;
use crate::models::{Filter, GeneratedAnswer, Intent, QueryType, RetrievalResult};
use crate::ports::{CatalogStats, CatalogStore, CompletionPort, EmbeddingPort};
use crate::retriever::HybridRetriever;
use crate::synthesizer::AnswerSynthesizer;

pub const EMPTY_QUERY: &str = "Please provide a query.";

pub const NO_MATCHES: &str = "I couldn't find any products matching your criteria. Try broadening \
                              your search or asking about specific models.";

pub const UNPARSEABLE_CALCULATION: &str = "I couldn't parse the calculation parameters. Please \
                                           specify speaker wattages and/or transformer capacity.";

pub const GUIDANCE: &str =
  "I'm not sure how to handle that query. Try asking about specific products or calculations.";

pub const GENERIC_ERROR: &str =
  "Sorry, something went wrong while processing your query. Please try again.";

/// How a classified request ended before being answered
enum Disposition {
  Resolved(GeneratedAnswer),
  Blocked(GeneratedAnswer),
}

/// Limits and canned text the engine needs from configuration
#[derive(Debug, Clone)]
struct EngineSettings {
  search_limit: usize,
  similar_limit: usize,
  purchase_response: String,
  domain_response: String,
}

impl From<&Config> for EngineSettings {
  fn from(config: &Config) -> Self {
    Self {
      search_limit: config.search_limit,
      similar_limit: config.similar_limit,
      purchase_response: config.purchase_response.clone(),
      domain_response: config.domain_response.clone(),
    }
  }
}

/// Holds every collaborator for the life of the process; share it behind an
/// `Arc`.
pub struct QueryEngine {
  classifier: IntentClassifier,
  retriever: HybridRetriever,
  synthesizer: AnswerSynthesizer,
  calculator: CalculationEngine,
  settings: EngineSettings,
}

impl QueryEngine {
  pub fn new(
    classifier: IntentClassifier,
    retriever: HybridRetriever,
    synthesizer: AnswerSynthesizer,
    config: &Config,
  ) -> Self {
    Self {
      classifier,
      retriever,
      synthesizer,
      calculator: CalculationEngine::new(),
      settings: EngineSettings::from(config),
    }
  }

  /// Wire an engine from configuration and the three ports.
  ///
  /// The completion port is only handed to the classifier and synthesizer
  /// when their config toggles are on.
  pub fn build(
    config: &Config,
    store: Arc<dyn CatalogStore>,
    embedding: Arc<dyn EmbeddingPort>,
    completion: Option<Arc<dyn CompletionPort>>,
  ) -> Result<Self> {
    config.validate()?;

    let embedder = CachedEmbedder::from_config(embedding, config);
    let retriever = HybridRetriever::new(Arc::new(embedder), store, config.store_timeout());

    let mut classifier = IntentClassifier::new()?;
    let mut synthesizer = AnswerSynthesizer::new().with_context_products(config.context_products);
    if let Some(completion) = completion {
      if config.use_llm_classifier {
        classifier = classifier.with_completion(completion.clone(), config.completion_timeout());
      }
      if config.use_llm_answers {
        synthesizer = synthesizer.with_completion(completion, config.completion_timeout());
      }
    }

    Ok(Self::new(classifier, retriever, synthesizer, config))
  }

  /// Answer one free-text query. Never fails; errors become an answer with
  /// `query_type = error`.
  pub async fn query(&self, text: &str) -> GeneratedAnswer {
    let text = text.trim();
    if text.is_empty() {
      return GeneratedAnswer::new(EMPTY_QUERY, QueryType::Error);
    }
    bentley::event_info!("query: {}", text.chars().take(100).collect::<String>());

    let intent = self.classifier.classify(text).await;
    bentley::debug!("classified as {intent}");

    match self.route(intent, text).await {
      Ok(Disposition::Resolved(answer)) => answer,
      Ok(Disposition::Blocked(answer)) => {
        bentley::event_warn!("blocked as {intent}");
        answer
      }
      Err(e) => {
        bentley::event_error!("query failed: {e}");
        GeneratedAnswer::new(GENERIC_ERROR, QueryType::Error)
      }
    }
  }

  async fn route(&self, intent: Intent, text: &str) -> Result<Disposition> {
    let answer = match intent {
      Intent::PurchaseIntent => {
        return Ok(Disposition::Blocked(self.canned(&self.settings.purchase_response, intent)))
      }
      Intent::DomainViolation => {
        return Ok(Disposition::Blocked(self.canned(&self.settings.domain_response, intent)))
      }
      Intent::DirectLookup => self.handle_lookup(text).await?,
      Intent::Calculation => self.handle_calculation(text),
      Intent::SemanticSearch => self.handle_search(text).await?,
      Intent::Unknown => GeneratedAnswer::new(GUIDANCE, QueryType::Unknown),
    };
    Ok(Disposition::Resolved(answer))
  }

  fn canned(&self, response: &str, intent: Intent) -> GeneratedAnswer {
    GeneratedAnswer::new(response, intent.into()).with_confidence(1.0)
  }

  async fn handle_lookup(&self, text: &str) -> Result<GeneratedAnswer> {
    let Some(model_name) = self.classifier.extract_model_name(text) else {
      bentley::debug!("no model name found, searching instead");
      return self.handle_search(text).await;
    };

    match self.retriever.direct_lookup(&model_name).await? {
      Some(hit) => Ok(self.synthesizer.direct_answer(&hit)),
      None => Ok(GeneratedAnswer::new(
        format!(
          "Product '{model_name}' was not found in the catalog. Please check the model name or \
           try a search."
        ),
        QueryType::DirectLookup,
      )),
    }
  }

  fn handle_calculation(&self, text: &str) -> GeneratedAnswer {
    let params = self.classifier.extract_calculation_params(text);
    if params.is_empty() {
      return AnswerSynthesizer::cannot_proceed(UNPARSEABLE_CALCULATION);
    }
    self.synthesizer.calculation_answer(&self.calculator.evaluate(&params))
  }

  async fn handle_search(&self, text: &str) -> Result<GeneratedAnswer> {
    let filter = self.classifier.extract_filters(text);
    let results = self.retriever.semantic_search(text, &filter, self.settings.search_limit).await?;
    if results.is_empty() {
      return Ok(GeneratedAnswer::new(NO_MATCHES, QueryType::SemanticSearch));
    }
    Ok(self.synthesizer.search_answer(text, &results).await)
  }

  // Direct operations
  // =================

  pub async fn get_product(&self, model_name: &str) -> Result<Option<RetrievalResult>> {
    self.retriever.direct_lookup(model_name).await
  }

  pub async fn search_products(
    &self,
    query: &str,
    filter: Option<Filter>,
    limit: Option<usize>,
  ) -> Result<Vec<RetrievalResult>> {
    let filter = filter.unwrap_or_else(|| self.classifier.extract_filters(query));
    let limit = limit.unwrap_or(self.settings.search_limit);
    self.retriever.semantic_search(query, &filter, limit).await
  }

  pub async fn find_similar(
    &self,
    model_name: &str,
    limit: Option<usize>,
  ) -> Result<Vec<RetrievalResult>> {
    let limit = limit.unwrap_or(self.settings.similar_limit);
    self.retriever.find_similar(model_name, limit).await
  }

  pub async fn browse_category(&self, category: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
    self.retriever.browse_category(category, limit).await
  }

  /// Comparison table for the models that exist; missing ones are listed
  /// under the table
  pub async fn compare(&self, model_names: &[String]) -> Result<GeneratedAnswer> {
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for name in model_names {
      match self.retriever.direct_lookup(name).await? {
        Some(hit) => found.push(hit),
        None => missing.push(name.as_str()),
      }
    }

    let answer = self.synthesizer.compare(&found);
    if missing.is_empty() {
      return Ok(answer);
    }

    let note = format!("Not found in the catalog: {}", missing.join(", "));
    let text = if found.is_empty() { note } else { format!("{}\n\n{note}", answer.answer()) };
    Ok(
      GeneratedAnswer::new(text, answer.query_type())
        .with_citations(answer.citations().to_vec())
        .with_confidence(answer.confidence())
        .with_products(answer.products_used().to_vec()),
    )
  }

  pub async fn list_models(&self) -> Result<Vec<String>> {
    self.retriever.all_models().await
  }

  pub fn calculate(
    &self,
    params: &CalculationParams,
  ) -> std::result::Result<CalculationResult, CalculationError> {
    self.calculator.evaluate(params)
  }

  pub async fn stats(&self) -> Result<CatalogStats> {
    self.retriever.stats().await
  }

  pub fn classifier(&self) -> &IntentClassifier {
    &self.classifier
  }
}
