mod common;

use common::{
  engine, engine_with_completion, fixture_catalog, CountingStore, FakeCompletion, FakeEmbedder,
  HangingStore,
};
use quill::calculator::{CalculationError, CalculationParams};
use quill::config::Config;
use quill::engine::{EMPTY_QUERY, GENERIC_ERROR, UNPARSEABLE_CALCULATION};
use quill::models::{MatchKind, QueryType};
use quill::synthesizer::{AnswerSynthesizer, FALLBACK_CONFIDENCE};
use std::sync::Arc;
use std::time::Duration;

fn counting_store() -> Arc<CountingStore> {
  Arc::new(CountingStore::new(fixture_catalog()))
}

fn near_loudspeakers() -> Arc<FakeEmbedder> {
  Arc::new(FakeEmbedder::returning(vec![1.0, 0.0, 0.0, 0.0]))
}

#[tokio::test]
async fn test_purchase_questions_never_reach_the_catalog() {
  let store = counting_store();
  let embedder = near_loudspeakers();
  let engine = engine(store.clone(), embedder.clone());

  let answer = engine.query("What's the price of a DM6SE?").await;

  assert_eq!(answer.query_type(), QueryType::PurchaseIntent);
  assert_eq!(answer.answer(), Config::default().purchase_response);
  assert!(answer.citations().is_empty());
  assert_eq!(store.call_count(), 0);
  assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn test_competitor_questions_are_blocked() {
  let store = counting_store();
  let engine = engine(store.clone(), near_loudspeakers());

  let answer = engine.query("Is JBL's 70V amp better for 4x30W?").await;

  assert_eq!(answer.query_type(), QueryType::DomainViolation);
  assert_eq!(answer.answer(), Config::default().domain_response);
  assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_direct_lookup_cites_stored_values() {
  let catalog = fixture_catalog();
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let answer = engine.query("What's the power of dm6se?").await;

  assert_eq!(answer.query_type(), QueryType::DirectLookup);
  assert_eq!(answer.confidence(), 1.0);
  assert_eq!(answer.products_used(), ["DM6SE".to_string()]);
  assert!(!answer.citations().is_empty());

  let stored = catalog.records().iter().find(|r| r.model_name == "DM6SE").unwrap();
  for citation in answer.citations() {
    assert!(citation.model_name.eq_ignore_ascii_case("dm6se"));
    assert_eq!(stored.specs.get(&citation.field), Some(&citation.value));
    assert_eq!(citation.source_reference.as_deref(), Some("DM6SE_spec_sheet.pdf"));
  }
}

#[tokio::test]
async fn test_direct_lookup_cites_raw_column_labels() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let answer = engine.query("Show me the specs for DM3SE").await;

  assert_eq!(answer.query_type(), QueryType::DirectLookup);
  assert!(answer.answer().contains("- **Power**: 30 W"));
  let fields: Vec<&str> = answer.citations().iter().map(|c| c.field.as_str()).collect();
  assert!(fields.contains(&"Power Handling (Long-term)"));
  assert!(fields.contains(&"Nominal Impedance"));
}

#[tokio::test]
async fn test_unknown_model_gets_an_explicit_not_found() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let answer = engine.query("What's the power of DM99?").await;

  assert_eq!(answer.query_type(), QueryType::DirectLookup);
  assert!(answer.answer().contains("'DM99' was not found"));
  assert!(answer.citations().is_empty());
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_filter_scan() {
  let embedder = Arc::new(FakeEmbedder::failing());
  let engine = engine(Arc::new(fixture_catalog()), embedder);

  let results = engine.search_products("Find 70V speakers", None, None).await.unwrap();

  let names: Vec<&str> = results.iter().map(|r| r.model_name()).collect();
  assert_eq!(names, vec!["DM3SE", "DM6SE", "DM8SE", "EM90"]);
  for result in &results {
    assert_eq!(result.similarity_score, 0.0);
    assert_eq!(result.match_kind, MatchKind::FilterOnly);
  }

  let answer = engine.query("Find 70V speakers").await;
  assert_eq!(answer.query_type(), QueryType::SemanticSearch);
  assert_eq!(answer.confidence(), FALLBACK_CONFIDENCE);
  assert_eq!(answer.products_used().len(), 4);
}

#[tokio::test]
async fn test_vector_search_ranks_and_filters() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let results = engine.search_products("Find 70V speakers", None, None).await.unwrap();

  let names: Vec<&str> = results.iter().map(|r| r.model_name()).collect();
  assert_eq!(names, vec!["DM3SE", "DM6SE", "DM8SE", "EM90"]);
  assert!(results.iter().all(|r| r.match_kind == MatchKind::Vector));
  assert!(results.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));
}

#[tokio::test]
async fn test_generated_search_answer_cites_named_products() {
  let completion = Arc::new(FakeCompletion::replying("The DM6SE handles 60 W on 70V lines."));
  let engine =
    engine_with_completion(Arc::new(fixture_catalog()), near_loudspeakers(), completion.clone());

  let answer = engine.query("Recommend 70V speakers for a lobby").await;

  assert_eq!(answer.query_type(), QueryType::SemanticSearch);
  assert_eq!(answer.products_used(), ["DM6SE".to_string()]);
  assert!(answer.citations().iter().all(|c| c.model_name == "DM6SE"));
  assert!(answer.confidence() > FALLBACK_CONFIDENCE);

  let prompts = completion.prompts();
  assert_eq!(prompts.len(), 1);
  assert!(prompts[0].contains("Recommend 70V speakers for a lobby"));
}

#[tokio::test]
async fn test_completion_failure_falls_back_to_listing() {
  let completion = Arc::new(FakeCompletion::failing());
  let engine = engine_with_completion(Arc::new(fixture_catalog()), near_loudspeakers(), completion);

  let answer = engine.query("Find 70V speakers").await;

  assert_eq!(answer.query_type(), QueryType::SemanticSearch);
  assert_eq!(answer.confidence(), FALLBACK_CONFIDENCE);
  assert!(answer.answer().contains("**DM3SE** (loudspeaker)"));
}

#[tokio::test]
async fn test_compatibility_calculation() {
  let store = counting_store();
  let engine = engine(store.clone(), near_loudspeakers());

  let answer = engine.query("Can I connect 4x30W speakers to a 150W transformer?").await;

  assert_eq!(answer.query_type(), QueryType::Calculation);
  assert_eq!(answer.confidence(), 1.0);
  assert!(answer.answer().contains("compatible"));
  assert!(answer.answer().contains("**Headroom**: 20.0%"));
  assert!(answer.citations().is_empty());
  assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_calculation_is_a_structured_answer() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let answer = engine.query("Calculate impedance of 0 ohm and 8 ohm in parallel").await;

  assert_eq!(answer.query_type(), QueryType::Calculation);
  assert_eq!(answer.confidence(), 0.0);
  assert!(answer.answer().contains("0Ω speaker in parallel"));
}

#[tokio::test]
async fn test_calculation_without_numbers() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let answer = engine.query("calculate something for me").await;

  assert_eq!(answer.answer(), UNPARSEABLE_CALCULATION);
  assert_eq!(answer.confidence(), 0.0);
}

#[tokio::test]
async fn test_empty_query() {
  let store = counting_store();
  let engine = engine(store.clone(), near_loudspeakers());

  let answer = engine.query("   ").await;

  assert_eq!(answer.answer(), EMPTY_QUERY);
  assert_eq!(answer.query_type(), QueryType::Error);
  assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_store_failure_becomes_generic_error() {
  let store = Arc::new(CountingStore::failing(fixture_catalog()));
  let engine = engine(store, near_loudspeakers());

  let answer = engine.query("What's the power of DM6SE?").await;

  assert_eq!(answer.query_type(), QueryType::Error);
  assert_eq!(answer.answer(), GENERIC_ERROR);
  assert!(answer.citations().is_empty());
  assert!(!answer.answer().contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_store_timeout_becomes_generic_error() {
  let engine = engine(Arc::new(HangingStore), near_loudspeakers());

  let answer = tokio::time::timeout(Duration::from_secs(60), engine.query("specs for DM6SE"))
    .await
    .expect("store timeout should end the request");

  assert_eq!(answer.query_type(), QueryType::Error);
  assert_eq!(answer.answer(), GENERIC_ERROR);
}

#[tokio::test]
async fn test_compare_reports_missing_models() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let answer =
    engine.compare(&["DM6SE".to_string(), "DM8SE".to_string(), "XX1".to_string()]).await.unwrap();

  assert!(answer.answer().starts_with("| Metric | DM6SE | DM8SE |"));
  assert!(answer.answer().contains("Not found in the catalog: XX1"));
  assert_eq!(answer.products_used(), ["DM6SE".to_string(), "DM8SE".to_string()]);
}

#[tokio::test]
async fn test_find_similar_prefers_same_category() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  let results = engine.find_similar("DM3SE", Some(10)).await.unwrap();

  let names: Vec<&str> = results.iter().map(|r| r.model_name()).collect();
  assert!(!names.contains(&"DM3SE"));
  assert_eq!(&names[..4], ["DM6SE", "AM10/60", "DM8SE", "EM90"]);
  assert!(names[4..].iter().all(|n| ["FS2SE", "IZA 250-LZ", "IZA 500-70V"].contains(n)));
}

#[tokio::test]
async fn test_classification_is_idempotent() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());

  for text in ["Find 70V speakers", "What's the power of DM6SE?", "4x30W on 150W amp", "hello"] {
    let first = engine.classifier().classify(text).await;
    let second = engine.classifier().classify(text).await;
    assert_eq!(first, second, "{text}");
  }
}

#[tokio::test]
async fn test_huge_wattages_still_get_an_answer() {
  let store = counting_store();
  let engine = engine(store.clone(), near_loudspeakers());

  for text in [
    "Can I connect 2x9223372036854775807W speakers to a 150W transformer?",
    "Calculate the total for 3x9223372036854775807W",
    "What transformer do I need for 9223372036854775807W?",
    "How many 9223372036854775807W speakers can I put on a 150W amp?",
  ] {
    let answer = engine.query(text).await;
    assert_eq!(answer.query_type(), QueryType::Calculation, "{text}");
    assert_eq!(answer.confidence(), 0.0, "{text}");
    assert!(answer.citations().is_empty(), "{text}");
  }
  assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_overflowing_calculation_is_a_structured_answer() {
  let engine = engine(Arc::new(fixture_catalog()), near_loudspeakers());
  let params = CalculationParams {
    speakers: vec![i64::MAX, 1],
    transformer_watts: Some(150),
    ..Default::default()
  };

  let outcome = engine.calculate(&params);
  assert_eq!(outcome, Err(CalculationError::Overflow));

  let answer = AnswerSynthesizer::new().calculation_answer(&outcome);
  assert_eq!(answer.query_type(), QueryType::Calculation);
  assert_eq!(answer.confidence(), 0.0);
  assert!(answer.answer().contains("too large"));
}
