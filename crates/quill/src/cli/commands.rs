//! CLI command implementations

use anyhow::{anyhow, Result};
use colored::*;
use std::sync::Arc;

use crate::calculator::{CalculationEngine, CalculationError, CalculationResult};
use crate::catalog::InMemoryCatalog;
use crate::cli::display;
use crate::config::Config;
use crate::embeddings::CachedEmbedder;
use crate::engine::QueryEngine;
use crate::models::Filter;
use crate::ports::{CompletionPort, OllamaClient};
use crate::synthesizer::AnswerSynthesizer;

/// Load the catalog and wire an engine against the configured Ollama host
pub async fn build_engine(config: &Config) -> Result<QueryEngine> {
  let path = config.catalog_path.display();
  let mut catalog = InMemoryCatalog::from_path(&config.catalog_path)
    .map_err(|e| anyhow!("Failed to load catalog from {path}: {e}"))?;

  let ollama = Arc::new(OllamaClient::new(config));
  if ollama.health_check().await {
    catalog.embed_missing(&CachedEmbedder::from_config(ollama.clone(), config)).await;
  } else {
    bentley::warn!(
      "Ollama is not reachable at {}; answers will use the deterministic fallbacks",
      ollama.base_url()
    );
  }

  let completion: Arc<dyn CompletionPort> = ollama.clone();
  Ok(QueryEngine::build(config, Arc::new(catalog), ollama, Some(completion))?)
}

/// Answer a free-text question
pub async fn ask(engine: &QueryEngine, question: &str, json: bool) -> Result<()> {
  let answer = engine.query(question).await;
  if json {
    return display::print_json(&answer);
  }
  display::display_answer(&answer);
  Ok(())
}

/// Show the full spec sheet for one model
pub async fn specs(engine: &QueryEngine, model_name: &str, json: bool) -> Result<()> {
  let Some(hit) = engine.get_product(model_name).await? else {
    return Err(anyhow!("Product '{model_name}' was not found in the catalog"));
  };

  if json {
    return display::print_json(&hit);
  }
  display::display_product(&hit);
  Ok(())
}

/// Semantic search restricted by explicit filters
pub async fn search(
  engine: &QueryEngine,
  query: &str,
  filter: Filter,
  limit: usize,
  json: bool,
) -> Result<()> {
  if let (Some(min), Some(max)) = (filter.min_watts, filter.max_watts) {
    if min > max {
      return Err(anyhow!("--min-watts ({min}) is greater than --max-watts ({max})"));
    }
  }

  let results = engine.search_products(query, Some(filter), Some(limit)).await?;
  if json {
    return display::print_json(&results);
  }
  display::display_results(&results);
  Ok(())
}

/// Products nearest to a reference model
pub async fn similar(
  engine: &QueryEngine,
  model_name: &str,
  limit: Option<usize>,
  json: bool,
) -> Result<()> {
  let Some(reference) = engine.get_product(model_name).await? else {
    return Err(anyhow!("Product '{model_name}' was not found in the catalog"));
  };
  let results = engine.find_similar(reference.model_name(), limit).await?;

  if json {
    return display::print_json(&results);
  }
  println!("Products similar to {}:", reference.model_name().yellow().bold());
  display::display_results(&results);
  Ok(())
}

/// All model names, or those in one category
pub async fn models(
  engine: &QueryEngine,
  category: Option<&str>,
  limit: Option<usize>,
  json: bool,
) -> Result<()> {
  let mut names: Vec<String> = match category {
    Some(category) => engine
      .browse_category(category, limit.unwrap_or(usize::MAX))
      .await?
      .into_iter()
      .map(|result| result.record.model_name)
      .collect(),
    None => engine.list_models().await?,
  };
  if let Some(limit) = limit {
    names.truncate(limit);
  }

  if json {
    return display::print_json(&names);
  }
  display::display_names(&names);
  Ok(())
}

/// Side-by-side comparison table
pub async fn compare(engine: &QueryEngine, model_names: &[String], json: bool) -> Result<()> {
  if model_names.len() < 2 {
    return Err(anyhow!("Provide at least two model names to compare"));
  }

  let answer = engine.compare(model_names).await?;
  if json {
    return display::print_json(&answer);
  }
  display::display_answer(&answer);
  Ok(())
}

/// Catalog counts
pub async fn stats(engine: &QueryEngine, json: bool) -> Result<()> {
  let stats = engine.stats().await?;
  if json {
    return display::print_json(&stats);
  }

  println!("{} {}", "Products:".bold(), stats.total_products);
  println!("{} {}", "With embeddings:".bold(), stats.with_embeddings);
  if !stats.by_category.is_empty() {
    println!();
    for (category, count) in &stats.by_category {
      println!("  {category}: {count}");
    }
  }
  Ok(())
}

/// The calculator subcommands; none of them need the catalog
pub enum Calculation {
  Compatibility { speakers: Vec<i64>, capacity: i64 },
  Impedance { values: Vec<f64>, connection: String },
  Transformer { speakers: Vec<i64> },
  Tap { full_power: f64, reduction_db: f64 },
  Units { capacity: i64, unit_watts: i64, headroom_percent: f64 },
}

pub fn calculate(calculation: Calculation, json: bool) -> Result<()> {
  let calculator = CalculationEngine::new();
  let outcome: std::result::Result<CalculationResult, CalculationError> = match calculation {
    Calculation::Compatibility { speakers, capacity } => calculator
      .total_power(&speakers)
      .and_then(|total| calculator.verify_compatibility(total, capacity))
      .map(CalculationResult::Compatibility),
    Calculation::Impedance { values, connection } => {
      calculator.combine_impedance(&values, &connection).map(CalculationResult::Impedance)
    }
    Calculation::Transformer { speakers } => calculator
      .total_power(&speakers)
      .map(|total| CalculationResult::Transformer(calculator.recommend_transformer(total))),
    Calculation::Tap { full_power, reduction_db } => {
      calculator.tap_for_reduction(reduction_db, full_power).map(CalculationResult::Tap)
    }
    Calculation::Units { capacity, unit_watts, headroom_percent } => calculator
      .max_units_for_capacity(capacity, unit_watts, headroom_percent)
      .map(CalculationResult::UnitCapacity),
  };

  if json {
    return match &outcome {
      Ok(result) => display::print_json(result),
      Err(e) => display::print_json(e),
    };
  }

  display::display_answer(&AnswerSynthesizer::new().calculation_answer(&outcome));
  Ok(())
}
