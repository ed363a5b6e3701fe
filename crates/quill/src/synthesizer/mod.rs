//! Answer synthesis with citations.
//!
//! Lookups and calculations are rendered from templates. Search answers go
//! through the completion model when one is configured, with a deterministic
//! listing as the fallback.

pub mod aliases;

use std::sync::Arc;
use std::time::Duration;

use crate::calculator::{CalculationError, CalculationResult, HeadroomTier};
use crate::models::{Citation, GeneratedAnswer, QueryType, RetrievalResult};
use crate::ports::{CompletionOptions, CompletionPort};
use aliases::{Canonical, ResolvedSpec};

/// Sampling for search answers
pub const ANSWER_OPTIONS: CompletionOptions = CompletionOptions { temperature: 0.3, max_tokens: 300 };

pub const FALLBACK_CONFIDENCE: f32 = 0.7;

const DEFAULT_CONTEXT_PRODUCTS: usize = 5;

/// Specs cited for each product a search answer names
const KEY_FIELDS: &[Canonical] =
  &[Canonical::PowerWatts, Canonical::VoltageType, Canonical::ImpedanceOhms];

const COMPARE_FIELDS: &[Canonical] = &[
  Canonical::PowerWatts,
  Canonical::ImpedanceOhms,
  Canonical::FreqMinHz,
  Canonical::FreqMaxHz,
  Canonical::SensitivityDb,
  Canonical::Coverage,
  Canonical::WeightKg,
];

const DEFAULT_SOURCE: &str = "Product catalog";

const NO_RESULTS: &str = "I couldn't find any relevant products to answer that query.";

const GENERATION_PROMPT: &str = "You are a professional audio product expert.
You are a technical support interface. You are prohibited from discussing commercial terms, discounts, or stock levels.
Answer the user's question using ONLY the product data provided below.
Do NOT make up any specifications or information not in the data.
Be concise and factual.
If the answer is not in the data, say \"I couldn't find that information in the provided product data.\"

User Question: {query}

Product Data:
{product_data}

Instructions:
1. Answer the question directly
2. Include specific values from the data
3. Mention model names when relevant
4. Keep answer under 150 words

Answer:";

fn cite(result: &RetrievalResult, spec: &ResolvedSpec<'_>) -> Citation {
  Citation {
    model_name: result.model_name().to_string(),
    field: spec.source_label.to_string(),
    value: spec.value.clone(),
    source_reference: result.record.source_reference.clone(),
  }
}

fn key_citations(result: &RetrievalResult) -> Vec<Citation> {
  aliases::resolve(&result.record.specs)
    .iter()
    .filter(|spec| KEY_FIELDS.contains(&spec.canonical))
    .map(|spec| cite(result, spec))
    .collect()
}

pub struct AnswerSynthesizer {
  completion: Option<Arc<dyn CompletionPort>>,
  timeout: Duration,
  context_products: usize,
}

impl Default for AnswerSynthesizer {
  fn default() -> Self {
    Self::new()
  }
}

impl AnswerSynthesizer {
  /// Deterministic rendering only
  pub fn new() -> Self {
    Self {
      completion: None,
      timeout: Duration::from_secs(60),
      context_products: DEFAULT_CONTEXT_PRODUCTS,
    }
  }

  pub fn with_completion(mut self, completion: Arc<dyn CompletionPort>, timeout: Duration) -> Self {
    self.completion = Some(completion);
    self.timeout = timeout;
    self
  }

  pub fn with_context_products(mut self, count: usize) -> Self {
    self.context_products = count.max(1);
    self
  }

  // Deterministic answers
  // =====================

  pub fn direct_answer(&self, result: &RetrievalResult) -> GeneratedAnswer {
    let resolved = aliases::resolve(&result.record.specs);

    let specs_text = if resolved.is_empty() {
      "No specifications available".to_string()
    } else {
      resolved
        .iter()
        .map(|spec| format!("- **{}**: {}", spec.label, spec.display_value()))
        .collect::<Vec<_>>()
        .join("\n")
    };
    let source = result.record.source_reference.as_deref().unwrap_or(DEFAULT_SOURCE);

    let answer = format!(
      "Based on the specifications for **{}**:\n\n{specs_text}\n\n*Source: {source}*",
      result.model_name()
    );

    GeneratedAnswer::new(answer, QueryType::DirectLookup)
      .with_citations(resolved.iter().map(|spec| cite(result, spec)).collect())
      .with_confidence(1.0)
      .with_products(vec![result.model_name().to_string()])
  }

  /// Calculation answers cite nothing; their numbers come from the question
  pub fn calculation_answer(
    &self,
    outcome: &Result<CalculationResult, CalculationError>,
  ) -> GeneratedAnswer {
    match outcome {
      Ok(result) => {
        GeneratedAnswer::new(render_calculation(result), QueryType::Calculation).with_confidence(1.0)
      }
      Err(e) => Self::cannot_proceed(format!("I can't complete that calculation: {e}.")),
    }
  }

  /// Confidence-0 calculation answer for unusable input
  pub fn cannot_proceed(message: impl Into<String>) -> GeneratedAnswer {
    GeneratedAnswer::new(message, QueryType::Calculation).with_confidence(0.0)
  }

  pub fn no_results() -> GeneratedAnswer {
    GeneratedAnswer::new(NO_RESULTS, QueryType::SemanticSearch)
  }

  /// Side-by-side table of the comparable metrics
  pub fn compare(&self, results: &[RetrievalResult]) -> GeneratedAnswer {
    if results.is_empty() {
      return GeneratedAnswer::new("No products to compare.", QueryType::DirectLookup);
    }

    let resolved: Vec<Vec<ResolvedSpec<'_>>> =
      results.iter().map(|r| aliases::resolve(&r.record.specs)).collect();

    let names: Vec<&str> = results.iter().map(|r| r.model_name()).collect();
    let mut lines = vec![
      format!("| Metric | {} |", names.join(" | ")),
      format!("|---|{}", "---|".repeat(names.len())),
    ];
    let mut citations = Vec::new();

    for field in COMPARE_FIELDS {
      let cells: Vec<Option<&ResolvedSpec<'_>>> =
        resolved.iter().map(|specs| specs.iter().find(|s| s.canonical == *field)).collect();
      let Some(label) = cells.iter().flatten().map(|spec| spec.label).next() else {
        continue;
      };

      let rendered: Vec<String> = cells
        .iter()
        .map(|cell| cell.map(|spec| spec.display_value()).unwrap_or_else(|| "n/a".to_string()))
        .collect();
      lines.push(format!("| {label} | {} |", rendered.join(" | ")));

      for (result, cell) in results.iter().zip(&cells) {
        if let Some(spec) = cell {
          citations.push(cite(result, spec));
        }
      }
    }

    GeneratedAnswer::new(lines.join("\n"), QueryType::DirectLookup)
      .with_citations(citations)
      .with_confidence(1.0)
      .with_products(names.iter().map(|name| name.to_string()).collect())
  }

  // Search answers
  // ==============

  pub async fn search_answer(&self, query: &str, results: &[RetrievalResult]) -> GeneratedAnswer {
    if results.is_empty() {
      return Self::no_results();
    }
    let context = &results[..results.len().min(self.context_products)];

    let Some(completion) = &self.completion else {
      return self.fallback_answer(context);
    };

    let prompt = GENERATION_PROMPT
      .replace("{product_data}", &format_context(context))
      .replace("{query}", query);

    let text = match tokio::time::timeout(self.timeout, completion.complete(&prompt, ANSWER_OPTIONS))
      .await
    {
      Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
      Ok(Ok(_)) => {
        bentley::warn!("completion returned no text, using fallback answer");
        return self.fallback_answer(context);
      }
      Ok(Err(e)) => {
        bentley::warn!("answer generation failed, using fallback answer: {e}");
        return self.fallback_answer(context);
      }
      Err(_) => {
        bentley::warn!("answer generation timed out after {}ms", self.timeout.as_millis());
        return self.fallback_answer(context);
      }
    };

    let lowered = text.to_lowercase();
    let named: Vec<&RetrievalResult> =
      context.iter().filter(|r| lowered.contains(&r.model_name().to_lowercase())).collect();
    let cited: Vec<&RetrievalResult> =
      if named.is_empty() { context.iter().collect() } else { named };

    let citations = cited.iter().flat_map(|r| key_citations(r)).collect();
    let products_used = cited.iter().map(|r| r.model_name().to_string()).collect();

    let average =
      context.iter().map(|r| r.similarity_score).sum::<f32>() / context.len() as f32;

    GeneratedAnswer::new(text, QueryType::SemanticSearch)
      .with_citations(citations)
      .with_confidence((average + 0.2).min(1.0))
      .with_products(products_used)
  }

  /// Plain listing of the top products with every shown value cited
  pub fn fallback_answer(&self, results: &[RetrievalResult]) -> GeneratedAnswer {
    let mut lines = Vec::new();
    let mut citations = Vec::new();
    let mut products_used = Vec::new();

    for result in results.iter().take(self.context_products) {
      products_used.push(result.model_name().to_string());
      match &result.record.category {
        Some(category) => lines.push(format!("\n**{}** ({category})", result.model_name())),
        None => lines.push(format!("\n**{}**", result.model_name())),
      }

      for spec in aliases::resolve(&result.record.specs) {
        lines.push(format!("- {}: {}", spec.label, spec.display_value()));
        citations.push(cite(result, &spec));
      }
      if let Some(summary) = &result.ai_summary {
        lines.push(format!("- Summary: {summary}"));
      }
    }

    GeneratedAnswer::new(lines.join("\n").trim(), QueryType::SemanticSearch)
      .with_citations(citations)
      .with_confidence(FALLBACK_CONFIDENCE)
      .with_products(products_used)
  }
}

fn format_context(results: &[RetrievalResult]) -> String {
  let mut lines = Vec::new();
  for (index, result) in results.iter().enumerate() {
    lines.push(format!("\n### Product {}: {}", index + 1, result.model_name()));
    if let Some(category) = &result.record.category {
      lines.push(format!("  Category: {category}"));
    }
    if let Some(series) = &result.record.series {
      lines.push(format!("  Series: {series}"));
    }
    for spec in aliases::resolve(&result.record.specs) {
      lines.push(format!("  {}: {}", spec.label, spec.display_value()));
    }
    if let Some(summary) = &result.ai_summary {
      lines.push(format!("  Summary: {summary}"));
    }
  }
  lines.join("\n")
}

fn render_calculation(result: &CalculationResult) -> String {
  match result {
    CalculationResult::Compatibility(report) => {
      let verdict = if report.compatible {
        "✅ Yes, this configuration is compatible."
      } else {
        "❌ No, this configuration is NOT compatible."
      };
      let advice = match report.tier {
        HeadroomTier::Incompatible => {
          "The total speaker load exceeds the transformer's capacity. Use a larger transformer or \
           reduce speakers."
        }
        _ => "The total speaker load is within the transformer's capacity.",
      };
      format!(
        "**70V Compatibility Check**\n\n{verdict}\n\n- **Total Load**: {} W\n- **Transformer \
         Capacity**: {} W\n- **Headroom**: {:.1}%\n\n{}\n{advice}",
        report.total_load, report.capacity, report.headroom_percent, report.message
      )
    }
    CalculationResult::Impedance(report) => format!(
      "**Impedance Calculation**\n\n- **Connection Type**: {}\n- **Total Impedance**: {:.2} Ω\n- \
       **Speakers**: {:?}\n\n{}",
      report.connection, report.total_ohms, report.values, report.message
    ),
    CalculationResult::TotalPower { total_watts, speakers } => format!(
      "**Power Calculation**\n\n- **Total Power**: {total_watts} W\n- **Speakers**: {speakers:?}"
    ),
    CalculationResult::Transformer(rec) => {
      let alternatives = if rec.alternatives.is_empty() {
        "none".to_string()
      } else {
        rec.alternatives.iter().map(|w| format!("{w} W")).collect::<Vec<_>>().join(", ")
      };
      format!(
        "**Transformer Recommendation**\n\n- **Speaker Load**: {} W\n- **Recommended \
         Transformer**: {} W\n- **Headroom**: {:.1}%\n- **Alternatives**: {alternatives}\n\n{}",
        rec.load_watts, rec.recommended_watts, rec.headroom_percent, rec.message
      )
    }
    CalculationResult::Tap(tap) => format!(
      "**Tap Selection**\n\n- **Full Power**: {} W\n- **Target Power**: {} W\n- **Recommended \
       Tap**: {} W\n- **Actual Reduction**: {:.1} dB\n\n{}",
      tap.full_power_watts, tap.target_watts, tap.tap_watts, tap.reduction_db, tap.message
    ),
    CalculationResult::UnitCapacity(units) => format!(
      "**Speaker Capacity**\n\n- **Transformer Capacity**: {} W\n- **Per Speaker**: {} W\n- \
       **Maximum Speakers**: {}\n- **Total Load**: {} W\n- **Headroom**: {:.1}%\n\n{}",
      units.capacity,
      units.unit_watts,
      units.max_units,
      units.total_load,
      units.headroom_percent,
      units.message
    ),
  }
}
