//! Display formatting utilities for CLI output

use colored::*;
use serde::Serialize;

use crate::models::{GeneratedAnswer, QueryType, RetrievalResult};

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    // Table rows and list items keep their layout
    if paragraph.starts_with('|') || paragraph.trim_start().starts_with("- ") {
      lines.push(paragraph.to_string());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.len() + 1 + word.len() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(current_line);
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

/// Pretty-print any serializable value
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn confidence_label(confidence: f32) -> ColoredString {
  let text = format!("{:.0}%", confidence * 100.0);
  if confidence >= 0.8 {
    text.green()
  } else if confidence >= 0.5 {
    text.yellow()
  } else {
    text.red()
  }
}

/// Answer body, then its citations and a one-line footer
pub fn display_answer(answer: &GeneratedAnswer) {
  let body = if answer.query_type() == QueryType::Error {
    answer.answer().red().to_string()
  } else {
    answer.answer().to_string()
  };
  for line in wrap_text(&body, 80) {
    println!("{line}");
  }

  if !answer.citations().is_empty() {
    println!();
    println!("{}", "Sources:".bold());
    for citation in answer.citations() {
      let source = citation.source_reference.as_deref().unwrap_or("catalog");
      println!(
        "  {} {} = {} {}",
        citation.model_name.cyan(),
        citation.field,
        citation.value,
        format!("({source})").dimmed()
      );
    }
  }

  println!();
  println!(
    "{} {}  {} {}",
    "type:".dimmed(),
    answer.query_type().as_str(),
    "confidence:".dimmed(),
    confidence_label(answer.confidence())
  );
}

/// Full spec sheet for one product
pub fn display_product(result: &RetrievalResult) {
  let record = &result.record;
  let header = format!("=== {} ===", record.model_name.yellow().bold());
  println!("{header}");

  if let Some(category) = &record.category {
    println!("{} {category}", "Category:".blue());
  }
  if let Some(series) = &record.series {
    println!("{} {series}", "Series:".blue());
  }
  if let Some(summary) = &result.ai_summary {
    println!();
    for line in wrap_text(summary, 80) {
      println!("{line}");
    }
  }

  println!();
  for (label, value) in record.specs.iter() {
    println!("  {}: {value}", label.bold());
  }
  if let Some(source) = &record.source_reference {
    println!();
    println!("{}", format!("Source: {source}").dimmed());
  }
}

/// One line per result, ranked
pub fn display_results(results: &[RetrievalResult]) {
  if results.is_empty() {
    println!("{}", "No matching products.".yellow());
    return;
  }

  for (index, result) in results.iter().enumerate() {
    let category = result.record.category.as_deref().unwrap_or("uncategorized");
    println!(
      "{:>3}. {} {} {}",
      index + 1,
      result.model_name().yellow().bold(),
      format!("[{category}]").blue(),
      format!("{:.2} {}", result.similarity_score, result.match_kind.as_str()).dimmed()
    );
  }
}

/// Plain list of names with a count footer
pub fn display_names(names: &[String]) {
  for name in names {
    println!("  {name}");
  }
  println!();
  println!("{} model(s)", names.len().to_string().bold());
}
