//! Catalog rows, per-request value objects, and the answer envelope.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// Spec values
// ===========

/// Physical size triple as stored by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
  pub height: f64,
  pub width: f64,
  pub depth: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
}

/// A single specification value. Catalog rows mix numbers, free text and
/// structured values under the same mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
  Flag(bool),
  Integer(i64),
  Number(f64),
  Text(String),
  Dimensions(Dimensions),
  List(Vec<SpecValue>),
  Other(serde_json::Value),
}

impl SpecValue {
  /// Leading numeric value, if any ("60 W" -> 60.0)
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      SpecValue::Integer(value) => Some(*value as f64),
      SpecValue::Number(value) => Some(*value),
      SpecValue::Text(text) => leading_number(text),
      _ => None,
    }
  }
}

fn leading_number(text: &str) -> Option<f64> {
  let trimmed = text.trim_start();
  let end = trimmed
    .char_indices()
    .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
    .map(|(index, _)| index)
    .unwrap_or(trimmed.len());
  trimmed[..end].parse().ok()
}

impl fmt::Display for SpecValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SpecValue::Flag(value) => write!(f, "{}", if *value { "Yes" } else { "No" }),
      SpecValue::Integer(value) => write!(f, "{value}"),
      SpecValue::Number(value) => write!(f, "{value}"),
      SpecValue::Text(value) => write!(f, "{value}"),
      SpecValue::Dimensions(d) => {
        write!(f, "{} × {} × {}", d.height, d.width, d.depth)?;
        match &d.unit {
          Some(unit) => write!(f, " {unit}"),
          None => Ok(()),
        }
      }
      SpecValue::List(items) => {
        let rendered: Vec<String> = items.iter().map(|item| item.to_string()).collect();
        write!(f, "{}", rendered.join(", "))
      }
      SpecValue::Other(value) => write!(f, "{value}"),
    }
  }
}

impl From<&str> for SpecValue {
  fn from(value: &str) -> Self {
    SpecValue::Text(value.to_string())
  }
}

impl From<i64> for SpecValue {
  fn from(value: i64) -> Self {
    SpecValue::Integer(value)
  }
}

impl From<f64> for SpecValue {
  fn from(value: f64) -> Self {
    SpecValue::Number(value)
  }
}

/// Ordered mapping from spec label to value.
///
/// Insertion order is preserved through (de)serialization; `null` values in
/// catalog exports are dropped on load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecSheet {
  entries: Vec<(String, SpecValue)>,
}

impl SpecSheet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or replace a value, keeping the original position on replace
  pub fn insert(&mut self, label: impl Into<String>, value: impl Into<SpecValue>) {
    let label = label.into();
    let value = value.into();
    match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
      Some((_, slot)) => *slot = value,
      None => self.entries.push((label, value)),
    }
  }

  pub fn get(&self, label: &str) -> Option<&SpecValue> {
    self.entries.iter().find(|(existing, _)| existing == label).map(|(_, value)| value)
  }

  pub fn contains(&self, label: &str) -> bool {
    self.get(label).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &SpecValue)> {
    self.entries.iter().map(|(label, value)| (label.as_str(), value))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<L: Into<String>, V: Into<SpecValue>> FromIterator<(L, V)> for SpecSheet {
  fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
    let mut sheet = SpecSheet::new();
    for (label, value) in iter {
      sheet.insert(label, value);
    }
    sheet
  }
}

impl Serialize for SpecSheet {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (label, value) in &self.entries {
      map.serialize_entry(label, value)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for SpecSheet {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct SpecSheetVisitor;

    impl<'de> Visitor<'de> for SpecSheetVisitor {
      type Value = SpecSheet;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of spec labels to values")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SpecSheet, A::Error> {
        let mut sheet = SpecSheet::new();
        while let Some((label, value)) = access.next_entry::<String, Option<SpecValue>>()? {
          if let Some(value) = value {
            sheet.insert(label, value);
          }
        }
        Ok(sheet)
      }
    }

    deserializer.deserialize_map(SpecSheetVisitor)
  }
}

// Catalog rows
// ============

/// One product row as exported by the catalog.
///
/// The engine never writes these; it only reads them through a `CatalogStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
  pub model_name: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub series: Option<String>,
  #[serde(default)]
  pub specs: SpecSheet,
  #[serde(default, skip_serializing)]
  pub embedding: Option<Vec<f32>>,
  #[serde(default)]
  pub watts_int: Option<i64>,
  #[serde(default)]
  pub ohms_int: Option<i64>,
  #[serde(default)]
  pub voltage_type: Option<String>,
  #[serde(default)]
  pub ai_summary: Option<String>,
  #[serde(default, alias = "pdf_source")]
  pub source_reference: Option<String>,
}

impl ProductRecord {
  pub fn new(model_name: impl Into<String>) -> Self {
    Self {
      model_name: model_name.into(),
      category: None,
      series: None,
      specs: SpecSheet::new(),
      embedding: None,
      watts_int: None,
      ohms_int: None,
      voltage_type: None,
      ai_summary: None,
      source_reference: None,
    }
  }

  /// Rows without a usable vector are excluded from similarity ranking
  pub fn has_embedding(&self) -> bool {
    self.embedding.as_ref().is_some_and(|vector| !vector.is_empty())
  }

  pub fn same_model(&self, model_name: &str) -> bool {
    self.model_name.eq_ignore_ascii_case(model_name)
  }
}

// Filters
// =======

/// Hard predicates extracted from a query, ANDed together.
///
/// A row whose filter column is absent fails any predicate on that column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_watts: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_watts: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub voltage_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub series: Option<String>,
}

impl Filter {
  pub fn is_empty(&self) -> bool {
    *self == Filter::default()
  }

  pub fn matches(&self, record: &ProductRecord) -> bool {
    self.watts_match(record.watts_int)
      && optional_eq(self.category.as_deref(), record.category.as_deref())
      && optional_eq(self.series.as_deref(), record.series.as_deref())
      && voltage_match(self.voltage_type.as_deref(), record.voltage_type.as_deref())
  }

  fn watts_match(&self, watts: Option<i64>) -> bool {
    let above_min = match self.min_watts {
      Some(min) => watts.is_some_and(|w| w >= min),
      None => true,
    };
    let below_max = match self.max_watts {
      Some(max) => watts.is_some_and(|w| w <= max),
      None => true,
    };
    above_min && below_max
  }
}

fn optional_eq(wanted: Option<&str>, actual: Option<&str>) -> bool {
  match wanted {
    Some(wanted) => actual.is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
    None => true,
  }
}

/// "70V" matches a row rated "70V/100V": every requested voltage must be
/// among the row's voltages.
fn voltage_match(wanted: Option<&str>, actual: Option<&str>) -> bool {
  let Some(wanted) = wanted else {
    return true;
  };
  let Some(actual) = actual else {
    return false;
  };

  let available: Vec<String> = actual.split('/').map(|v| v.trim().to_ascii_lowercase()).collect();
  wanted.split('/').map(|v| v.trim().to_ascii_lowercase()).all(|v| available.contains(&v))
}

// Retrieval
// =========

/// How a retrieval result was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
  Exact,
  Substring,
  Vector,
  /// Embedding was unavailable; no ranking signal
  FilterOnly,
}

impl MatchKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      MatchKind::Exact => "exact",
      MatchKind::Substring => "substring",
      MatchKind::Vector => "vector",
      MatchKind::FilterOnly => "filter_only",
    }
  }
}

/// A catalog row plus the score it was retrieved with. Lives for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
  pub record: ProductRecord,
  /// In [0, 1]; 0 when no vector search occurred
  pub similarity_score: f32,
  pub ai_summary: Option<String>,
  pub match_kind: MatchKind,
}

impl RetrievalResult {
  pub fn new(record: ProductRecord, match_kind: MatchKind, similarity_score: f32) -> Self {
    let ai_summary = record.ai_summary.clone();
    Self { record, similarity_score: similarity_score.clamp(0.0, 1.0), ai_summary, match_kind }
  }

  pub fn model_name(&self) -> &str {
    &self.record.model_name
  }
}

// Answers
// =======

/// Pointer from an answer to the exact catalog fact it used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
  pub model_name: String,
  /// Spec label exactly as stored on the row
  pub field: String,
  pub value: SpecValue,
  pub source_reference: Option<String>,
}

/// Closed set of intents the classifier can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
  DirectLookup,
  SemanticSearch,
  Calculation,
  PurchaseIntent,
  DomainViolation,
  Unknown,
}

impl Intent {
  pub fn as_str(&self) -> &'static str {
    match self {
      Intent::DirectLookup => "direct_lookup",
      Intent::SemanticSearch => "semantic_search",
      Intent::Calculation => "calculation",
      Intent::PurchaseIntent => "purchase_intent",
      Intent::DomainViolation => "domain_violation",
      Intent::Unknown => "unknown",
    }
  }

  /// Guardrail intents terminate a request before any retrieval
  pub fn is_blocked(&self) -> bool {
    matches!(self, Intent::PurchaseIntent | Intent::DomainViolation)
  }
}

impl fmt::Display for Intent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Tag carried on every answer: the intent that produced it, or `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
  DirectLookup,
  SemanticSearch,
  Calculation,
  PurchaseIntent,
  DomainViolation,
  Unknown,
  Error,
}

impl From<Intent> for QueryType {
  fn from(intent: Intent) -> Self {
    match intent {
      Intent::DirectLookup => QueryType::DirectLookup,
      Intent::SemanticSearch => QueryType::SemanticSearch,
      Intent::Calculation => QueryType::Calculation,
      Intent::PurchaseIntent => QueryType::PurchaseIntent,
      Intent::DomainViolation => QueryType::DomainViolation,
      Intent::Unknown => QueryType::Unknown,
    }
  }
}

impl QueryType {
  pub fn as_str(&self) -> &'static str {
    match self {
      QueryType::Error => "error",
      QueryType::DirectLookup => Intent::DirectLookup.as_str(),
      QueryType::SemanticSearch => Intent::SemanticSearch.as_str(),
      QueryType::Calculation => Intent::Calculation.as_str(),
      QueryType::PurchaseIntent => Intent::PurchaseIntent.as_str(),
      QueryType::DomainViolation => Intent::DomainViolation.as_str(),
      QueryType::Unknown => Intent::Unknown.as_str(),
    }
  }
}

/// Terminal result of one query. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedAnswer {
  answer: String,
  citations: Vec<Citation>,
  confidence: f32,
  query_type: QueryType,
  products_used: Vec<String>,
}

impl GeneratedAnswer {
  pub fn new(answer: impl Into<String>, query_type: QueryType) -> Self {
    Self {
      answer: answer.into(),
      citations: Vec::new(),
      confidence: 0.0,
      query_type,
      products_used: Vec::new(),
    }
  }

  pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
    self.citations = citations;
    self
  }

  pub fn with_confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence.clamp(0.0, 1.0);
    self
  }

  pub fn with_products(mut self, products_used: Vec<String>) -> Self {
    self.products_used = products_used;
    self
  }

  pub fn answer(&self) -> &str {
    &self.answer
  }

  pub fn citations(&self) -> &[Citation] {
    &self.citations
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn query_type(&self) -> QueryType {
    self.query_type
  }

  pub fn products_used(&self) -> &[String] {
    &self.products_used
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn speaker(watts: i64, voltage: &str) -> ProductRecord {
    let mut record = ProductRecord::new("DM3SE");
    record.category = Some("loudspeaker".to_string());
    record.watts_int = Some(watts);
    record.voltage_type = Some(voltage.to_string());
    record
  }

  #[test]
  fn spec_sheet_preserves_insertion_order() {
    let json = r#"{"power_watts": 30, "Nominal Impedance": "8", "coverage": null, "weight_kg": 1.2}"#;
    let sheet: SpecSheet = serde_json::from_str(json).unwrap();

    let labels: Vec<&str> = sheet.iter().map(|(label, _)| label).collect();
    assert_eq!(labels, vec!["power_watts", "Nominal Impedance", "weight_kg"]);
    assert_eq!(sheet.get("power_watts"), Some(&SpecValue::Integer(30)));
    assert_eq!(sheet.get("weight_kg"), Some(&SpecValue::Number(1.2)));

    let round_trip = serde_json::to_string(&sheet).unwrap();
    assert!(round_trip.starts_with(r#"{"power_watts":30"#));
  }

  #[test]
  fn dimensions_render_as_triple() {
    let value: SpecValue =
      serde_json::from_str(r#"{"height": 200, "width": 150, "depth": 90, "unit": "mm"}"#).unwrap();
    assert_eq!(value.to_string(), "200 × 150 × 90 mm");
  }

  #[test]
  fn leading_number_parses_text_values() {
    assert_eq!(SpecValue::from("60 W").as_f64(), Some(60.0));
    assert_eq!(SpecValue::from("n/a").as_f64(), None);
  }

  #[test]
  fn filter_predicates_are_anded() {
    let record = speaker(60, "70V/100V");

    let filter = Filter { min_watts: Some(50), category: Some("Loudspeaker".into()), ..Default::default() };
    assert!(filter.matches(&record));

    let filter = Filter { min_watts: Some(50), max_watts: Some(55), ..Default::default() };
    assert!(!filter.matches(&record));
  }

  #[test]
  fn voltage_filter_accepts_multi_voltage_rows() {
    let record = speaker(60, "70V/100V");
    let seventy = Filter { voltage_type: Some("70V".into()), ..Default::default() };
    let low_z = Filter { voltage_type: Some("Low-Z".into()), ..Default::default() };

    assert!(seventy.matches(&record));
    assert!(!low_z.matches(&record));
  }

  #[test]
  fn missing_column_fails_predicate() {
    let mut record = speaker(60, "70V");
    record.watts_int = None;
    let filter = Filter { min_watts: Some(10), ..Default::default() };
    assert!(!filter.matches(&record));
    assert!(Filter::default().matches(&record));
  }

  #[test]
  fn answer_confidence_is_clamped() {
    let answer = GeneratedAnswer::new("ok", QueryType::Calculation).with_confidence(1.7);
    assert_eq!(answer.confidence(), 1.0);
  }
}
