//! In-memory catalog backed by a JSON export of product rows.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use crate::embeddings::CachedEmbedder;
use crate::error::{QuillError, Result};
use crate::models::{Filter, ProductRecord, SpecValue};
use crate::ports::{CatalogStats, CatalogStore, NeighborQuery};
use crate::synthesizer::aliases::{self, Canonical};

/// Spec labels folded into a product's embedding text
const EMBEDDED_SPECS: &[&str] = &["power_watts", "driver_components", "voltage_type", "coverage"];

/// Case-insensitive name order; the original spelling breaks ties
pub fn by_model_name(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Text a row is embedded from: name, category, series, key specs, summary
pub fn embedding_text(record: &ProductRecord) -> String {
  let mut parts = vec![record.model_name.clone()];
  parts.extend(
    record.category.iter().chain(record.series.iter()).filter(|p| !p.trim().is_empty()).cloned(),
  );

  for label in EMBEDDED_SPECS {
    if let Some(value) = record.specs.get(label) {
      parts.push(format!("{label}: {value}"));
    }
  }
  if let Some(summary) = record.ai_summary.as_ref().filter(|s| !s.trim().is_empty()) {
    parts.push(summary.clone());
  }
  parts.join(" ")
}

/// Read-only catalog held in memory, sorted case-insensitively by `model_name`
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
  records: Vec<ProductRecord>,
}

impl InMemoryCatalog {
  pub fn from_records(records: Vec<ProductRecord>) -> Result<Self> {
    let mut seen = HashSet::new();
    for record in &records {
      if record.model_name.trim().is_empty() {
        return Err(QuillError::catalog_load("product with an empty model_name"));
      }
      if !seen.insert(record.model_name.to_uppercase()) {
        return Err(QuillError::catalog_load(format!(
          "duplicate model_name '{}' (names are case-insensitive)",
          record.model_name
        )));
      }
    }

    let mut records: Vec<ProductRecord> = records.into_iter().map(fill_fast_columns).collect();
    records.sort_by(|a, b| by_model_name(&a.model_name, &b.model_name));
    warn_on_mixed_dimensions(&records);

    Ok(Self { records })
  }

  /// Load a JSON array of rows
  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
      QuillError::catalog_load(format!("cannot read {}: {e}", path.display()))
    })?;
    let records: Vec<ProductRecord> = serde_json::from_str(&content)
      .map_err(|e| QuillError::catalog_load(format!("{}: {e}", path.display())))?;

    let catalog = Self::from_records(records)?;
    bentley::info!("loaded {} products from {}", catalog.len(), path.display());
    Ok(catalog)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn records(&self) -> &[ProductRecord] {
    &self.records
  }

  /// Embed rows that arrived without a vector; returns how many were filled.
  /// Rows whose embedding fails keep `None` and stay out of vector ranking.
  pub async fn embed_missing(&mut self, embedder: &CachedEmbedder) -> usize {
    let missing: Vec<usize> = (0..self.records.len())
      .filter(|&index| !self.records[index].has_embedding())
      .collect();
    if missing.is_empty() {
      return 0;
    }

    bentley::info!("embedding {} products without vectors", missing.len());
    let texts: Vec<String> =
      missing.iter().map(|&index| embedding_text(&self.records[index])).collect();
    let results = embedder.embed_batch(&texts).await;

    let mut filled = 0;
    for (index, result) in missing.into_iter().zip(results) {
      let record = &mut self.records[index];
      match result {
        Ok(vector) => {
          record.embedding = Some(vector);
          filled += 1;
        }
        Err(e) => bentley::warn!("could not embed '{}': {e}", record.model_name),
      }
    }

    warn_on_mixed_dimensions(&self.records);
    filled
  }
}

/// Derive the fast-filter columns from specs when the export left them out
fn fill_fast_columns(mut record: ProductRecord) -> ProductRecord {
  if record.watts_int.is_none() {
    record.watts_int = aliases::lookup(&record.specs, Canonical::PowerWatts)
      .and_then(|spec| spec.value.as_f64())
      .map(|watts| watts.round() as i64);
  }
  if record.ohms_int.is_none() {
    record.ohms_int = aliases::lookup(&record.specs, Canonical::ImpedanceOhms)
      .and_then(|spec| spec.value.as_f64())
      .map(|ohms| ohms.round() as i64);
  }
  if record.voltage_type.is_none() {
    record.voltage_type = aliases::lookup(&record.specs, Canonical::VoltageType).and_then(|spec| {
      match spec.value {
        SpecValue::Text(text) => Some(text.clone()),
        _ => None,
      }
    });
  }
  record
}

fn warn_on_mixed_dimensions(records: &[ProductRecord]) {
  let dimensions: HashSet<usize> =
    records.iter().filter_map(|r| r.embedding.as_ref()).map(Vec::len).collect();
  if dimensions.len() > 1 {
    bentley::warn!("catalog embeddings have mixed dimensions: {dimensions:?}");
  }
}

/// Cosine distance in [0, 2]; `None` for mismatched lengths or zero vectors
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
  if a.len() != b.len() || a.is_empty() {
    return None;
  }

  let mut dot = 0.0_f32;
  let mut norm_a = 0.0_f32;
  let mut norm_b = 0.0_f32;
  for (x, y) in a.iter().zip(b) {
    dot += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }

  if norm_a == 0.0 || norm_b == 0.0 {
    return None;
  }
  Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

fn in_other_category(record: &ProductRecord, preferred: Option<&str>) -> bool {
  match preferred {
    Some(preferred) => {
      !record.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(preferred))
    }
    None => false,
  }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
  async fn find_exact(&self, model_name: &str) -> Result<Option<ProductRecord>> {
    Ok(self.records.iter().find(|r| r.same_model(model_name)).cloned())
  }

  async fn find_containing(&self, fragment: &str) -> Result<Option<ProductRecord>> {
    let needle = fragment.to_uppercase();
    Ok(self.records.iter().find(|r| r.model_name.to_uppercase().contains(&needle)).cloned())
  }

  async fn scan(&self, filter: &Filter, limit: usize) -> Result<Vec<ProductRecord>> {
    Ok(self.records.iter().filter(|r| filter.matches(r)).take(limit).cloned().collect())
  }

  async fn nearest(&self, query: &NeighborQuery) -> Result<Vec<(ProductRecord, f32)>> {
    let preferred = query.prefer_category.as_deref();

    // filter and distance in one pass over the rows
    let mut ranked: Vec<(bool, f32, &ProductRecord)> = self
      .records
      .iter()
      .filter(|r| query.exclude_model.as_deref().is_none_or(|excluded| !r.same_model(excluded)))
      .filter(|r| query.filter.matches(r))
      .filter_map(|r| {
        let embedding = r.embedding.as_deref()?;
        let distance = cosine_distance(&query.vector, embedding)?;
        Some((in_other_category(r, preferred), distance, r))
      })
      .collect();

    ranked.sort_by(|a, b| {
      a.0
        .cmp(&b.0)
        .then_with(|| a.1.total_cmp(&b.1))
        .then_with(|| by_model_name(&a.2.model_name, &b.2.model_name))
    });

    Ok(
      ranked
        .into_iter()
        .take(query.limit)
        .map(|(_, distance, record)| (record.clone(), distance))
        .collect(),
    )
  }

  async fn model_names(&self) -> Result<Vec<String>> {
    Ok(self.records.iter().map(|r| r.model_name.clone()).collect())
  }

  async fn stats(&self) -> Result<CatalogStats> {
    let mut stats = CatalogStats { total_products: self.records.len(), ..Default::default() };
    for record in &self.records {
      if record.has_embedding() {
        stats.with_embeddings += 1;
      }
      let category = record.category.clone().unwrap_or_else(|| "uncategorized".to_string());
      *stats.by_category.entry(category).or_insert(0) += 1;
    }
    Ok(stats)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::SpecSheet;
  use crate::ports::MockEmbeddingPort;
  use std::sync::Arc;
  use std::time::Duration;
  use tempfile::TempDir;

  fn record(name: &str, category: &str, embedding: Option<Vec<f32>>) -> ProductRecord {
    let mut record = ProductRecord::new(name);
    record.category = Some(category.to_string());
    record.embedding = embedding;
    record
  }

  fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_records(vec![
      record("DM6SE", "loudspeaker", Some(vec![1.0, 0.0])),
      record("AM10/60", "loudspeaker", Some(vec![0.9, 0.1])),
      record("IZA 250-LZ", "amplifier", Some(vec![1.0, 0.05])),
      record("DM3SE", "loudspeaker", None),
    ])
    .unwrap()
  }

  #[test]
  fn rejects_case_insensitive_duplicates() {
    let result = InMemoryCatalog::from_records(vec![
      record("DM3SE", "loudspeaker", None),
      record("dm3se", "loudspeaker", None),
    ]);
    assert!(matches!(result, Err(QuillError::CatalogLoad { .. })));
  }

  #[test]
  fn derives_fast_columns_from_specs() {
    let mut row = ProductRecord::new("FS4SE");
    row.specs = SpecSheet::from_iter([
      ("Power Handling (Long-term)", SpecValue::from("40 W")),
      ("Nominal Impedance", SpecValue::from(8_i64)),
      ("voltage_type", SpecValue::from("70V/100V")),
    ]);
    let catalog = InMemoryCatalog::from_records(vec![row]).unwrap();
    let loaded = &catalog.records()[0];
    assert_eq!(loaded.watts_int, Some(40));
    assert_eq!(loaded.ohms_int, Some(8));
    assert_eq!(loaded.voltage_type.as_deref(), Some("70V/100V"));
  }

  #[test]
  fn cosine_distance_handles_degenerate_vectors() {
    assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]), Some(0.0));
    assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 0.0]), None);
    assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), None);
  }

  #[tokio::test]
  async fn substring_lookup_is_lexicographic() {
    let catalog = catalog();
    let found = catalog.find_containing("dm").await.unwrap().unwrap();
    assert_eq!(found.model_name, "DM3SE");
  }

  #[tokio::test]
  async fn nearest_skips_rows_without_embeddings() {
    let catalog = catalog();
    let query = NeighborQuery { vector: vec![1.0, 0.0], limit: 10, ..Default::default() };
    let names: Vec<String> =
      catalog.nearest(&query).await.unwrap().into_iter().map(|(r, _)| r.model_name).collect();
    assert_eq!(names, vec!["DM6SE", "IZA 250-LZ", "AM10/60"]);
  }

  #[tokio::test]
  async fn nearest_prefers_category_then_distance() {
    let catalog = catalog();
    let query = NeighborQuery {
      vector: vec![1.0, 0.0],
      exclude_model: Some("dm6se".to_string()),
      prefer_category: Some("loudspeaker".to_string()),
      limit: 10,
      ..Default::default()
    };
    let names: Vec<String> =
      catalog.nearest(&query).await.unwrap().into_iter().map(|(r, _)| r.model_name).collect();
    assert_eq!(names, vec!["AM10/60", "IZA 250-LZ"]);
  }

  #[tokio::test]
  async fn stats_count_embeddings_and_categories() {
    let stats = catalog().stats().await.unwrap();
    assert_eq!(stats.total_products, 4);
    assert_eq!(stats.with_embeddings, 3);
    assert_eq!(stats.by_category.get("loudspeaker"), Some(&3));
  }

  #[tokio::test]
  async fn name_order_ignores_case() {
    let catalog = InMemoryCatalog::from_records(vec![
      record("Zeta-DM", "loudspeaker", None),
      record("dm3", "loudspeaker", None),
      record("Am10", "loudspeaker", None),
    ])
    .unwrap();

    let names = catalog.model_names().await.unwrap();
    assert_eq!(names, vec!["Am10", "dm3", "Zeta-DM"]);

    let found = catalog.find_containing("DM").await.unwrap().unwrap();
    assert_eq!(found.model_name, "dm3");
  }

  #[test]
  fn embedding_text_includes_key_specs_and_summary() {
    let mut row = ProductRecord::new("DM6SE");
    row.category = Some("loudspeaker".to_string());
    row.series = Some("DesignMax".to_string());
    row.specs = SpecSheet::from_iter([
      ("power_watts", SpecValue::from(60_i64)),
      ("weight", SpecValue::from("2 kg")),
    ]);
    row.ai_summary = Some("Compact ceiling speaker.".to_string());

    let text = embedding_text(&row);
    assert!(text.starts_with("DM6SE loudspeaker DesignMax"));
    assert!(text.contains("power_watts: 60"));
    assert!(!text.contains("weight"));
    assert!(text.ends_with("Compact ceiling speaker."));
  }

  #[tokio::test]
  async fn embed_missing_fills_only_rows_without_vectors() {
    let mut port = MockEmbeddingPort::new();
    port.expect_embed().times(1).returning(|text| {
      assert!(text.starts_with("DM3SE"));
      Ok(vec![0.8, 0.2])
    });
    let embedder = CachedEmbedder::new(Arc::new(port), 10, Duration::from_secs(1), 2);

    let mut catalog = catalog();
    assert_eq!(catalog.embed_missing(&embedder).await, 1);
    assert!(catalog.records().iter().all(ProductRecord::has_embedding));
    assert_eq!(catalog.embed_missing(&embedder).await, 0);
  }

  #[tokio::test]
  async fn embed_missing_leaves_failed_rows_empty() {
    let mut port = MockEmbeddingPort::new();
    port.expect_embed().returning(|_| Err(QuillError::embedding("offline")));
    let embedder = CachedEmbedder::new(Arc::new(port), 10, Duration::from_secs(1), 2);

    let mut catalog = catalog();
    assert_eq!(catalog.embed_missing(&embedder).await, 0);
    let stats = catalog.stats().await.unwrap();
    assert_eq!(stats.with_embeddings, 3);
  }

  #[test]
  fn loads_json_export() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(
      &path,
      r#"[{"model_name": "EM90", "category": "loudspeaker", "specs": {"power_watts": 90}, "pdf_source": "EM90.pdf"}]"#,
    )
    .unwrap();

    let catalog = InMemoryCatalog::from_path(&path).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.records()[0].source_reference.as_deref(), Some("EM90.pdf"));
    assert_eq!(catalog.records()[0].watts_int, Some(90));
  }
}
