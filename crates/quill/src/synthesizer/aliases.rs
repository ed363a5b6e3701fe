//! Spec label aliases.
//!
//! Catalog rows carry both normalized keys (`power_watts`) and the raw column
//! headers they were extracted from (`Power Handling (Long-term)`). This table
//! maps either form to one canonical field with a display label and unit.
//! Rows are resolved once; within a canonical field the first alias present on
//! the row wins.

use crate::models::{SpecSheet, SpecValue};

/// Bump when entries are added, removed or reordered
pub const ALIAS_TABLE_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Canonical {
  PowerWatts,
  FreqMinHz,
  FreqMaxHz,
  FreqResponse,
  ImpedanceOhms,
  SensitivityDb,
  Coverage,
  VoltageType,
  DriverComponents,
  WeightKg,
  ColorOptions,
  Environmental,
}

impl Canonical {
  pub fn as_str(&self) -> &'static str {
    match self {
      Canonical::PowerWatts => "power_watts",
      Canonical::FreqMinHz => "freq_min_hz",
      Canonical::FreqMaxHz => "freq_max_hz",
      Canonical::FreqResponse => "freq_response",
      Canonical::ImpedanceOhms => "impedance_ohms",
      Canonical::SensitivityDb => "sensitivity_db",
      Canonical::Coverage => "coverage",
      Canonical::VoltageType => "voltage_type",
      Canonical::DriverComponents => "driver_components",
      Canonical::WeightKg => "weight_kg",
      Canonical::ColorOptions => "color_options",
      Canonical::Environmental => "environmental",
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct SpecAlias {
  pub source: &'static str,
  pub label: &'static str,
  pub unit: &'static str,
  pub canonical: Canonical,
}

const fn alias(
  source: &'static str,
  label: &'static str,
  unit: &'static str,
  canonical: Canonical,
) -> SpecAlias {
  SpecAlias { source, label, unit, canonical }
}

pub static ALIASES: &[SpecAlias] = &[
  alias("power_watts", "Power", "W", Canonical::PowerWatts),
  alias("Power Handling (Long-term)", "Power", "W", Canonical::PowerWatts),
  alias("freq_min_hz", "Freq Min", "Hz", Canonical::FreqMinHz),
  alias("freq_max_hz", "Freq Max", "Hz", Canonical::FreqMaxHz),
  alias(
    "Freq Response (-3 dB) Freq Range (-10 dB)",
    "Freq Response",
    "",
    Canonical::FreqResponse,
  ),
  alias("impedance_ohms", "Impedance", "Ω", Canonical::ImpedanceOhms),
  alias("Nominal Impedance", "Impedance", "Ω", Canonical::ImpedanceOhms),
  alias("sensitivity_db", "Sensitivity", "dB", Canonical::SensitivityDb),
  alias("Sensitivity (SPL/1W@1m)", "Sensitivity", "dB", Canonical::SensitivityDb),
  alias("coverage", "Coverage", "", Canonical::Coverage),
  alias(
    "Coverage (H × V, or Conical) 1 kHz - 4 kHz Average",
    "Coverage",
    "",
    Canonical::Coverage,
  ),
  alias("voltage_type", "Voltage", "", Canonical::VoltageType),
  alias("driver_components", "Drivers", "", Canonical::DriverComponents),
  alias("Driver Components", "Drivers", "", Canonical::DriverComponents),
  alias("weight_kg", "Weight", "kg", Canonical::WeightKg),
  alias("color_options", "Colors", "", Canonical::ColorOptions),
  alias("environmental", "Environmental", "", Canonical::Environmental),
];

/// One canonical field as found on a specific row
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpec<'a> {
  pub canonical: Canonical,
  pub label: &'static str,
  pub unit: &'static str,
  /// Label exactly as stored on the row
  pub source_label: &'a str,
  pub value: &'a SpecValue,
}

impl ResolvedSpec<'_> {
  /// Value with its unit suffix, e.g. `60 W`
  pub fn display_value(&self) -> String {
    if self.unit.is_empty() {
      self.value.to_string()
    } else {
      format!("{} {}", self.value, self.unit)
    }
  }
}

/// Resolve a row's specs in table order, one entry per canonical field
pub fn resolve(specs: &SpecSheet) -> Vec<ResolvedSpec<'_>> {
  let mut resolved: Vec<ResolvedSpec<'_>> = Vec::new();

  for entry in ALIASES {
    if resolved.iter().any(|r| r.canonical == entry.canonical) {
      continue;
    }
    let Some((source_label, value)) = specs.iter().find(|(label, _)| *label == entry.source) else {
      continue;
    };
    if is_blank(value) {
      continue;
    }
    resolved.push(ResolvedSpec {
      canonical: entry.canonical,
      label: entry.label,
      unit: entry.unit,
      source_label,
      value,
    });
  }

  resolved
}

/// First value present for one canonical field
pub fn lookup(specs: &SpecSheet, canonical: Canonical) -> Option<ResolvedSpec<'_>> {
  resolve(specs).into_iter().find(|r| r.canonical == canonical)
}

fn is_blank(value: &SpecValue) -> bool {
  match value {
    SpecValue::Text(text) => text.trim().is_empty(),
    SpecValue::List(items) => items.is_empty(),
    _ => false,
  }
}
