//! Deterministic electrical calculations for constant-voltage (70V/100V)
//! and low-impedance speaker systems.
//!
//! Everything here is pure arithmetic. Invalid input comes back as a
//! [`CalculationError`] value, never a panic.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Standard constant-voltage transformer sizes, watts
pub const TRANSFORMER_SIZES: [i64; 10] = [50, 70, 100, 125, 150, 200, 250, 300, 500, 1000];

/// Standard speaker tap positions, watts
pub const STANDARD_TAPS: [f64; 9] = [0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];

pub const MIN_HEADROOM_PERCENT: f64 = 10.0;
pub const RECOMMENDED_HEADROOM_PERCENT: f64 = 20.0;

/// Load factor applied when sizing a transformer
const SIZING_FACTOR: f64 = 1.2;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum CalculationError {
  #[error("Transformer capacity must be positive, got {capacity}W")]
  InvalidCapacity { capacity: i64 },

  #[error("Cannot have a 0Ω speaker in parallel")]
  ZeroImpedanceInParallel,

  #[error("Impedance cannot be negative, got {value}Ω")]
  NegativeImpedance { value: f64 },

  #[error("Connection must be 'series' or 'parallel', got '{mode}'")]
  UnknownConnection { mode: String },

  #[error("No speaker impedances provided")]
  NoImpedances,

  #[error("Speaker full power must be positive, got {watts}W")]
  InvalidFullPower { watts: f64 },

  #[error("Speaker wattage must be positive, got {watts}W")]
  NonPositiveUnitWatts { watts: i64 },

  #[error("Numbers too large to calculate with")]
  Overflow,

  #[error("Could not determine calculation type from parameters")]
  Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
  Series,
  Parallel,
}

impl Connection {
  pub fn parse(mode: &str) -> Result<Self, CalculationError> {
    match mode.trim().to_ascii_lowercase().as_str() {
      "series" => Ok(Connection::Series),
      "parallel" => Ok(Connection::Parallel),
      _ => Err(CalculationError::UnknownConnection { mode: mode.to_string() }),
    }
  }
}

impl fmt::Display for Connection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Connection::Series => write!(f, "Series"),
      Connection::Parallel => write!(f, "Parallel"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadroomTier {
  Incompatible,
  /// Under the 10% minimum
  Low,
  /// Between the minimum and the recommended 20%
  Acceptable,
  Optimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
  pub compatible: bool,
  pub total_load: i64,
  pub capacity: i64,
  pub headroom_percent: f64,
  pub tier: HeadroomTier,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpedanceReport {
  pub total_ohms: f64,
  pub connection: Connection,
  pub values: Vec<f64>,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformerRecommendation {
  pub load_watts: i64,
  pub recommended_watts: i64,
  pub alternatives: Vec<i64>,
  pub headroom_percent: f64,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapSelection {
  pub full_power_watts: f64,
  pub target_watts: f64,
  pub tap_watts: f64,
  pub reduction_db: f64,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitCapacity {
  pub max_units: i64,
  pub unit_watts: i64,
  pub total_load: i64,
  pub capacity: i64,
  pub headroom_percent: f64,
  pub message: String,
}

/// Outcome of [`CalculationEngine::evaluate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationResult {
  TotalPower { total_watts: i64, speakers: Vec<i64> },
  Compatibility(CompatibilityReport),
  Impedance(ImpedanceReport),
  Transformer(TransformerRecommendation),
  Tap(TapSelection),
  UnitCapacity(UnitCapacity),
}

/// Numbers pulled out of a calculation question
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalculationParams {
  pub speakers: Vec<i64>,
  pub transformer_watts: Option<i64>,
  pub recommend_transformer_for: Option<i64>,
  pub impedances: Vec<f64>,
  pub connection: Option<String>,
  pub reduction_db: Option<f64>,
  pub full_power_watts: Option<f64>,
  pub unit_watts: Option<i64>,
}

impl CalculationParams {
  pub fn is_empty(&self) -> bool {
    *self == CalculationParams::default()
  }
}

fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

fn headroom(capacity: i64, load: i64) -> f64 {
  (capacity as f64 - load as f64) / capacity as f64 * 100.0
}

/// Stateless; shared freely between requests
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationEngine;

impl CalculationEngine {
  pub fn new() -> Self {
    Self
  }

  pub fn total_power(&self, speakers: &[i64]) -> Result<i64, CalculationError> {
    speakers
      .iter()
      .try_fold(0i64, |total, watts| total.checked_add(*watts))
      .ok_or(CalculationError::Overflow)
  }

  pub fn verify_compatibility(
    &self,
    total: i64,
    capacity: i64,
  ) -> Result<CompatibilityReport, CalculationError> {
    if capacity <= 0 {
      return Err(CalculationError::InvalidCapacity { capacity });
    }

    let compatible = total <= capacity;
    let headroom_percent = round_to(headroom(capacity, total), 1);

    let (tier, message) = if !compatible {
      (
        HeadroomTier::Incompatible,
        format!(
          "INCOMPATIBLE: Load ({total}W) exceeds transformer capacity ({capacity}W) by {}W",
          i128::from(total) - i128::from(capacity)
        ),
      )
    } else if headroom_percent < MIN_HEADROOM_PERCENT {
      (
        HeadroomTier::Low,
        format!(
          "WARNING: Low headroom ({headroom_percent:.1}%). Recommended minimum is \
           {MIN_HEADROOM_PERCENT}%"
        ),
      )
    } else if headroom_percent < RECOMMENDED_HEADROOM_PERCENT {
      (
        HeadroomTier::Acceptable,
        format!(
          "Acceptable: {headroom_percent:.1}% headroom. Recommended is \
           {RECOMMENDED_HEADROOM_PERCENT}%"
        ),
      )
    } else {
      (
        HeadroomTier::Optimal,
        format!("Good: {headroom_percent:.1}% headroom - optimal configuration"),
      )
    };

    Ok(CompatibilityReport { compatible, total_load: total, capacity, headroom_percent, tier, message })
  }

  pub fn combine_impedance(
    &self,
    values: &[f64],
    mode: &str,
  ) -> Result<ImpedanceReport, CalculationError> {
    let connection = Connection::parse(mode)?;
    if values.is_empty() {
      return Err(CalculationError::NoImpedances);
    }
    if let Some(&value) = values.iter().find(|v| **v < 0.0) {
      return Err(CalculationError::NegativeImpedance { value });
    }

    let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    let (total, message) = match connection {
      Connection::Series => {
        let total: f64 = values.iter().sum();
        (total, format!("Series connection: {}Ω = {total:.2}Ω", rendered.join(" + ")))
      }
      Connection::Parallel => {
        if values.contains(&0.0) {
          return Err(CalculationError::ZeroImpedanceInParallel);
        }
        let total = 1.0 / values.iter().map(|v| 1.0 / v).sum::<f64>();
        (total, format!("Parallel connection: 1/(1/{})Ω = {total:.2}Ω", rendered.join(" + 1/")))
      }
    };

    Ok(ImpedanceReport {
      total_ohms: round_to(total, 2),
      connection,
      values: values.to_vec(),
      message,
    })
  }

  pub fn recommend_transformer(&self, total: i64) -> TransformerRecommendation {
    let required = total as f64 * SIZING_FACTOR;
    let largest = TRANSFORMER_SIZES[TRANSFORMER_SIZES.len() - 1];
    let recommended =
      TRANSFORMER_SIZES.iter().copied().find(|size| *size as f64 >= required).unwrap_or(largest);

    let alternatives: Vec<i64> = TRANSFORMER_SIZES
      .iter()
      .copied()
      .filter(|size| *size >= total && *size != recommended)
      .take(2)
      .collect();

    let headroom_percent = round_to(headroom(recommended, total), 1);
    TransformerRecommendation {
      load_watts: total,
      recommended_watts: recommended,
      alternatives,
      headroom_percent,
      message: format!(
        "Recommended: {recommended}W transformer for {total}W load ({headroom_percent:.1}% headroom)"
      ),
    }
  }

  pub fn tap_for_reduction(
    &self,
    reduction_db: f64,
    full_power: f64,
  ) -> Result<TapSelection, CalculationError> {
    if full_power <= 0.0 || !full_power.is_finite() {
      return Err(CalculationError::InvalidFullPower { watts: full_power });
    }

    if reduction_db <= 0.0 {
      return Ok(TapSelection {
        full_power_watts: full_power,
        target_watts: full_power,
        tap_watts: full_power,
        reduction_db: 0.0,
        message: "No reduction needed, use full power tap".to_string(),
      });
    }

    let target = full_power * 10f64.powf(-reduction_db / 10.0);
    let tap = STANDARD_TAPS
      .iter()
      .copied()
      .filter(|tap| *tap <= full_power)
      .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
      .unwrap_or(STANDARD_TAPS[0]);
    let actual = 10.0 * (full_power / tap).log10();

    Ok(TapSelection {
      full_power_watts: full_power,
      target_watts: round_to(target, 1),
      tap_watts: tap,
      reduction_db: round_to(actual, 1),
      message: format!("Use {tap}W tap for approximately {actual:.1}dB reduction"),
    })
  }

  pub fn max_units_for_capacity(
    &self,
    capacity: i64,
    unit_watts: i64,
    headroom_percent: f64,
  ) -> Result<UnitCapacity, CalculationError> {
    if unit_watts <= 0 {
      return Err(CalculationError::NonPositiveUnitWatts { watts: unit_watts });
    }
    if capacity <= 0 {
      return Err(CalculationError::InvalidCapacity { capacity });
    }

    let usable = capacity as f64 * (1.0 - headroom_percent / 100.0);
    let max_units = (usable / unit_watts as f64).floor().max(0.0) as i64;
    let total_load = max_units.checked_mul(unit_watts).ok_or(CalculationError::Overflow)?;
    let actual = round_to(headroom(capacity, total_load), 1);

    Ok(UnitCapacity {
      max_units,
      unit_watts,
      total_load,
      capacity,
      headroom_percent: actual,
      message: format!(
        "Maximum {max_units} speakers at {unit_watts}W each ({total_load}W total, {actual:.1}% \
         headroom)"
      ),
    })
  }

  /// Run the one calculation the parameters describe.
  ///
  /// Checked in order: compatibility, impedance, tap, unit capacity,
  /// transformer sizing, then a plain power sum.
  pub fn evaluate(
    &self,
    params: &CalculationParams,
  ) -> Result<CalculationResult, CalculationError> {
    if let (false, Some(capacity)) = (params.speakers.is_empty(), params.transformer_watts) {
      let total = self.total_power(&params.speakers)?;
      return self.verify_compatibility(total, capacity).map(CalculationResult::Compatibility);
    }

    if let (false, Some(mode)) = (params.impedances.is_empty(), params.connection.as_deref()) {
      return self.combine_impedance(&params.impedances, mode).map(CalculationResult::Impedance);
    }

    if let (Some(db), Some(full_power)) = (params.reduction_db, params.full_power_watts) {
      return self.tap_for_reduction(db, full_power).map(CalculationResult::Tap);
    }

    if let (Some(unit), Some(capacity)) = (params.unit_watts, params.transformer_watts) {
      return self
        .max_units_for_capacity(capacity, unit, RECOMMENDED_HEADROOM_PERCENT)
        .map(CalculationResult::UnitCapacity);
    }

    if let Some(load) = params.recommend_transformer_for {
      return Ok(CalculationResult::Transformer(self.recommend_transformer(load)));
    }

    if !params.speakers.is_empty() {
      return Ok(CalculationResult::TotalPower {
        total_watts: self.total_power(&params.speakers)?,
        speakers: params.speakers.clone(),
      });
    }

    Err(CalculationError::Unrecognized)
  }
}
