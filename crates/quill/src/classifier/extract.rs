//! Pulls model names, filters and calculation numbers out of query text.

use regex::{Regex, RegexBuilder};

use crate::calculator::CalculationParams;
use crate::error::Result;
use crate::models::Filter;

/// Upper bound on "N x W" counts; larger figures are treated as noise
const MAX_REPEAT_COUNT: usize = 1_000;

/// Upper bound on any wattage read from text; larger figures are treated as noise
pub const MAX_WATTS: i64 = 100_000;

/// Product naming schemes, most specific first
const MODEL_PATTERNS: &[&str] = &[
  r"\b(AM\d+/\d+(?:/\d+)?)\b",
  r"\b(DM\d+[A-Z]*(?:-[A-Z]+)?)\b",
  r"\b(FS\d+[A-Z]*)\b",
  r"\b(EM\d+(?:-LP)?)\b",
  r"\b(IZA\s*\d+-?\w*)\b",
  r"\b(PSX?\d{3,4}[A-Z]*)\b",
  r"\b(P\d{4}[A-Z]?)\b",
  r"\b(CC-\d+D?)\b",
  r"\b(\d{3,4}B[LH])\b",
  r"\b(VB-?[S1]?)\b",
];

const SERIES_KEYWORDS: &[(&str, &str)] = &[
  ("designmax", "DesignMax"),
  ("freespace", "FreeSpace"),
  ("arenamatch", "ArenaMatch"),
  ("edgemax", "EdgeMax"),
  ("powerspace", "PowerSpace"),
];

fn pattern(source: &str) -> Result<Regex> {
  Ok(RegexBuilder::new(source).case_insensitive(true).build()?)
}

fn parse_watts(text: &str) -> Option<i64> {
  text.parse().ok().filter(|watts| (0..=MAX_WATTS).contains(watts))
}

/// Compiled extraction patterns; build once and share
#[derive(Debug, Clone)]
pub struct Extractor {
  models: Vec<Regex>,
  min_watts: Regex,
  max_watts: Regex,
  categories: Vec<(Regex, &'static str)>,
  speaker_load: Regex,
  capacity: Regex,
  watts: Regex,
  unit_watts: Regex,
  impedance_repeat: Regex,
  impedance: Regex,
  decibels: Regex,
}

impl Extractor {
  pub fn new() -> Result<Self> {
    let models = MODEL_PATTERNS.iter().map(|source| pattern(source)).collect::<Result<_>>()?;

    let categories = vec![
      (pattern(r"\b(?:loud)?speakers?\b")?, "loudspeaker"),
      (pattern(r"\b(?:amps?|amplifiers?)\b")?, "amplifier"),
      (pattern(r"\bcontrollers?\b")?, "controller"),
      (pattern(r"\b(?:subs?|subwoofers?)\b")?, "subwoofer"),
    ];

    Ok(Self {
      models,
      min_watts: pattern(r"(?:over|above|more than|>)\s*(\d+)\s*W(?:atts?)?\b")?,
      max_watts: pattern(r"(?:under|below|less than|<)\s*(\d+)\s*W(?:atts?)?\b")?,
      categories,
      speaker_load: pattern(r"(\d+)\s*(?:×|x|speakers?\s*(?:at|@)?)\s*(\d+)\s*W(?:atts?)?\b")?,
      capacity: pattern(
        r"(\d+)\s*W(?:atts?)?\s*(?:(?:70|100)\s*V\s*)?(?:transformers?|amps?|amplifiers?)\b",
      )?,
      watts: pattern(r"(\d+(?:\.\d+)?)\s*W(?:atts?)?\b")?,
      unit_watts: pattern(r"how many\s+(\d+)\s*W(?:atts?)?\b")?,
      impedance_repeat: pattern(r"(\d+)\s*(?:×|x)\s*(\d+(?:\.\d+)?)\s*(?:Ω|ohms?)")?,
      impedance: pattern(r"(\d+(?:\.\d+)?)\s*(?:Ω|ohms?)")?,
      decibels: pattern(r"(\d+(?:\.\d+)?)\s*dB\b")?,
    })
  }

  /// First product name found, upper-cased
  pub fn extract_model_name(&self, text: &str) -> Option<String> {
    self
      .models
      .iter()
      .find_map(|regex| regex.captures(text))
      .and_then(|caps| caps.get(1))
      .map(|m| m.as_str().to_uppercase())
  }

  pub fn extract_filters(&self, text: &str) -> Filter {
    let lower = text.to_lowercase();
    let mut filter = Filter::default();

    filter.min_watts = self.min_watts.captures(text).and_then(|c| parse_watts(&c[1]));
    filter.max_watts = self.max_watts.captures(text).and_then(|c| parse_watts(&c[1]));

    filter.voltage_type = match (lower.contains("70v"), lower.contains("100v")) {
      (true, true) => Some("70V/100V".to_string()),
      (true, false) => Some("70V".to_string()),
      (false, true) => Some("100V".to_string()),
      _ if lower.contains("low-z") || lower.contains("low z") => Some("Low-Z".to_string()),
      _ => None,
    };

    filter.category = self
      .categories
      .iter()
      .find(|(regex, _)| regex.is_match(text))
      .map(|(_, category)| category.to_string());

    filter.series = SERIES_KEYWORDS
      .iter()
      .find(|(keyword, _)| lower.contains(keyword))
      .map(|(_, series)| series.to_string());

    filter
  }

  pub fn extract_calculation_params(&self, text: &str) -> CalculationParams {
    let lower = text.to_lowercase();
    let mut params = CalculationParams::default();

    if let Some(caps) = self.speaker_load.captures(text) {
      if let (Some(count), Some(watts)) = (caps[1].parse::<usize>().ok(), parse_watts(&caps[2])) {
        if count <= MAX_REPEAT_COUNT {
          params.speakers = vec![watts; count];
        }
      }
    }

    params.transformer_watts = self.capacity.captures(text).and_then(|c| parse_watts(&c[1]));

    if lower.contains("transformer") && params.transformer_watts.is_none() {
      params.recommend_transformer_for = if params.speakers.is_empty() {
        self.first_watts(text).map(|watts| watts.round() as i64)
      } else {
        Some(params.speakers.iter().sum())
      };
    }

    params.unit_watts = self.unit_watts.captures(text).and_then(|c| parse_watts(&c[1]));

    params.impedances = self.extract_impedances(text);

    params.connection = if lower.contains("series") {
      Some("series".to_string())
    } else if lower.contains("parallel") {
      Some("parallel".to_string())
    } else {
      None
    };

    params.reduction_db = self.decibels.captures(text).and_then(|c| c[1].parse().ok());
    if params.reduction_db.is_some() {
      params.full_power_watts = self.first_watts(text);
    }

    params
  }

  fn first_watts(&self, text: &str) -> Option<f64> {
    self
      .watts
      .captures(text)
      .and_then(|c| c[1].parse::<f64>().ok())
      .filter(|watts| *watts <= MAX_WATTS as f64)
  }

  fn extract_impedances(&self, text: &str) -> Vec<f64> {
    if let Some(caps) = self.impedance_repeat.captures(text) {
      let count = caps[1].parse::<usize>().ok().filter(|n| *n <= MAX_REPEAT_COUNT);
      let ohms = caps[2].parse::<f64>().ok();
      if let (Some(count), Some(ohms)) = (count, ohms) {
        return vec![ohms; count];
      }
    }

    self.impedance.captures_iter(text).filter_map(|c| c[1].parse().ok()).collect()
  }
}
