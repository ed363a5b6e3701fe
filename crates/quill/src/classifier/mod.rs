//! Intent classification.
//!
//! Three layers, first hit wins:
//! 1. guardrails (purchase vocabulary, then competitor names)
//! 2. an ordered table of (intent, patterns) rules
//! 3. an optional one-word completion when no rule matched

pub mod extract;

use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

use crate::calculator::CalculationParams;
use crate::error::Result;
use crate::models::{Filter, Intent};
use crate::ports::{CompletionOptions, CompletionPort};

pub use extract::Extractor;

const PURCHASE_VOCABULARY: &str = r"\b(?:prices?|pricing|costs?|how much|buy|purchase|stock|availability|where to get|ordering|quotes?|discounts?|deals?|sales?)\b";

const COMPETITORS: &str =
  r"\b(?:sonos|jbl|yamaha|qsc|crestron|extron|biamp|crown|lab.gruppen)\b";

const CALCULATION_RULES: &[&str] = &[
  r"can i connect",
  r"how many .* can i",
  r"will .* work with",
  r"calculate",
  r"what(?:'s| is) the total",
  r"(\d+)\s*(?:×|x)\s*(\d+)\s*W",
  r"(\d+)\s*speakers?\s*(?:at|@)\s*(\d+)\s*W",
  r"transformer",
  r"impedance.*(?:series|parallel)",
  r"\btaps?\b",
  r"(?:reduc|drop|lower|attenuat|quieter)\w*.*\d+(?:\.\d+)?\s*dB\b",
  r"\d+(?:\.\d+)?\s*dB\s+(?:reduction|drop|quieter|lower|down|attenuation)",
];

const LOOKUP_RULES: &[&str] = &[
  r"what(?:'s| is) the .* of (\w+[-/]?\w*)",
  r"(?:get|show|tell me) (?:the )?.* (?:for|of) (\w+[-/]?\w*)",
  r"(\w+[-/]\w+) (?:specs|specifications|details)",
  r"specs (?:for|of) (\w+[-/]?\w*)",
  r"(\w+) (?:power|specs|frequency|impedance|sensitivity|coverage|weight)",
];

const SEARCH_RULES: &[&str] = &[
  r"find",
  r"search",
  r"recommend",
  r"suggest",
  r"looking for",
  r"best .* for",
  r"which .* should",
  r"suitable for",
  r"good for",
];

const CLASSIFICATION_PROMPT: &str = "You are classifying user queries about professional audio products.

Classify this query into exactly one category:
- DIRECT_LOOKUP: Asking for specific specs of a known product (e.g., \"What's the power of AM10/60?\")
- SEMANTIC_SEARCH: Looking for products matching criteria (e.g., \"Find 70V speakers for conference rooms\")
- CALCULATION: Math/electrical calculations (e.g., \"Can I connect 4x30W speakers to 150W transformer?\")

Query: {query}

Respond with ONLY one word: DIRECT_LOOKUP, SEMANTIC_SEARCH, or CALCULATION";

/// Sampling for the one-word classification call
pub const CLASSIFY_OPTIONS: CompletionOptions = CompletionOptions { temperature: 0.1, max_tokens: 10 };

fn compile(source: &str) -> Result<Regex> {
  Ok(regex::RegexBuilder::new(source).case_insensitive(true).build()?)
}

/// One row of the rule table
#[derive(Debug, Clone)]
pub struct RuleGroup {
  pub intent: Intent,
  patterns: Vec<Regex>,
}

impl RuleGroup {
  fn new(intent: Intent, sources: &[&str]) -> Result<Self> {
    let patterns = sources.iter().map(|source| compile(source)).collect::<Result<_>>()?;
    Ok(Self { intent, patterns })
  }

  pub fn matches(&self, text: &str) -> bool {
    self.patterns.iter().any(|p| p.is_match(text))
  }
}

/// Map a free-form model reply onto an intent
pub fn parse_label(reply: &str) -> Intent {
  let reply = reply.trim().to_uppercase();
  if reply.contains("DIRECT") || reply.contains("LOOKUP") {
    Intent::DirectLookup
  } else if reply.contains("CALC") {
    Intent::Calculation
  } else if reply.contains("SEMANTIC") || reply.contains("SEARCH") {
    Intent::SemanticSearch
  } else {
    bentley::warn!("unexpected classifier reply: {reply}");
    Intent::SemanticSearch
  }
}

pub struct IntentClassifier {
  purchase: Regex,
  competitors: Regex,
  rules: Vec<RuleGroup>,
  completion: Option<Arc<dyn CompletionPort>>,
  timeout: Duration,
  extractor: Extractor,
}

impl IntentClassifier {
  /// Rules only; unmatched text falls through to semantic search
  pub fn new() -> Result<Self> {
    Ok(Self {
      purchase: compile(PURCHASE_VOCABULARY)?,
      competitors: compile(COMPETITORS)?,
      rules: vec![
        RuleGroup::new(Intent::Calculation, CALCULATION_RULES)?,
        RuleGroup::new(Intent::DirectLookup, LOOKUP_RULES)?,
        RuleGroup::new(Intent::SemanticSearch, SEARCH_RULES)?,
      ],
      completion: None,
      timeout: Duration::from_secs(30),
      extractor: Extractor::new()?,
    })
  }

  /// Ask `completion` when no rule matches, giving up after `timeout`
  pub fn with_completion(mut self, completion: Arc<dyn CompletionPort>, timeout: Duration) -> Self {
    self.completion = Some(completion);
    self.timeout = timeout;
    self
  }

  /// Intents of the rule table, in evaluation order
  pub fn rule_order(&self) -> Vec<Intent> {
    self.rules.iter().map(|group| group.intent).collect()
  }

  pub fn extractor(&self) -> &Extractor {
    &self.extractor
  }

  pub async fn classify(&self, text: &str) -> Intent {
    let text = text.trim();
    if text.is_empty() {
      return Intent::Unknown;
    }

    if let Some(intent) = self.classify_by_rules(text) {
      bentley::debug!("rule classification: {} -> {intent}", preview(text));
      return intent;
    }

    let intent = match &self.completion {
      Some(completion) => self.classify_with_model(completion.as_ref(), text).await,
      None => Intent::SemanticSearch,
    };
    bentley::debug!("fallback classification: {} -> {intent}", preview(text));
    intent
  }

  /// Guardrails and the rule table; `None` when nothing matched
  pub fn classify_by_rules(&self, text: &str) -> Option<Intent> {
    if self.purchase.is_match(text) {
      bentley::info!("purchase intent detected: {}", preview(text));
      return Some(Intent::PurchaseIntent);
    }
    if self.competitors.is_match(text) {
      bentley::info!("domain violation detected: {}", preview(text));
      return Some(Intent::DomainViolation);
    }

    self.rules.iter().find(|group| group.matches(text)).map(|group| group.intent)
  }

  async fn classify_with_model(&self, completion: &dyn CompletionPort, text: &str) -> Intent {
    let prompt = CLASSIFICATION_PROMPT.replace("{query}", text);
    match tokio::time::timeout(self.timeout, completion.complete(&prompt, CLASSIFY_OPTIONS)).await {
      Ok(Ok(reply)) => parse_label(&reply),
      Ok(Err(e)) => {
        bentley::warn!("classifier completion failed: {e}");
        Intent::SemanticSearch
      }
      Err(_) => {
        bentley::warn!("classifier completion timed out after {}ms", self.timeout.as_millis());
        Intent::SemanticSearch
      }
    }
  }

  pub fn extract_model_name(&self, text: &str) -> Option<String> {
    self.extractor.extract_model_name(text)
  }

  pub fn extract_filters(&self, text: &str) -> Filter {
    self.extractor.extract_filters(text)
  }

  pub fn extract_calculation_params(&self, text: &str) -> CalculationParams {
    self.extractor.extract_calculation_params(text)
  }
}

/// First 50 characters, for log lines
fn preview(text: &str) -> String {
  text.chars().take(50).collect()
}
