//! Turning raw model output into a `SuggestionResult`.
//!
//! The parser is layered: fence stripping, strict JSON with normalization,
//! then recovery strategies (prose restatement, pattern scrape, placeholder).
//! `parse` is total and reports which strategy produced the result.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{SuggestionResult, VocabSuggestion};

pub const NO_GRAMMAR_ERRORS: &str = "No grammar errors found";
pub const ANALYSIS_UNAVAILABLE: &str = "Grammar analysis unavailable";
const UNEXPECTED_FORMAT: &str = "The AI provided feedback in an unexpected format. Please try again.";

/// Which layer of the parser produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
  /// Bare JSON object matching the schema.
  Strict,
  /// JSON object inside a markdown code fence.
  Fenced,
  /// Output was prose, not an object.
  Prose,
  /// Broken JSON; error/correction pair scraped from text.
  Scraped,
  /// Nothing usable; fixed retry content.
  Placeholder,
}

impl ParseStrategy {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Strict => "strict",
      Self::Fenced => "fenced",
      Self::Prose => "prose",
      Self::Scraped => "scraped",
      Self::Placeholder => "placeholder",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSuggestions {
  pub result: SuggestionResult,
  pub strategy: ParseStrategy,
}

/// Parse raw completion text. Never fails.
pub fn parse(raw: &str) -> ParsedSuggestions {
  let (body, fenced) = strip_fence(raw);

  if !(body.starts_with('{') && body.ends_with('}')) {
    debug!(target: "suggestions", body_len = body.len(), "Model returned prose instead of JSON");
    return ParsedSuggestions { result: from_prose(body), strategy: ParseStrategy::Prose };
  }

  match parse_strict(body) {
    Ok(result) => {
      let strategy = if fenced { ParseStrategy::Fenced } else { ParseStrategy::Strict };
      ParsedSuggestions { result, strategy }
    }
    Err(reason) => {
      warn!(target: "suggestions", %reason, "Suggestion JSON rejected; trying recovery");
      match scrape(body) {
        Some(result) => ParsedSuggestions { result, strategy: ParseStrategy::Scraped },
        None => ParsedSuggestions { result: placeholder(), strategy: ParseStrategy::Placeholder },
      }
    }
  }
}

/// Trim and remove a surrounding ``` / ```json fence. Returns whether one was removed.
pub fn strip_fence(raw: &str) -> (&str, bool) {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else {
    return (s, false);
  };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  let rest = rest.trim_end();
  let rest = rest.strip_suffix("```").unwrap_or(rest);
  (rest.trim(), true)
}

/// Strict layer: JSON object with normalized `grammar_fix` and non-empty lists.
pub fn parse_strict(body: &str) -> Result<SuggestionResult, String> {
  let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
  let obj = value.as_object().ok_or("top-level value is not an object")?;

  let grammar_fix = normalize_grammar_fix(obj.get("grammar_fix"));
  let better_versions = normalize_better_versions(obj.get("better_versions"))
    .ok_or("better_versions missing or empty")?;
  let vocabulary = normalize_vocabulary(obj.get("vocabulary"))
    .ok_or("vocabulary missing or empty")?;

  Ok(SuggestionResult { grammar_fix, better_versions, vocabulary })
}

/// Render `grammar_fix` as a single string whatever shape the model chose.
pub fn normalize_grammar_fix(v: Option<&Value>) -> String {
  match v {
    Some(Value::Array(items)) => {
      let parts: Vec<String> = items.iter().map(render_fix_item).filter(|s| !s.is_empty()).collect();
      if parts.is_empty() { NO_GRAMMAR_ERRORS.into() } else { parts.join("; ") }
    }
    Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
    Some(Value::String(_)) | Some(Value::Null) | None => NO_GRAMMAR_ERRORS.into(),
    Some(other) => other.to_string(),
  }
}

fn render_fix_item(item: &Value) -> String {
  if let Value::Object(o) = item {
    if let (Some(err), Some(fix)) = (non_empty_str(o, "error"), non_empty_str(o, "correction")) {
      return format!("\"{}\" should be \"{}\"", err, fix);
    }
  }
  value_to_text(item)
}

fn normalize_better_versions(v: Option<&Value>) -> Option<Vec<String>> {
  let out: Vec<String> = match v? {
    Value::Array(items) => items.iter().map(value_to_text).filter(|s| !s.is_empty()).collect(),
    Value::String(s) => vec![s.clone()],
    _ => return None,
  };
  (!out.is_empty()).then_some(out)
}

fn normalize_vocabulary(v: Option<&Value>) -> Option<Vec<VocabSuggestion>> {
  let items = v?.as_array()?;
  let out: Vec<VocabSuggestion> = items
    .iter()
    .filter_map(|item| match item {
      Value::Object(o) => Some(VocabSuggestion {
        word: field_text(o, "word"),
        meaning: field_text(o, "meaning"),
        example: field_text(o, "example"),
      }),
      Value::String(s) if !s.trim().is_empty() => Some(VocabSuggestion::new(s, "", "")),
      _ => None,
    })
    .filter(|v| !v.word.is_empty())
    .collect();
  (!out.is_empty()).then_some(out)
}

fn non_empty_str<'a>(o: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  o.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn field_text(o: &Map<String, Value>, key: &str) -> String {
  o.get(key).map(value_to_text).unwrap_or_default()
}

fn value_to_text(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// Prose layer: restate the text when it looks like feedback, otherwise ask for a retry.
pub fn from_prose(body: &str) -> SuggestionResult {
  let grammar_fix = if body.contains("error") && body.contains("correction") {
    body.to_string()
  } else {
    UNEXPECTED_FORMAT.to_string()
  };
  SuggestionResult {
    grammar_fix,
    better_versions: vec![
      "Please try your message again for better suggestions.".into(),
      "The AI analysis needs to be reformatted.".into(),
      "Consider rephrasing your input for clearer feedback.".into(),
    ],
    vocabulary: vec![VocabSuggestion::new(
      "reformatted",
      "arranged in a different format",
      "The data was reformatted for better clarity.",
    )],
  }
}

fn scrape_pattern() -> Option<&'static Regex> {
  static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
  PATTERN
    .get_or_init(|| {
      Regex::new(r#"(?i)error"?\s*:?\s*"?([^,}"]+)"?.*correction"?\s*:?\s*"?([^,}"]+)"#).ok()
    })
    .as_ref()
}

/// Scrape layer: pull an `error ... correction ...` pair out of broken JSON.
pub fn scrape(body: &str) -> Option<SuggestionResult> {
  let caps = scrape_pattern()?.captures(body)?;
  let error = caps.get(1)?.as_str().trim();
  let correction = caps.get(2)?.as_str().trim();
  if error.is_empty() || correction.is_empty() {
    return None;
  }
  Some(SuggestionResult {
    grammar_fix: format!("Error: \"{}\" should be \"{}\"", error, correction),
    better_versions: vec![correction.to_string()],
    vocabulary: vec![retry_vocab()],
  })
}

pub fn placeholder() -> SuggestionResult {
  SuggestionResult {
    grammar_fix: ANALYSIS_UNAVAILABLE.into(),
    better_versions: vec!["Please try rephrasing your message".into()],
    vocabulary: vec![retry_vocab()],
  }
}

fn retry_vocab() -> VocabSuggestion {
  VocabSuggestion::new("retry", "to try again", "Please retry your request.")
}
