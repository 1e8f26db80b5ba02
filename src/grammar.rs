//! Local grammar correction used when the completion call is unavailable.
//!
//! A fixed table of regex substitutions, applied in order. Each rule that
//! changes the sentence contributes a short note.

use std::sync::OnceLock;

use regex::Regex;

use crate::completion::CompletionFailure;
use crate::fallback::mode_tag;

struct GrammarRule {
  pattern: &'static str,
  replacement: &'static str,
  note: &'static str,
}

const RULES: &[GrammarRule] = &[
  GrammarRule { pattern: r"(?i)\bI are\b", replacement: "I am", note: "Corrected subject-verb agreement" },
  GrammarRule { pattern: r"(?i)\b(he|she) are\b", replacement: "${1} is", note: "Corrected subject-verb agreement" },
  GrammarRule { pattern: r"(?i)\btheir is\b", replacement: "there is", note: "Changed 'their' to 'there'" },
  GrammarRule { pattern: r"(?i)\balot\b", replacement: "a lot", note: "'A lot' should be two words" },
  GrammarRule { pattern: r"\bi\b", replacement: "I", note: "Capitalized 'I'" },
  GrammarRule { pattern: r"(?i)\bwont\b", replacement: "won't", note: "Added apostrophe to 'won't'" },
  GrammarRule { pattern: r"(?i)\bdont\b", replacement: "don't", note: "Added apostrophe to 'don't'" },
];

fn compiled() -> &'static [(Regex, &'static GrammarRule)] {
  static COMPILED: OnceLock<Vec<(Regex, &'static GrammarRule)>> = OnceLock::new();
  COMPILED.get_or_init(|| {
    RULES
      .iter()
      .filter_map(|r| Regex::new(r.pattern).ok().map(|re| (re, r)))
      .collect()
  })
}

/// Sentence after local rules, plus the notes of rules that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCorrection {
  pub text: String,
  pub notes: Vec<&'static str>,
}

pub fn correct_locally(sentence: &str) -> LocalCorrection {
  let mut text = sentence.to_string();
  let mut notes: Vec<&'static str> = Vec::new();
  for (re, rule) in compiled() {
    let next = re.replace_all(&text, rule.replacement).into_owned();
    if next != text {
      if !notes.contains(&rule.note) {
        notes.push(rule.note);
      }
      text = next;
    }
  }
  LocalCorrection { text, notes }
}

/// Tagged correction for a failed or unconfigured completion call.
///
/// Unconfigured replies carry just the corrected text; after an upstream
/// failure the applied fixes are listed in parentheses.
pub fn fallback_correction(sentence: &str, failure: &CompletionFailure) -> String {
  let c = correct_locally(sentence);
  let tag = mode_tag(failure);
  if matches!(failure, CompletionFailure::Unconfigured) || c.notes.is_empty() {
    format!("{} {}", tag, c.text)
  } else {
    format!("{} {} ({})", tag, c.text, c.notes.join("; "))
  }
}
