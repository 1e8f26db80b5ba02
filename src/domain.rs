//! Domain models used by the backend: model catalog, suggestion results, and learning records.

use serde::{Deserialize, Serialize};

/// Model used when nothing (or something unreadable) is stored in settings.
pub const DEFAULT_MODEL_ID: &str = "deepseek/deepseek-chat-v3-0324:free";

/// One selectable completion model.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ModelInfo {
  pub id: &'static str,
  pub name: &'static str,
  pub description: &'static str,
  pub provider: &'static str,
  pub tier: &'static str,
}

/// Fixed allow-list of models a user may select.
pub const AVAILABLE_MODELS: &[ModelInfo] = &[
  ModelInfo {
    id: DEFAULT_MODEL_ID,
    name: "DeepSeek V3 (Free)",
    description: "High-quality conversations and analysis",
    provider: "DeepSeek",
    tier: "Free",
  },
  ModelInfo {
    id: "meta-llama/llama-3.2-3b-instruct:free",
    name: "Llama 3.2 3B (Free)",
    description: "Fast responses with good quality",
    provider: "Meta",
    tier: "Free",
  },
  ModelInfo {
    id: "microsoft/phi-3-mini-128k-instruct:free",
    name: "Phi-3 Mini (Free)",
    description: "Efficient small model for basic tasks",
    provider: "Microsoft",
    tier: "Free",
  },
  ModelInfo {
    id: "google/gemma-2-9b-it:free",
    name: "Gemma 2 9B (Free)",
    description: "Google's open model with good performance",
    provider: "Google",
    tier: "Free",
  },
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
  AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

/// Normalized grammar/vocabulary feedback for one learner message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionResult {
  pub grammar_fix: String,
  pub better_versions: Vec<String>,
  pub vocabulary: Vec<VocabSuggestion>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabSuggestion {
  pub word: String,
  pub meaning: String,
  pub example: String,
}

impl VocabSuggestion {
  pub fn new(word: &str, meaning: &str, example: &str) -> Self {
    Self { word: word.into(), meaning: meaning.into(), example: example.into() }
  }
}

/// Voice preferences, persisted as stringified booleans.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceSettings {
  pub voice_autoplay_enabled: bool,
  pub voice_input_enabled: bool,
}

impl Default for VoiceSettings {
  fn default() -> Self {
    Self { voice_autoplay_enabled: true, voice_input_enabled: true }
  }
}

// --- Persisted records ---

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct VocabEntry {
  pub id: i64,
  pub word: String,
  pub meaning: String,
  pub mastered: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Lesson {
  pub id: i64,
  pub title: String,
  pub content: String,
  pub difficulty: String,
  pub created_at: String,
}

/// Public view of a user; the password digest never leaves the store.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct User {
  pub id: i64,
  pub email: String,
  pub name: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Streak {
  pub id: i64,
  pub user_id: i64,
  pub streak_count: i64,
  pub last_activity: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Badge {
  pub id: i64,
  pub user_id: i64,
  pub badge_name: String,
  pub earned_at: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LeaderboardRow {
  pub name: String,
  pub score: i64,
  pub streak_count: Option<i64>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ProgressMetric {
  pub id: i64,
  pub metric: String,
  pub value: i64,
}
