//! Public request/response structs for the HTTP endpoints (serde ready).
//! Request fields are optional so handlers can answer missing input with a 400 of their own.

use axum::extract::FromRequest;
use serde::{Deserialize, Serialize};

use crate::domain::{ModelInfo, User};
use crate::error::ApiError;

/// `Json` body extractor whose rejections render as `ApiError` JSON.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

// --- Chat pipeline ---

#[derive(Debug, Default, Deserialize)]
pub struct ChatIn {
  #[serde(default)]
  pub message: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatOut {
  pub reply: String,
}

/// Accepts either `text` or `message`; `text` wins when both are set.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionsIn {
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrammarIn {
  #[serde(default)]
  pub sentence: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct GrammarOut {
  pub correction: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LessonGenerateIn {
  #[serde(default)]
  pub level: Option<String>,
  #[serde(default)]
  pub topic: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct LessonOut {
  pub lesson: String,
}

// --- Settings ---

#[derive(Serialize)]
pub struct ModelsOut {
  pub available: &'static [ModelInfo],
  pub message: &'static str,
}

#[derive(Serialize)]
pub struct CurrentModelOut {
  pub selected_model: String,
  pub model_info: &'static ModelInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectModelIn {
  #[serde(default)]
  pub model_id: Option<String>,
}
#[derive(Serialize)]
pub struct SelectModelOut {
  pub success: bool,
  pub selected_model: &'static str,
  pub model_info: &'static ModelInfo,
  pub message: String,
}

/// Raw JSON values so non-boolean input can be rejected with a 400.
#[derive(Debug, Default, Deserialize)]
pub struct VoiceSettingsIn {
  #[serde(default)]
  pub voice_autoplay_enabled: serde_json::Value,
  #[serde(default)]
  pub voice_input_enabled: serde_json::Value,
}
#[derive(Serialize)]
pub struct VoiceSettingsOut {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub success: Option<bool>,
  pub voice_autoplay_enabled: bool,
  pub voice_input_enabled: bool,
  pub message: &'static str,
}

// --- Records ---

#[derive(Serialize)]
pub struct IdOut {
  pub id: i64,
}
#[derive(Serialize)]
pub struct UpdatedOut {
  pub updated: usize,
}
#[derive(Serialize)]
pub struct DeletedOut {
  pub deleted: usize,
}
#[derive(Serialize)]
pub struct SuccessOut {
  pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct VocabIn {
  pub word: String,
  #[serde(default)]
  pub meaning: String,
}

/// `mastered` arrives as a boolean or as the stored 0/1 integer.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum MasteredFlag {
  Bool(bool),
  Int(i64),
}
impl MasteredFlag {
  pub fn as_bool(self) -> bool {
    match self {
      Self::Bool(b) => b,
      Self::Int(i) => i != 0,
    }
  }
}
#[derive(Debug, Deserialize)]
pub struct VocabUpdateIn {
  pub mastered: MasteredFlag,
}

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub name: String,
}
#[derive(Serialize)]
pub struct RegisterOut {
  pub id: i64,
  pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
  pub email: String,
  pub password: String,
}
#[derive(Serialize)]
pub struct LoginOut {
  pub user: User,
  pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LessonIn {
  pub title: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub difficulty: String,
}

#[derive(Debug, Deserialize)]
pub struct StreakIn {
  pub streak_count: i64,
}
#[derive(Serialize)]
pub struct EmptyStreakOut {
  pub user_id: i64,
  pub streak_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct BadgeIn {
  pub user_id: i64,
  pub badge_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreIn {
  pub user_id: i64,
  pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProgressIn {
  pub metric: String,
  pub value: i64,
}
