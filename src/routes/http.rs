//! HTTP handlers for the chat pipeline and settings. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs lengths rather than user text.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::{info, instrument};

use crate::domain::{SuggestionResult, VoiceSettings, AVAILABLE_MODELS};
use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::settings;
use crate::state::AppState;
use crate::util::non_blank;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<ChatIn>,
) -> Result<Json<ChatOut>, ApiError> {
  let message = non_blank(body.message.as_deref()).ok_or_else(|| ApiError::missing("message"))?;
  let reply = do_chat(&state, message).await;
  Ok(Json(ChatOut { reply }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_suggestions(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<SuggestionsIn>,
) -> Result<Json<SuggestionResult>, ApiError> {
  let text = non_blank(body.text.as_deref())
    .or_else(|| non_blank(body.message.as_deref()))
    .ok_or_else(|| ApiError::Validation("No text provided. Please send either \"text\" or \"message\" field.".into()))?;
  let result = do_suggestions(&state, text).await?;
  Ok(Json(result))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_grammar(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<GrammarIn>,
) -> Result<Json<GrammarOut>, ApiError> {
  let sentence = non_blank(body.sentence.as_deref()).ok_or_else(|| ApiError::missing("sentence"))?;
  let correction = do_grammar(&state, sentence).await;
  Ok(Json(GrammarOut { correction }))
}

#[instrument(level = "info")]
pub async fn http_get_lesson() -> Json<LessonOut> {
  Json(LessonOut { lesson: DAILY_LESSON.into() })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_lesson_generate(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<LessonGenerateIn>,
) -> Result<Json<LessonOut>, ApiError> {
  let level = non_blank(body.level.as_deref()).ok_or_else(|| ApiError::missing("level"))?;
  let topic = non_blank(body.topic.as_deref()).ok_or_else(|| ApiError::missing("topic"))?;
  let lesson = do_generate_lesson(&state, level, topic).await?;
  Ok(Json(LessonOut { lesson }))
}

// --- Settings ---

#[instrument(level = "info")]
pub async fn http_get_models() -> Json<ModelsOut> {
  Json(ModelsOut { available: AVAILABLE_MODELS, message: "Available AI models for selection" })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_current_model(State(state): State<Arc<AppState>>) -> Json<CurrentModelOut> {
  let selected_model = settings::selected_model(&state.store);
  let model_info = settings::model_info_or_default(&selected_model);
  Json(CurrentModelOut { selected_model, model_info })
}

#[instrument(level = "info", skip(state, body), fields(model_id = ?body.model_id))]
pub async fn http_post_select_model(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<SelectModelIn>,
) -> Result<Json<SelectModelOut>, ApiError> {
  let id = body.model_id.as_deref().unwrap_or_default();
  let info = settings::select_model(&state.store, id)?.ok_or(ApiError::InvalidModel)?;
  info!(target: "aitalk_backend", model = info.id, "Selected AI model updated");
  Ok(Json(SelectModelOut {
    success: true,
    selected_model: info.id,
    model_info: info,
    message: format!("AI model updated to {}", info.name),
  }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_voice(State(state): State<Arc<AppState>>) -> Result<Json<VoiceSettingsOut>, ApiError> {
  let v = settings::voice_settings(&state.store)?;
  Ok(Json(VoiceSettingsOut {
    success: None,
    voice_autoplay_enabled: v.voice_autoplay_enabled,
    voice_input_enabled: v.voice_input_enabled,
    message: "Voice settings retrieved successfully",
  }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_voice(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<VoiceSettingsIn>,
) -> Result<Json<VoiceSettingsOut>, ApiError> {
  let (Some(autoplay), Some(input)) = (body.voice_autoplay_enabled.as_bool(), body.voice_input_enabled.as_bool()) else {
    return Err(ApiError::Validation("Voice settings must be boolean values".into()));
  };
  let v = VoiceSettings { voice_autoplay_enabled: autoplay, voice_input_enabled: input };
  settings::save_voice_settings(&state.store, v)?;
  Ok(Json(VoiceSettingsOut {
    success: Some(true),
    voice_autoplay_enabled: autoplay,
    voice_input_enabled: input,
    message: "Voice settings updated successfully",
  }))
}
