//! CRUD handlers for learning records: vocabulary, users, lessons, streaks, badges, leaderboard, progress.
//! One store call per handler.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::domain::{Badge, LeaderboardRow, Lesson, ProgressMetric, VocabEntry};
use crate::error::ApiError;
use crate::protocol::*;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Vocabulary ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_vocab(State(state): State<Arc<AppState>>) -> ApiResult<Vec<VocabEntry>> {
  Ok(Json(state.store.list_vocab()?))
}

#[instrument(level = "info", skip(state, body), fields(word = %body.word))]
pub async fn http_add_vocab(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<VocabIn>) -> ApiResult<IdOut> {
  let id = state.store.add_vocab(&body.word, &body.meaning)?;
  Ok(Json(IdOut { id }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_vocab(
  State(state): State<Arc<AppState>>,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<VocabUpdateIn>,
) -> ApiResult<UpdatedOut> {
  let updated = state.store.set_vocab_mastered(id, body.mastered.as_bool())?;
  Ok(Json(UpdatedOut { updated }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_vocab(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<DeletedOut> {
  let deleted = state.store.delete_vocab(id)?;
  Ok(Json(DeletedOut { deleted }))
}

// --- Users ---

#[instrument(level = "info", skip(state, body))]
pub async fn http_register(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<RegisterIn>) -> ApiResult<RegisterOut> {
  if body.email.trim().is_empty() || body.password.is_empty() {
    return Err(ApiError::Validation("Email and password are required".into()));
  }
  let id = state.store.register_user(body.email.trim(), &body.password, &body.name)?;
  info!(target: "aitalk_backend", user_id = id, "User registered");
  Ok(Json(RegisterOut { id, message: "User registered successfully" }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_login(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<LoginIn>) -> ApiResult<LoginOut> {
  let user = state.store.verify_login(body.email.trim(), &body.password)?.ok_or(ApiError::Unauthorized)?;
  Ok(Json(LoginOut { user, message: "Login successful" }))
}

// --- Lessons ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_lessons(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Lesson>> {
  Ok(Json(state.store.list_lessons()?))
}

#[instrument(level = "info", skip(state, body), fields(title = %body.title))]
pub async fn http_add_lesson(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<LessonIn>) -> ApiResult<IdOut> {
  let id = state.store.add_lesson(&body.title, &body.content, &body.difficulty)?;
  Ok(Json(IdOut { id }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_update_lesson(
  State(state): State<Arc<AppState>>,
  Path(id): Path<i64>,
  ApiJson(body): ApiJson<LessonIn>,
) -> ApiResult<UpdatedOut> {
  let updated = state.store.update_lesson(id, &body.title, &body.content, &body.difficulty)?;
  Ok(Json(UpdatedOut { updated }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_lesson(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<DeletedOut> {
  let deleted = state.store.delete_lesson(id)?;
  Ok(Json(DeletedOut { deleted }))
}

// --- Gamification ---

#[instrument(level = "info", skip(state))]
pub async fn http_get_streak(State(state): State<Arc<AppState>>, Path(user_id): Path<i64>) -> Result<Response, ApiError> {
  Ok(match state.store.get_streak(user_id)? {
    Some(streak) => Json(streak).into_response(),
    None => Json(EmptyStreakOut { user_id, streak_count: 0 }).into_response(),
  })
}

#[instrument(level = "info", skip(state, body), fields(streak_count = body.streak_count))]
pub async fn http_set_streak(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<i64>,
  ApiJson(body): ApiJson<StreakIn>,
) -> ApiResult<SuccessOut> {
  state.store.upsert_streak(user_id, body.streak_count)?;
  Ok(Json(SuccessOut { success: true }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_badges(State(state): State<Arc<AppState>>, Path(user_id): Path<i64>) -> ApiResult<Vec<Badge>> {
  Ok(Json(state.store.list_badges(user_id)?))
}

#[instrument(level = "info", skip(state, body), fields(user_id = body.user_id, badge = %body.badge_name))]
pub async fn http_award_badge(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<BadgeIn>) -> ApiResult<IdOut> {
  let id = state.store.award_badge(body.user_id, &body.badge_name)?;
  Ok(Json(IdOut { id }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_leaderboard(State(state): State<Arc<AppState>>) -> ApiResult<Vec<LeaderboardRow>> {
  Ok(Json(state.store.leaderboard()?))
}

#[instrument(level = "info", skip(state, body), fields(user_id = body.user_id, score = body.score))]
pub async fn http_set_score(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<ScoreIn>) -> ApiResult<SuccessOut> {
  state.store.upsert_score(body.user_id, body.score)?;
  Ok(Json(SuccessOut { success: true }))
}

// --- Progress ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_progress(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ProgressMetric>> {
  Ok(Json(state.store.list_progress()?))
}

#[instrument(level = "info", skip(state, body), fields(metric = %body.metric))]
pub async fn http_add_progress(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<ProgressIn>) -> ApiResult<IdOut> {
  let id = state.store.add_progress(&body.metric, body.value)?;
  Ok(Json(IdOut { id }))
}
