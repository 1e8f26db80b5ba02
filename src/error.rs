//! HTTP-facing error type. Every variant renders as a JSON `{error, ...}` body.

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::error;

use crate::completion::CompletionFailure;
use crate::domain::AVAILABLE_MODELS;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// A required request field is missing or malformed.
  #[error("{0}")]
  Validation(String),

  #[error("Invalid model selection")]
  InvalidModel,

  #[error("Invalid credentials")]
  Unauthorized,

  #[error("{0}")]
  Conflict(String),

  #[error(transparent)]
  Store(StoreError),

  /// Completion failure surfaced under the strict failure policy.
  #[error("{0}")]
  Upstream(CompletionFailure),
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::Duplicate(what) => Self::Conflict(format!("{what} already exists")),
      other => Self::Store(other),
    }
  }
}

/// Malformed or mistyped request bodies answer with the same `{error}` shape as every other 400.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl ApiError {
  pub fn missing(field: &str) -> Self {
    Self::Validation(format!("Missing required field: \"{field}\""))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Validation(_) | Self::InvalidModel => StatusCode::BAD_REQUEST,
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Upstream(f) => f.status(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Self::InvalidModel => json!({
        "error": self.to_string(),
        "available_models": AVAILABLE_MODELS.iter().map(|m| m.id).collect::<Vec<_>>(),
      }),
      Self::Store(e) => {
        error!(target: "aitalk_backend", error = %e, "Store operation failed");
        json!({ "error": "Database error", "details": e.to_string() })
      }
      Self::Upstream(f) => json!({ "error": upstream_message(f), "details": f.to_string() }),
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}

fn upstream_message(f: &CompletionFailure) -> &'static str {
  match f {
    CompletionFailure::Unconfigured => "AI service not configured. Please configure the OpenRouter API key.",
    CompletionFailure::RateLimited => "Rate limit reached. Please try again in a moment.",
    CompletionFailure::QuotaExceeded => "AI service quota exceeded. Please try again later.",
    CompletionFailure::Timeout => "The AI service took too long to respond.",
    CompletionFailure::Unavailable(_) => "The AI service is currently unavailable.",
  }
}
