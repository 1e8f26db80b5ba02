//! Request pipelines behind the chat, suggestion, grammar and lesson endpoints.
//!
//! Each pipeline reads the selected model from the store, makes at most one
//! completion call, and turns a failure into fallback content or an error
//! according to the configured failure policy.

use tracing::{info, instrument, warn};

use crate::completion::{CompletionFailure, CompletionRequest};
use crate::config::FailurePolicy;
use crate::domain::SuggestionResult;
use crate::error::ApiError;
use crate::fallback;
use crate::grammar;
use crate::settings::selected_model;
use crate::state::AppState;
use crate::suggestions;
use crate::util::{fill_template, trunc_for_log};

const CHAT_MAX_TOKENS: u32 = 300;
const GRAMMAR_MAX_TOKENS: u32 = 300;
const SUGGESTIONS_MAX_TOKENS: u32 = 600;
const LESSON_MAX_TOKENS: u32 = 800;

/// Static plan served by `GET /lesson`.
pub const DAILY_LESSON: &str = "Today: Practice introductions, review 5 new words, and chat with the AI tutor.";

#[instrument(level = "info", skip(state, message), fields(message_len = message.len()))]
pub async fn do_chat(state: &AppState, message: &str) -> String {
  let model = selected_model(&state.store);
  let req = CompletionRequest::new(&model, &state.prompts.chat_system, message, CHAT_MAX_TOKENS).with_temperature(0.7);

  match state.completion.complete(req).await {
    Ok(reply) => {
      info!(target: "chat", %model, reply_len = reply.len(), "Chat reply via completion API");
      reply
    }
    Err(f) => {
      warn!(target: "chat", %model, kind = f.kind(), "Chat completion failed; using fallback reply");
      fallback::chat_reply(message, &f, &mut rand::thread_rng())
    }
  }
}

#[instrument(level = "info", skip(state, sentence), fields(sentence_len = sentence.len()))]
pub async fn do_grammar(state: &AppState, sentence: &str) -> String {
  let model = selected_model(&state.store);
  let req = CompletionRequest::new(&model, &state.prompts.grammar_system, sentence, GRAMMAR_MAX_TOKENS);

  match state.completion.complete(req).await {
    Ok(correction) => correction,
    Err(f) => {
      warn!(target: "chat", %model, kind = f.kind(), "Grammar completion failed; using local rules");
      grammar::fallback_correction(sentence, &f)
    }
  }
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_suggestions(state: &AppState, text: &str) -> Result<SuggestionResult, ApiError> {
  let model = selected_model(&state.store);
  let user = fill_template(&state.prompts.suggestions_user_template, &[("text", text)]);
  let req = CompletionRequest::new(&model, &state.prompts.suggestions_system, &user, SUGGESTIONS_MAX_TOKENS).with_temperature(0.3);

  match state.completion.complete(req).await {
    Ok(raw) => {
      let parsed = suggestions::parse(&raw);
      info!(target: "suggestions", %model, strategy = parsed.strategy.as_str(), raw = %trunc_for_log(&raw, 80), "Suggestions parsed");
      Ok(parsed.result)
    }
    Err(f) => on_failure(state.failure_policy, f, |f| fallback::suggestions(text, f)),
  }
}

#[instrument(level = "info", skip(state), fields(%level, %topic))]
pub async fn do_generate_lesson(state: &AppState, level: &str, topic: &str) -> Result<String, ApiError> {
  let model = selected_model(&state.store);
  let user = fill_template(&state.prompts.lesson_user_template, &[("level", level), ("topic", topic)]);
  let req = CompletionRequest::new(&model, &state.prompts.lesson_system, &user, LESSON_MAX_TOKENS);

  match state.completion.complete(req).await {
    Ok(lesson) => Ok(lesson),
    Err(f) => on_failure(state.failure_policy, f, |f| fallback::lesson_plan(level, topic, f)),
  }
}

/// Apply the failure policy: canned content (lenient) or a mirrored HTTP error (strict).
fn on_failure<T>(
  policy: FailurePolicy,
  failure: CompletionFailure,
  canned: impl FnOnce(&CompletionFailure) -> T,
) -> Result<T, ApiError> {
  warn!(target: "suggestions", kind = failure.kind(), ?policy, "Completion failed");
  match policy {
    FailurePolicy::Lenient => Ok(canned(&failure)),
    FailurePolicy::Strict => Err(ApiError::Upstream(failure)),
  }
}
