//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
  routing::{get, post, put},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod records;

/// Build the application router with:
/// - chat pipeline: `/chat`, `/suggestions`, `/grammar`, `/lesson`, `/lesson/generate`
/// - settings under `/settings/...`
/// - record CRUD: vocab, auth, lessons, streak, badges, leaderboard, progress
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(http::http_health))
    // Chat pipeline
    .route("/chat", post(http::http_post_chat))
    .route("/suggestions", post(http::http_post_suggestions))
    .route("/grammar", post(http::http_post_grammar))
    .route("/lesson", get(http::http_get_lesson))
    .route("/lesson/generate", post(http::http_post_lesson_generate))
    // Settings
    .route("/settings/models", get(http::http_get_models))
    .route("/settings/current-model", get(http::http_get_current_model))
    .route("/settings/select-model", post(http::http_post_select_model))
    .route("/settings/voice", get(http::http_get_voice).post(http::http_post_voice))
    // Records
    .route("/vocab", get(records::http_list_vocab).post(records::http_add_vocab))
    .route("/vocab/:id", put(records::http_update_vocab).delete(records::http_delete_vocab))
    .route("/auth/register", post(records::http_register))
    .route("/auth/login", post(records::http_login))
    .route("/lessons", get(records::http_list_lessons).post(records::http_add_lesson))
    .route("/lessons/:id", put(records::http_update_lesson).delete(records::http_delete_lesson))
    .route("/streak/:user_id", get(records::http_get_streak).post(records::http_set_streak))
    .route("/badges", post(records::http_award_badge))
    .route("/badges/:user_id", get(records::http_list_badges))
    .route("/leaderboard", get(records::http_leaderboard).post(records::http_set_score))
    .route("/progress", get(records::http_list_progress).post(records::http_add_progress))
    // State + CORS + HTTP tracing
    .with_state(state)
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any),
    )
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
  };
  use serde_json::{json, Value};
  use tower::ServiceExt;
  use wiremock::matchers::{body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::config::{AppConfig, FailurePolicy};
  use crate::domain::DEFAULT_MODEL_ID;
  use crate::store::Store;

  fn app_with(cfg: AppConfig) -> Router {
    let store = Store::open_in_memory().expect("in-memory store");
    build_router(Arc::new(AppState::with_store(&cfg, store).expect("app state")))
  }

  fn offline_app() -> Router {
    app_with(AppConfig::default())
  }

  fn upstream_cfg(server: &MockServer, policy: FailurePolicy) -> AppConfig {
    AppConfig {
      api_key: Some("sk-test".into()),
      base_url: server.uri(),
      timeout: Duration::from_secs(2),
      failure_policy: policy,
      ..AppConfig::default()
    }
  }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(b) => builder.header("content-type", "application/json").body(Body::from(b.to_string())),
      None => builder.body(Body::empty()),
    }
    .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }

  async fn send_raw(app: &Router, uri: &str, content_type: &str, body: &'static str) -> (StatusCode, String, Value) {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header("content-type", content_type)
      .body(Body::from(body))
      .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let ct = res.headers().get("content-type").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, ct, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  async fn mount_reply(server: &MockServer, status: u16, content: &str) {
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(status).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
      })))
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn grammar_demo_mode_without_credentials() {
    let app = offline_app();
    let (status, body) = send(&app, "POST", "/grammar", Some(json!({ "sentence": "their is alot of homework" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "correction": "[Demo Mode] there is a lot of homework" }));
  }

  #[tokio::test]
  async fn suggestions_without_text_is_rejected() {
    let app = offline_app();
    let (status, body) = send(&app, "POST", "/suggestions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err = body["error"].as_str().unwrap();
    assert!(err.contains("text") && err.contains("message"), "{err}");
  }

  #[tokio::test]
  async fn select_model_rejects_unknown_ids() {
    let app = offline_app();
    let (status, body) = send(&app, "POST", "/settings/select-model", Some(json!({ "model_id": "not-a-real-model" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let ids: Vec<&str> = body["available_models"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(ids.len(), 4);
    assert!(ids.contains(&DEFAULT_MODEL_ID));
  }

  #[tokio::test]
  async fn model_selection_round_trip() {
    let app = offline_app();
    let (_, current) = send(&app, "GET", "/settings/current-model", None).await;
    assert_eq!(current["selected_model"], DEFAULT_MODEL_ID);

    let (status, body) = send(&app, "POST", "/settings/select-model", Some(json!({ "model_id": "google/gemma-2-9b-it:free" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "AI model updated to Gemma 2 9B (Free)");

    let (_, current) = send(&app, "GET", "/settings/current-model", None).await;
    assert_eq!(current["selected_model"], "google/gemma-2-9b-it:free");
    assert_eq!(current["model_info"]["provider"], "Google");

    let (_, models) = send(&app, "GET", "/settings/models", None).await;
    assert_eq!(models["available"].as_array().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn chat_uses_selected_model_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_partial_json(json!({ "model": "meta-llama/llama-3.2-3b-instruct:free" })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": "Nice to meet you!" } }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let app = app_with(upstream_cfg(&server, FailurePolicy::Lenient));
    send(&app, "POST", "/settings/select-model", Some(json!({ "model_id": "meta-llama/llama-3.2-3b-instruct:free" }))).await;
    let (status, body) = send(&app, "POST", "/chat", Some(json!({ "message": "Hi!" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "reply": "Nice to meet you!" }));
  }

  #[tokio::test]
  async fn chat_falls_back_with_failure_tag() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(429)).mount(&server).await;
    let app = app_with(upstream_cfg(&server, FailurePolicy::Strict));

    let (status, body) = send(&app, "POST", "/chat", Some(json!({ "message": "I want to learn English" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"].as_str().unwrap().starts_with("[Temporary AI Limit] "));
  }

  #[tokio::test]
  async fn chat_upstream_errors_use_keyword_ladder() {
    for upstream in [500, 504] {
      let server = MockServer::start().await;
      Mock::given(method("POST")).respond_with(ResponseTemplate::new(upstream)).mount(&server).await;
      let app = app_with(upstream_cfg(&server, FailurePolicy::Lenient));

      let (status, body) = send(&app, "POST", "/chat", Some(json!({ "message": "I play pickleball" }))).await;
      assert_eq!(status, StatusCode::OK);
      let reply = body["reply"].as_str().unwrap();
      assert!(reply.starts_with("[Demo Mode] "), "HTTP {upstream}: {reply}");
      assert!(reply.contains("Pickleball is such a fun sport"), "HTTP {upstream}: {reply}");
    }
  }

  #[tokio::test]
  async fn malformed_bodies_get_json_errors() {
    let app = offline_app();

    let (status, ct, body) = send_raw(&app, "/chat", "application/json", r#"{"message": 5}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ct.starts_with("application/json"), "{ct}");
    assert!(body["error"].is_string());

    let (status, ct, body) = send_raw(&app, "/suggestions", "application/json", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ct.starts_with("application/json"), "{ct}");
    assert!(body["error"].is_string());

    let (status, _, body) = send_raw(&app, "/vocab", "text/plain", r#"{"word": "x"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, body) = send_raw(&app, "/leaderboard", "application/json", r#"{"user_id": "one", "score": 3}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn strict_unconfigured_suggestions_answer_500() {
    let app = app_with(AppConfig { failure_policy: FailurePolicy::Strict, ..AppConfig::default() });
    let (status, body) = send(&app, "POST", "/suggestions", Some(json!({ "text": "hello" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].is_string());
  }

  #[tokio::test]
  async fn chat_demo_mode_and_missing_message() {
    let app = offline_app();
    let (status, body) = send(&app, "POST", "/chat", Some(json!({ "message": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"].as_str().unwrap().starts_with("[Demo Mode] "));

    let (status, _) = send(&app, "POST", "/chat", Some(json!({ "message": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn suggestions_parse_fenced_model_output() {
    let server = MockServer::start().await;
    let content = "```json\n{\"grammar_fix\": [{\"error\": \"I are\", \"correction\": \"I am\"}], \"better_versions\": [\"I am ready.\"], \"vocabulary\": [{\"word\": \"ready\", \"meaning\": \"prepared\", \"example\": \"I am ready.\"}]}\n```";
    mount_reply(&server, 200, content).await;
    let app = app_with(upstream_cfg(&server, FailurePolicy::Strict));

    let (status, body) = send(&app, "POST", "/suggestions", Some(json!({ "message": "I are ready" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grammar_fix"], "\"I are\" should be \"I am\"");
    assert_eq!(body["better_versions"], json!(["I am ready."]));
    assert_eq!(body["vocabulary"][0]["word"], "ready");
  }

  #[tokio::test]
  async fn strict_policy_mirrors_failure_status() {
    for (upstream, expected) in [
      (429, StatusCode::TOO_MANY_REQUESTS),
      (402, StatusCode::PAYMENT_REQUIRED),
      (503, StatusCode::INTERNAL_SERVER_ERROR),
      (504, StatusCode::INTERNAL_SERVER_ERROR),
    ] {
      let server = MockServer::start().await;
      Mock::given(method("POST")).respond_with(ResponseTemplate::new(upstream)).mount(&server).await;
      let app = app_with(upstream_cfg(&server, FailurePolicy::Strict));

      let (status, body) = send(&app, "POST", "/suggestions", Some(json!({ "text": "hello" }))).await;
      assert_eq!(status, expected);
      assert!(body["error"].is_string());
      assert!(body["details"].is_string());
    }
  }

  #[tokio::test]
  async fn strict_policy_times_out_with_504() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
      .mount(&server)
      .await;
    let mut cfg = upstream_cfg(&server, FailurePolicy::Strict);
    cfg.timeout = Duration::from_millis(300);
    let app = app_with(cfg);

    let (status, _) = send(&app, "POST", "/suggestions", Some(json!({ "text": "hello" }))).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
  }

  #[tokio::test]
  async fn lenient_policy_degrades_to_placeholder_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(402)).mount(&server).await;
    let app = app_with(upstream_cfg(&server, FailurePolicy::Lenient));

    let (status, body) = send(&app, "POST", "/suggestions", Some(json!({ "text": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grammar_fix"], "AI service quota exceeded");
    assert_eq!(body["vocabulary"][0]["word"], "quota");

    let (status, body) = send(&app, "POST", "/lesson/generate", Some(json!({ "level": "beginner", "topic": "food" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["lesson"].as_str().unwrap().starts_with("[AI Service Quota] "));
  }

  #[tokio::test]
  async fn voice_settings_validate_booleans() {
    let app = offline_app();
    let (_, body) = send(&app, "GET", "/settings/voice", None).await;
    assert_eq!(body["voice_autoplay_enabled"], true);
    assert_eq!(body["voice_input_enabled"], true);

    let (status, _) = send(&app, "POST", "/settings/voice", Some(json!({ "voice_autoplay_enabled": "yes", "voice_input_enabled": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/settings/voice", Some(json!({ "voice_autoplay_enabled": false, "voice_input_enabled": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&app, "GET", "/settings/voice", None).await;
    assert_eq!(body["voice_autoplay_enabled"], false);
  }

  #[tokio::test]
  async fn vocab_and_auth_routes() {
    let app = offline_app();
    let (_, created) = send(&app, "POST", "/vocab", Some(json!({ "word": "brisk", "meaning": "quick" }))).await;
    let id = created["id"].as_i64().unwrap();

    let (_, updated) = send(&app, "PUT", &format!("/vocab/{id}"), Some(json!({ "mastered": true }))).await;
    assert_eq!(updated, json!({ "updated": 1 }));
    let (_, list) = send(&app, "GET", "/vocab", None).await;
    assert_eq!(list[0]["mastered"], 1);
    let (_, deleted) = send(&app, "DELETE", &format!("/vocab/{id}"), None).await;
    assert_eq!(deleted, json!({ "deleted": 1 }));

    let creds = json!({ "email": "kim@example.com", "password": "pw", "name": "Kim" });
    let (status, _) = send(&app, "POST", "/auth/register", Some(creds.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/auth/register", Some(creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/auth/login", Some(json!({ "email": "kim@example.com", "password": "pw" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Kim");
    assert!(body["user"].get("password").is_none());
    let (status, _) = send(&app, "POST", "/auth/login", Some(json!({ "email": "kim@example.com", "password": "nope" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn streak_defaults_and_leaderboard() {
    let app = offline_app();
    let (_, body) = send(&app, "GET", "/streak/9", None).await;
    assert_eq!(body, json!({ "user_id": 9, "streak_count": 0 }));

    let (_, user) = send(&app, "POST", "/auth/register", Some(json!({ "email": "a@b.c", "password": "pw", "name": "Ada" }))).await;
    let uid = user["id"].as_i64().unwrap();
    send(&app, "POST", &format!("/streak/{uid}"), Some(json!({ "streak_count": 3 }))).await;
    send(&app, "POST", "/leaderboard", Some(json!({ "user_id": uid, "score": 120 }))).await;

    let (_, board) = send(&app, "GET", "/leaderboard", None).await;
    assert_eq!(board, json!([{ "name": "Ada", "score": 120, "streak_count": 3 }]));

    let (_, badge) = send(&app, "POST", "/badges", Some(json!({ "user_id": uid, "badge_name": "Starter" }))).await;
    assert!(badge["id"].is_i64());
    let (_, badges) = send(&app, "GET", &format!("/badges/{uid}"), None).await;
    assert_eq!(badges[0]["badge_name"], "Starter");
  }

  #[tokio::test]
  async fn lessons_and_progress_routes() {
    let app = offline_app();
    let (_, lesson) = send(&app, "GET", "/lesson", None).await;
    assert!(lesson["lesson"].as_str().unwrap().starts_with("Today:"));

    let (_, created) = send(&app, "POST", "/lessons", Some(json!({ "title": "Verbs", "content": "go, went", "difficulty": "A2" }))).await;
    let id = created["id"].as_i64().unwrap();
    let (_, updated) = send(&app, "PUT", &format!("/lessons/{id}"), Some(json!({ "title": "Irregular verbs", "content": "go, went, gone", "difficulty": "A2" }))).await;
    assert_eq!(updated["updated"], 1);
    let (_, list) = send(&app, "GET", "/lessons", None).await;
    assert_eq!(list[0]["title"], "Irregular verbs");

    send(&app, "POST", "/progress", Some(json!({ "metric": "minutes", "value": 15 }))).await;
    let (_, progress) = send(&app, "GET", "/progress", None).await;
    assert_eq!(progress[0]["metric"], "minutes");
  }
}
