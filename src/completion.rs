//! Minimal chat-completion client (OpenRouter / OpenAI-compatible).
//!
//! We only call `chat/completions` and read back plain text. Every failure is
//! classified into `CompletionFailure` so callers can pick a fallback.
//!
//! NOTE: We never log the API key and we only log sizes of prompts/replies.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::AppConfig;

/// Key value shipped in sample `.env` files; treated as "no key".
const PLACEHOLDER_KEY: &str = "your_api_key_here";

/// Why a completion call produced no text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionFailure {
  #[error("AI service not configured")]
  Unconfigured,
  #[error("AI service rate limit reached")]
  RateLimited,
  #[error("AI service quota exceeded")]
  QuotaExceeded,
  #[error("AI service timed out")]
  Timeout,
  #[error("AI service unavailable: {0}")]
  Unavailable(String),
}

impl CompletionFailure {
  /// Status code used when the failure is surfaced to the client.
  pub fn status(&self) -> StatusCode {
    match self {
      Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
      Self::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
      Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
      Self::Unconfigured | Self::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Short stable name for logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unconfigured => "unconfigured",
      Self::RateLimited => "rate_limited",
      Self::QuotaExceeded => "quota_exceeded",
      Self::Timeout => "timeout",
      Self::Unavailable(_) => "unavailable",
    }
  }

  fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
    match status.as_u16() {
      429 => Self::RateLimited,
      402 => Self::QuotaExceeded,
      _ => {
        let msg = extract_api_error(body).unwrap_or_else(|| body.chars().take(200).collect());
        Self::Unavailable(format!("HTTP {}: {}", status, msg))
      }
    }
  }

  fn from_transport(e: reqwest::Error) -> Self {
    if e.is_timeout() { Self::Timeout } else { Self::Unavailable(e.to_string()) }
  }
}

/// One role-tagged prompt message.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
  pub role: &'static str,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: "system", content: content.into() }
  }
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: "user", content: content.into() }
  }
}

/// A single completion call: model, messages and sampling budget.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
  pub model: String,
  pub messages: Vec<ChatMessage>,
  pub max_tokens: u32,
  pub temperature: Option<f32>,
}

impl CompletionRequest {
  pub fn new(model: &str, system: &str, user: &str, max_tokens: u32) -> Self {
    Self {
      model: model.to_string(),
      messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
      max_tokens,
      temperature: None,
    }
  }

  pub fn with_temperature(mut self, t: f32) -> Self {
    self.temperature = Some(t);
    self
  }
}

#[derive(Clone)]
pub struct CompletionClient {
  client: reqwest::Client,
  api_key: Option<String>,
  pub base_url: String,
  pub timeout: Duration,
}

impl CompletionClient {
  /// Build the client from configuration. A missing key is allowed; calls then short-circuit.
  /// Fails only when the HTTP client itself cannot be built; there is no untimed fallback.
  pub fn new(cfg: &AppConfig) -> reqwest::Result<Self> {
    let api_key = cfg.api_key.clone().filter(|k| k != PLACEHOLDER_KEY);
    let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
    Ok(Self { client, api_key, base_url: cfg.base_url.clone(), timeout: cfg.timeout })
  }

  pub fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }

  /// Plain-text chat completion. Returns the trimmed reply or a classified failure.
  #[instrument(level = "info", skip(self, req), fields(model = %req.model, max_tokens = req.max_tokens))]
  pub async fn complete(&self, req: CompletionRequest) -> Result<String, CompletionFailure> {
    let Some(api_key) = &self.api_key else {
      return Err(CompletionFailure::Unconfigured);
    };

    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: &req.model,
      messages: &req.messages,
      max_tokens: req.max_tokens,
      temperature: req.temperature,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "aitalk-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", api_key))
      .json(&body)
      .send()
      .await
      .map_err(CompletionFailure::from_transport);

    let res = match res {
      Ok(r) => r,
      Err(f) => {
        error!(elapsed = ?start.elapsed(), kind = f.kind(), error = %f, "Completion request failed");
        return Err(f);
      }
    };

    let status = res.status();
    if !status.is_success() {
      let text = res.text().await.unwrap_or_default();
      let f = CompletionFailure::from_status(status, &text);
      error!(elapsed = ?start.elapsed(), %status, kind = f.kind(), "Completion API returned an error");
      return Err(f);
    }

    let parsed: ChatCompletionResponse = res.json().await.map_err(|e| {
      error!(error = %e, "Malformed completion payload");
      CompletionFailure::from_transport(e)
    })?;
    if let Some(usage) = &parsed.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Completion usage");
    }

    let text = parsed.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .map(|c| c.trim().to_string())
      .filter(|c| !c.is_empty())
      .ok_or_else(|| CompletionFailure::Unavailable("completion had no content".into()))?;

    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Completion received");
    Ok(text)
  }
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: &'a [ChatMessage],
  max_tokens: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use wiremock::matchers::{body_partial_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn client_for(server: &MockServer, key: Option<&str>) -> CompletionClient {
    let cfg = AppConfig {
      api_key: key.map(String::from),
      base_url: server.uri(),
      timeout: Duration::from_millis(500),
      ..AppConfig::default()
    };
    CompletionClient::new(&cfg).expect("http client")
  }

  fn request() -> CompletionRequest {
    CompletionRequest::new("test/model", "You are a tutor.", "Hello", 300)
  }

  fn reply(content: &str) -> serde_json::Value {
    json!({
      "choices": [{ "message": { "role": "assistant", "content": content } }],
      "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
  }

  #[tokio::test]
  async fn sends_model_messages_and_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer sk-test"))
      .and(body_partial_json(json!({
        "model": "test/model",
        "max_tokens": 300,
        "messages": [
          { "role": "system", "content": "You are a tutor." },
          { "role": "user", "content": "Hello" }
        ]
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(reply("  Hi there!  ")))
      .expect(1)
      .mount(&server)
      .await;

    let out = client_for(&server, Some("sk-test")).complete(request()).await;
    assert_eq!(out, Ok("Hi there!".to_string()));
  }

  #[tokio::test]
  async fn missing_key_short_circuits_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(reply("never")))
      .expect(0)
      .mount(&server)
      .await;

    assert_eq!(client_for(&server, None).complete(request()).await, Err(CompletionFailure::Unconfigured));
    assert_eq!(
      client_for(&server, Some("your_api_key_here")).complete(request()).await,
      Err(CompletionFailure::Unconfigured)
    );
  }

  #[tokio::test]
  async fn classifies_status_codes() {
    for (status, expected) in [
      (429, CompletionFailure::RateLimited),
      (402, CompletionFailure::QuotaExceeded),
    ] {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
      assert_eq!(client_for(&server, Some("k")).complete(request()).await, Err(expected));
    }
  }

  #[tokio::test]
  async fn server_errors_are_unavailable_with_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": { "message": "upstream exploded" } })))
      .mount(&server)
      .await;

    match client_for(&server, Some("k")).complete(request()).await {
      Err(CompletionFailure::Unavailable(msg)) => assert!(msg.contains("upstream exploded"), "{msg}"),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[tokio::test]
  async fn upstream_gateway_statuses_are_unavailable_not_timeouts() {
    for status in [504, 408] {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

      match client_for(&server, Some("k")).complete(request()).await {
        Err(CompletionFailure::Unavailable(msg)) => assert!(msg.contains(&status.to_string()), "{msg}"),
        other => panic!("HTTP {status}: unexpected {other:?}"),
      }
    }
  }

  #[tokio::test]
  async fn slow_upstream_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(reply("late")).set_delay(Duration::from_secs(3)))
      .mount(&server)
      .await;

    assert_eq!(client_for(&server, Some("k")).complete(request()).await, Err(CompletionFailure::Timeout));
  }

  #[tokio::test]
  async fn malformed_or_empty_payloads_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
      .mount(&server)
      .await;
    assert!(matches!(
      client_for(&server, Some("k")).complete(request()).await,
      Err(CompletionFailure::Unavailable(_))
    ));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
      .mount(&server)
      .await;
    assert!(matches!(
      client_for(&server, Some("k")).complete(request()).await,
      Err(CompletionFailure::Unavailable(_))
    ));
  }

  #[test]
  fn strict_status_mapping() {
    assert_eq!(CompletionFailure::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(CompletionFailure::QuotaExceeded.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(CompletionFailure::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(CompletionFailure::Unavailable("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(CompletionFailure::Unconfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
