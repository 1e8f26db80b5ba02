//! Runtime configuration: environment variables plus optional prompt overrides from TOML.
//!
//! See `AppConfig`, `Prompts` and `FailurePolicy` for the accepted settings.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_DATABASE_PATH: &str = "./aitalk.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3000;

/// What structured endpoints (suggestions, lesson generation) do when the completion call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// Surface the failure as an HTTP error mirroring its kind.
  Strict,
  /// Always answer 200 with canned content for the failure kind.
  #[default]
  Lenient,
}

impl FailurePolicy {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "strict" => Some(Self::Strict),
      "lenient" => Some(Self::Lenient),
      _ => None,
    }
  }
}

/// Agent configuration file (TOML). Only prompts are configurable there.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts sent to the completion API. Defaults target English tutoring.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub chat_system: String,
  pub grammar_system: String,
  pub suggestions_system: String,
  pub suggestions_user_template: String,
  pub lesson_system: String,
  pub lesson_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      chat_system: "You are an English language learning tutor, NOT a general AI assistant. Your ONLY job is to help users practice and improve their English. Always stay focused on English learning topics. If users ask about other topics, gently redirect them back to English learning while still being helpful.\n\nWhen responding:\n1. If their English has errors, start with \"A better way to say this would be: [corrected version]\"\n2. Then engage with their topic in a natural, conversational way\n3. End with a follow-up question to encourage more English practice\n4. Keep responses 50-80 words\n5. Never discuss AI, language models, or technical topics\n\nBe encouraging, friendly, and always redirect conversations toward English practice.".into(),
      grammar_system: "You are a grammar teacher. Correct the given text and briefly explain any errors.".into(),
      suggestions_system: "You are an English teacher. Analyze the student's message and provide feedback in JSON format ONLY.\n\nYour response must be valid JSON with exactly this structure:\n\n{\n  \"grammar_fix\": \"Describe grammar errors and corrections, or 'No grammar errors found'\",\n  \"better_versions\": [\"improved version 1\", \"improved version 2\", \"improved version 3\"],\n  \"vocabulary\": [\n    {\"word\": \"word1\", \"meaning\": \"definition\", \"example\": \"example sentence\"}\n  ]\n}\n\nDo not include any text before or after the JSON. Do not use markdown formatting.".into(),
      suggestions_user_template: "Analyze: \"{text}\"".into(),
      lesson_system: "You are an English lesson planner. Create structured lesson plans.".into(),
      lesson_user_template: "Create a {level} level English lesson about {topic}. Include objectives, activities, and exercises.".into(),
    }
  }
}

/// Everything the process needs at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  pub api_key: Option<String>,
  pub base_url: String,
  pub timeout: Duration,
  pub database_path: String,
  pub failure_policy: FailurePolicy,
  pub prompts: Prompts,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      api_key: None,
      base_url: DEFAULT_BASE_URL.into(),
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
      database_path: DEFAULT_DATABASE_PATH.into(),
      failure_policy: FailurePolicy::default(),
      prompts: Prompts::default(),
    }
  }
}

impl AppConfig {
  /// Read configuration from the process environment.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build configuration from an arbitrary key lookup (the environment in production).
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
    let defaults = Self::default();

    let port = get("PORT")
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(defaults.port);
    let api_key = get("OPENROUTER_API_KEY")
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty());
    let base_url = get("OPENROUTER_BASE_URL")
      .map(|u| u.trim_end_matches('/').to_string())
      .unwrap_or(defaults.base_url);
    let timeout = get("COMPLETION_TIMEOUT_SECS")
      .and_then(|s| s.parse::<u64>().ok())
      .filter(|s| *s > 0)
      .map(Duration::from_secs)
      .unwrap_or(defaults.timeout);
    let database_path = get("DATABASE_PATH").unwrap_or(defaults.database_path);

    let failure_policy = match get("FAILURE_POLICY") {
      Some(raw) => FailurePolicy::parse(&raw).unwrap_or_else(|| {
        warn!(target: "aitalk_backend", value = %raw, "Unknown FAILURE_POLICY; using lenient");
        FailurePolicy::Lenient
      }),
      None => defaults.failure_policy,
    };

    let prompts = get("AGENT_CONFIG_PATH")
      .and_then(|path| load_agent_config(&path))
      .map(|c| c.prompts)
      .unwrap_or_default();

    Self { port, api_key, base_url, timeout, database_path, failure_policy, prompts }
  }
}

/// Attempt to load `AgentConfig` from a TOML file. On any parsing/IO error, returns None.
pub fn load_agent_config(path: &str) -> Option<AgentConfig> {
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "aitalk_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "aitalk_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "aitalk_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
