//! Application state shared by all handlers.
//!
//! This module owns:
//!   - the runtime configuration (prompts + failure policy)
//!   - the completion client (configured or not)
//!   - the SQLite store
//!
//! Nothing here caches the selected model; handlers read it from the store per request.

use tracing::{info, instrument, warn};

use crate::completion::CompletionClient;
use crate::config::{AppConfig, FailurePolicy, Prompts};
use crate::store::{Store, StoreError};

/// Startup failures: the database cannot be opened or the HTTP client cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("HTTP client build failed: {0}")]
  HttpClient(#[from] reqwest::Error),
}

pub struct AppState {
  pub completion: CompletionClient,
  pub store: Store,
  pub prompts: Prompts,
  pub failure_policy: FailurePolicy,
}

impl AppState {
  /// Build state from configuration: open the database and set up the completion client.
  #[instrument(level = "info", skip_all, fields(database = %cfg.database_path))]
  pub fn new(cfg: &AppConfig) -> Result<Self, StateError> {
    let store = Store::open(&cfg.database_path)?;
    Self::with_store(cfg, store)
  }

  pub fn with_store(cfg: &AppConfig, store: Store) -> Result<Self, StateError> {
    let completion = CompletionClient::new(cfg)?;
    if completion.is_configured() {
      info!(target: "aitalk_backend", base_url = %completion.base_url, timeout = ?completion.timeout, policy = ?cfg.failure_policy, "Completion API enabled.");
    } else {
      warn!(target: "aitalk_backend", "Completion API disabled (no OPENROUTER_API_KEY). Serving demo responses.");
    }
    Ok(Self {
      completion,
      store,
      prompts: cfg.prompts.clone(),
      failure_policy: cfg.failure_policy,
    })
  }
}
