//! AITalk · English Conversation Practice Backend
//!
//! - Axum HTTP API (chat, suggestions, grammar, lessons, settings, records)
//! - Optional OpenRouter-compatible completion API (via environment variables)
//! - SQLite persistence for settings and learning records
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   OPENROUTER_API_KEY       : enables the completion API if present
//!   OPENROUTER_BASE_URL      : default "https://openrouter.ai/api/v1"
//!   COMPLETION_TIMEOUT_SECS  : per-call timeout (default 30)
//!   DATABASE_PATH            : SQLite file (default "./aitalk.db")
//!   FAILURE_POLICY           : "lenient" (default) or "strict"
//!   AGENT_CONFIG_PATH        : path to TOML config (prompt overrides)
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod store;
mod settings;
mod completion;
mod fallback;
mod grammar;
mod suggestions;
mod error;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::from_env();

  // Shared state: SQLite store, completion client, prompts, failure policy.
  let state = Arc::new(AppState::new(&cfg)?);

  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "aitalk_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
