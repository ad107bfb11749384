//! EduBot · AI-Powered Educational Assistant Backend
//!
//! - Axum HTTP API: quiz generation, chat, and server-side quiz sessions
//! - Gemini integration (via environment variables)
//! - Achievements and weak-topic tracking in a key/value store
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 5001)
//!   GEMINI_API_KEY     : enables Gemini integration if present
//!   GEMINI_BASE_URL    : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL       : default "gemini-1.5-flash"
//!   EDUBOT_DATA_DIR    : directory for the file-backed store (in-memory if unset)
//!   EDUBOT_CONFIG_PATH : path to TOML config (prompt templates)
//!   EDUBOT_SESSION_TTL_SECS : idle seconds before a quiz session is dropped (default 7200)
//!   EDUBOT_MAX_SESSIONS     : most sessions kept in memory (default 1000)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod store;
mod feedback;
mod achievements;
mod performance;
mod session;
mod gemini;
mod errors;
mod state;
mod protocol;
mod logic;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (sessions, store, Gemini client, prompts).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 5001.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5001)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "edubot_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
