//! Counter Tutor · CTU/CTD instruction quiz backend
//!
//! - Axum HTTP + WebSocket API
//! - Adaptive quiz: template-driven questions, per-attribute grading, hysteresis levels
//! - Conversational turns (intent + stage) rendered as SSML speech and cards
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   TUTOR_CONFIG_PATH : path to TOML config (prompts, quiz options, optional content tables)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod store;
mod difficulty;
mod generator;
mod tracker;
mod tutoring;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Content repositories, user store, prompts and quiz options.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "counter_tutor", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "counter_tutor", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "counter_tutor", error = %e, "Failed to listen for shutdown signal");
  }
  info!(target: "counter_tutor", "Shutdown signal received");
}
