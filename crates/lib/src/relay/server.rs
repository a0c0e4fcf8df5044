//! Relay HTTP server: the service endpoints the client core talks to.

use crate::config::{self, Config};
use crate::relay::broker::MessageBroker;
use crate::wire::{self, WireMessage};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

const PROTOCOL_VERSION: u32 = 1;

/// Shared state for the relay (config + broker).
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<Config>,
    pub broker: Arc<MessageBroker>,
}

/// Run the relay server; binds to config.relay.bind:config.relay.port.
/// Blocks until shutdown (Ctrl+C).
pub async fn run_relay(config: Config) -> Result<()> {
    let bind = config.relay.bind.trim().to_string();
    let port = config.relay.port;
    if !config::is_loopback_bind(&bind) {
        log::warn!("relay binding to non-loopback {} with no authentication", bind);
    }

    let state = RelayState {
        config: Arc::new(config),
        broker: Arc::new(MessageBroker::new()),
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding relay to {}", bind_addr))?;
    log::info!("relay listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server exited")?;
    Ok(())
}

/// Routes for the service surface; split out so tests can serve on a free port.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/service/:channel/addMessage/:user", post(add_message))
        .route("/service/:channel/receiveMessages/:user", get(receive_messages))
        .with_state(state)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("shutdown signal received, draining connections"),
        Err(e) => {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "protocol": PROTOCOL_VERSION,
        "port": state.config.relay.port,
    }))
}

/// POST /service/{channel}/addMessage/{user} — raw text body, fanned out to
/// the channel's parked pollers, answered with a plain "OK".
async fn add_message(
    State(state): State<RelayState>,
    Path((channel, user)): Path<(String, String)>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let text = String::from_utf8_lossy(&body).to_string();
    let reached = state.broker.publish(&channel, &user, &text).await;
    log::debug!(
        "addMessage on {} from {}: reached {} poller(s)",
        channel,
        user,
        reached
    );
    (StatusCode::OK, "OK")
}

/// GET /service/{channel}/receiveMessages/{user} — park until a message lands
/// on the channel or the hold timeout elapses, then answer with the NDJSON
/// batch collected so far. An empty batch is a normal answer.
async fn receive_messages(
    State(state): State<RelayState>,
    Path((channel, user)): Path<(String, String)>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let poller = uuid::Uuid::new_v4();
    let mut rx = state.broker.subscribe(&channel).await;
    let hold = Duration::from_millis(state.config.relay.hold_ms);
    log::debug!("poller {} parked on {} for {}", poller, channel, user);

    let mut batch: Vec<WireMessage> = Vec::new();
    match tokio::time::timeout(hold, rx.recv()).await {
        Ok(Ok(msg)) => batch.push(msg),
        Ok(Err(RecvError::Lagged(n))) => {
            log::debug!("poller {} lagged {} message(s) on {}", poller, n, channel);
        }
        Ok(Err(RecvError::Closed)) => {}
        Err(_) => {
            log::debug!("poller {} hold timeout on {}, answering empty", poller, channel);
        }
    }
    // Messages already buffered behind the first one go out in the same batch.
    loop {
        match rx.try_recv() {
            Ok(msg) => batch.push(msg),
            Err(TryRecvError::Lagged(n)) => {
                log::debug!("poller {} lagged {} message(s) on {}", poller, n, channel);
            }
            Err(_) => break,
        }
    }

    let mut body = String::new();
    for msg in &batch {
        body.push_str(&wire::encode_line(msg));
    }
    log::debug!(
        "poller {} answered with {} message(s) on {}",
        poller,
        batch.len(),
        channel
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
}
