//! Request handlers and the router.
//!
//! Read endpoints serve the latest sanitized status snapshot or the config
//! file; they never touch the scan loop process. The two mutating endpoints
//! go through the shared `ConfigStore`, whose atomic rename is the only
//! serialization between this service and the bot.

use std::convert::Infallible;

use axum::{
    extract::State,
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use swing_bot::config::WriteOutcome;
use swing_bot::types::{ExecutionRoute, StatusSnapshot, TradingMode};

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let mutating = Router::new()
        .route("/config", post(apply_config_patch))
        .route("/strategy/activate", post(activate_strategy))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/config", get(get_config))
        .route("/strategies", get(strategies))
        .route("/accounts", get(accounts))
        .route("/positions", get(positions))
        .route("/signals/pending", get(pending_signals))
        .route("/trades/pending", get(pending_trades))
        .route("/logs/stream", get(logs_stream))
        .merge(mutating)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Read endpoints
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let (snapshot, stale) = read_snapshot(&state)?;
    Ok(Json(json!({ "stale": stale, "snapshot": snapshot })))
}

async fn get_config(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let config = state.store.read()?;
    let value = serde_json::to_value(config).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(value))
}

async fn strategies(State(state): State<AppState>) -> Json<Value> {
    // The catalog is static; the active key comes from the config file and
    // may be unknown while that file is corrupt.
    let active = state.store.read().ok().map(|c| c.active_strategy_key);
    Json(json!({
        "active": active,
        "strategies": state.registry.list(),
    }))
}

async fn accounts(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let (snapshot, stale) = read_snapshot(&state)?;
    Ok(Json(json!({ "stale": stale, "accounts": snapshot.accounts })))
}

async fn positions(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let (snapshot, stale) = read_snapshot(&state)?;
    Ok(Json(
        json!({ "stale": stale, "positions": snapshot.open_positions }),
    ))
}

async fn pending_signals(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let (snapshot, stale) = read_snapshot(&state)?;
    Ok(Json(
        json!({ "stale": stale, "signals": snapshot.pending_signals }),
    ))
}

async fn pending_trades(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let (snapshot, stale) = read_snapshot(&state)?;
    let reason = execution_disabled_reason(&snapshot);
    Ok(Json(json!({
        "stale": stale,
        "trades": snapshot.pending_trades,
        "reason": reason,
    })))
}

// ---------------------------------------------------------------------------
// Mutating endpoints
// ---------------------------------------------------------------------------

async fn apply_config_patch(
    State(state): State<AppState>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Value>> {
    let (config, outcome) = state.store.apply_patch(&patch)?;
    info!(outcome = outcome_str(outcome), "config patch applied");
    Ok(Json(json!({
        "outcome": outcome_str(outcome),
        "config": config,
    })))
}

#[derive(Debug, Deserialize)]
struct ActivateRequest {
    key: String,
}

async fn activate_strategy(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>,
) -> ApiResult<Json<Value>> {
    // Unknown keys are a 404 on the catalog, not a validation failure.
    let descriptor = state.registry.get(&request.key)?.clone();

    let patch = json!({ "active_strategy_key": request.key });
    let (config, outcome) = state.store.apply_patch(&patch)?;
    info!(strategy = %config.active_strategy_key, "strategy activated");

    Ok(Json(json!({
        "outcome": outcome_str(outcome),
        "active": config.active_strategy_key,
        "strategy": descriptor,
    })))
}

// ---------------------------------------------------------------------------
// Log stream
// ---------------------------------------------------------------------------

/// Server-sent events feed of redacted log lines.
///
/// Lag means this subscriber lost the oldest lines; the stream skips the
/// marker and keeps going rather than ending the feed.
async fn logs_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_sender.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(line) => Some(Ok(Event::default().data(line))),
        Err(err) => {
            warn!("log stream subscriber lagged: {err}");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_snapshot(state: &AppState) -> ApiResult<(StatusSnapshot, bool)> {
    Ok(state.reader.read_with_staleness(state.stale_grace_seconds)?)
}

fn outcome_str(outcome: WriteOutcome) -> &'static str {
    match outcome {
        WriteOutcome::Written => "written",
        WriteOutcome::Unchanged => "unchanged",
    }
}

/// Why the trade list is empty when the gate kept signals out, so an empty
/// array is explained rather than guessed at.
fn execution_disabled_reason(snapshot: &StatusSnapshot) -> Option<&'static str> {
    if snapshot.execution_route != ExecutionRoute::SignalsOnly {
        return None;
    }
    Some(match snapshot.mode {
        TradingMode::Live => "live execution gate is closed",
        TradingMode::Paper => "paper execution is disabled",
    })
}
