//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 unless the folder watcher runs and we are not draining)
//! - `/metrics` : Prometheus text format

use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::app_state::AppState;
use crate::watch::WatcherState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    if state.is_ready() {
        return (StatusCode::OK, "ready");
    }
    let reason = if state.is_draining() {
        "draining"
    } else {
        match state.watcher_state() {
            WatcherState::Idle => "watcher not started",
            WatcherState::Running | WatcherState::Stopped => "watcher stopped",
        }
    };
    (StatusCode::SERVICE_UNAVAILABLE, reason)
}

pub async fn metrics(axum::extract::State(state): axum::extract::State<AppState>) -> Response {
    let body = state.render_metrics();

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
