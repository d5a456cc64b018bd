//! Daemon status endpoints

use axum::{Json, extract::State, http::StatusCode};

use crate::api::AppState;
use crate::api::error::{ApiError, Envelope, Result};
use crate::daemon::DaemonStatus;

pub const RUNNING: &str = "docker is running";
pub const NOT_RUNNING: &str = "docker not running";
pub const STARTING: &str = "docker is starting, retry shortly";

/// Probe the daemon. 200 when up, 503 when down.
pub async fn check(State(state): State<AppState>) -> Result<Json<Envelope<&'static str>>> {
    match state.monitor.check().await {
        DaemonStatus::Up => Ok(Json(Envelope::new(RUNNING))),
        DaemonStatus::Down => Err(ApiError::ServiceUnavailable(NOT_RUNNING.to_string())),
    }
}

/// Start the daemon if it is down. 200 when up, 202 once a bootstrap is launched.
pub async fn start(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<&'static str>>)> {
    let response = match state.monitor.ensure_running().await? {
        DaemonStatus::Up => (StatusCode::OK, Json(Envelope::new(RUNNING))),
        DaemonStatus::Down => (StatusCode::ACCEPTED, Json(Envelope::new(STARTING))),
    };
    Ok(response)
}
