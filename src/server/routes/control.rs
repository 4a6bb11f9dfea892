//! Tracking control and notification trigger endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::server::state::AppState;

#[derive(Serialize)]
pub struct TrackingState {
    pub paused: bool,
}

#[derive(Debug, Deserialize)]
pub struct PomodoroComplete {
    /// Interval kind: "work", "short_break", "long_break", ...
    pub kind: String,
    /// Interval length in milliseconds.
    pub duration_ms: i64,
    /// Optional task label shown in the notification.
    pub label: Option<String>,
}

/// POST /api/tracking/pause - Stop recording until resumed.
pub async fn pause_tracking(State(state): State<Arc<AppState>>) -> Json<TrackingState> {
    state.paused.store(true, Ordering::SeqCst);
    tracing::info!("Tracking paused");
    broadcast_tracking_state(&state, true);
    Json(TrackingState { paused: true })
}

/// POST /api/tracking/resume - Resume recording.
pub async fn resume_tracking(State(state): State<Arc<AppState>>) -> Json<TrackingState> {
    state.paused.store(false, Ordering::SeqCst);
    tracing::info!("Tracking resumed");
    broadcast_tracking_state(&state, false);
    Json(TrackingState { paused: false })
}

/// GET /api/tracking - Current tracking state.
pub async fn tracking_state(State(state): State<Arc<AppState>>) -> Json<TrackingState> {
    Json(TrackingState {
        paused: state.paused.load(Ordering::SeqCst),
    })
}

/// POST /api/pomodoro/complete - An external pomodoro timer finished.
pub async fn pomodoro_complete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PomodoroComplete>,
) -> StatusCode {
    state
        .scheduler
        .on_pomodoro_complete(&body.kind, body.duration_ms, body.label.as_deref());
    StatusCode::NO_CONTENT
}

/// POST /api/goals/check - Run a goal check outside the sampling loop.
pub async fn check_goals(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scheduler.check_goals();
    StatusCode::NO_CONTENT
}

fn broadcast_tracking_state(state: &Arc<AppState>, paused: bool) {
    let message = serde_json::json!({
        "type": "tracking",
        "data": { "paused": paused },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Ok(json) = serde_json::to_string(&message) {
        let _ = state.broadcast_tx.send(json);
    }
}
