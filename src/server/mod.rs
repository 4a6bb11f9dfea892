//! HTTP server module for API and WebSocket endpoints.
//!
//! Provides a REST API and WebSocket for real-time updates to frontends.

pub mod routes;
pub mod state;
pub mod ws;

use crate::server::routes::{activities, control, health, settings, stats};
use crate::server::state::AppState;
use crate::server::ws::ws_handler;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Default server port.
pub const DEFAULT_PORT: u16 = 13239;

/// Starts the HTTP server on a background thread.
///
/// The thread owns the long-lived tokio runtime; the notification
/// scheduler's timers are started on it before serving.
pub fn start_server(state: Arc<AppState>) -> std::thread::JoinHandle<()> {
    tracing::info!(port = DEFAULT_PORT, "HTTP server starting");

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
        rt.block_on(async {
            run_server(state).await;
        });
    })
}

/// Runs the axum server.
async fn run_server(state: Arc<AppState>) {
    state.scheduler.start();

    // CORS layer for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Stats API
        .route("/api/stats", get(stats::get_stats))
        .route("/api/stats/apps", get(stats::get_app_stats))
        .route("/api/stats/categories", get(stats::get_category_stats))
        .route("/api/stats/projects", get(stats::get_project_stats))
        .route("/api/stats/domains", get(stats::get_domain_stats))
        .route("/api/stats/hourly", get(stats::get_hourly_stats))
        .route("/api/stats/daily", get(stats::get_daily_stats))
        // Data API
        .route("/api/activities", get(activities::get_activities))
        .route("/api/sessions", get(activities::get_sessions))
        // Settings API
        .route("/api/settings", get(settings::get_settings))
        .route("/api/settings/:key", put(settings::update_setting))
        // Tracking control
        .route("/api/tracking", get(control::tracking_state))
        .route("/api/tracking/pause", post(control::pause_tracking))
        .route("/api/tracking/resume", post(control::resume_tracking))
        // Notification triggers
        .route("/api/pomodoro/complete", post(control::pomodoro_complete))
        .route("/api/goals/check", post(control::check_goals))
        // WebSocket
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));
    tracing::info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
