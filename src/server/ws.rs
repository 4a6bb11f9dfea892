//! WebSocket handler for real-time updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::clock;
use crate::server::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Send a snapshot of today's tracking on connection
    if let Some(initial_state) = current_state(&state) {
        let _ = sender.send(Message::Text(initial_state)).await;
    }

    // Subscribe to broadcast channel
    let mut rx = state.subscribe();

    // Forward broadcast events to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages (for future use, e.g., commands)
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Ping(data) => {
                    // Pong is handled automatically by axum
                    let _ = data;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    tracing::debug!("WebSocket connection closed");
}

/// Builds the initial state message for a new WebSocket client.
fn current_state(state: &Arc<AppState>) -> Option<String> {
    let now = clock::now_ms();
    let start_of_day = clock::start_of_local_day(now);

    let total = state.db.total_tracked_time(start_of_day, now).ok()?;
    let apps = state.db.app_usage(start_of_day, now).ok()?;
    let breakdown = state.db.category_breakdown(start_of_day, now).ok()?;

    let message = serde_json::json!({
        "type": "initial_state",
        "data": {
            "paused": state.paused.load(Ordering::SeqCst),
            "stats": {
                "total_duration_ms": total,
                "unique_apps": apps.len(),
                "top_category": breakdown.iter().find_map(|c| c.category.clone()),
            }
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    serde_json::to_string(&message).ok()
}
