//! Notification dispatch: the sink seam, text formatting, and the
//! per-family scheduler.

pub mod format;
pub mod scheduler;

pub use scheduler::NotificationScheduler;

use tokio::sync::broadcast;

/// Where notifications go once a family decides to fire.
///
/// Dispatch is fire-and-forget: implementations must not block and have
/// no way to report failure back into the scheduler.
pub trait NotificationSink: Send + Sync {
    fn show(&self, title: &str, body: &str);
}

/// Sink that logs each notification and forwards it to WebSocket
/// subscribers as a JSON event, for the GUI shell to render as a toast.
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for BroadcastSink {
    fn show(&self, title: &str, body: &str) {
        tracing::info!(title = %title, body = %body, "Notification");

        let message = serde_json::json!({
            "type": "notification",
            "data": {
                "title": title,
                "body": body,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let Ok(json) = serde_json::to_string(&message) {
            // No subscribers is normal; send errors are ignored.
            let _ = self.tx.send(json);
        }
    }
}
