//! Shared application state for the HTTP server.

use crate::database::Database;
use crate::notify::NotificationScheduler;
use crate::settings::Settings;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Activity database handle.
    pub db: Database,

    /// Typed view over the settings table.
    pub settings: Settings,

    /// Scheduler for the externally driven notification families.
    pub scheduler: NotificationScheduler,

    /// Pause flag shared with the tracker thread.
    pub paused: Arc<AtomicBool>,

    /// Broadcast channel for WebSocket updates.
    pub broadcast_tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(
        db: Database,
        settings: Settings,
        scheduler: NotificationScheduler,
        paused: Arc<AtomicBool>,
        broadcast_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            db,
            settings,
            scheduler,
            paused,
            broadcast_tx,
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }
}
