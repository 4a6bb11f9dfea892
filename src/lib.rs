//! FocusMon - window focus activity tracker.
//!
//! Samples the focused window, aggregates consecutive samples into app
//! sessions backed by SQLite, and serves stats, settings, and
//! notifications over a local HTTP/WebSocket API.

pub mod aggregator;
pub mod clock;
pub mod database;
pub mod notify;
pub mod queries;
pub mod server;
pub mod settings;
pub mod tracker;
pub mod types;
