//! FocusMon - window focus activity tracker.
//!
//! Runs the sampling loop, the notification scheduler, and the local
//! HTTP API as a single process.

use focusmon::aggregator::SessionAggregator;
use focusmon::database::Database;
use focusmon::notify::{BroadcastSink, NotificationScheduler};
use focusmon::server::{self, state::AppState};
use focusmon::settings::Settings;
use focusmon::tracker::{NullSampleSource, PatternClassifier, Tracker, TrackerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("focusmon=info")),
        )
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║            FocusMon - Focus Activity Tracker               ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    println!("🔧 Initializing database...");
    let db = Database::open()?;
    println!("   ✓ Database ready");

    let settings = Settings::new(Arc::new(db.clone()));

    // Broadcast channel feeding every WebSocket client
    let (broadcast_tx, _) = broadcast::channel::<String>(100);

    let scheduler = NotificationScheduler::new(
        db.clone(),
        settings.clone(),
        Arc::new(BroadcastSink::new(broadcast_tx.clone())),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let paused = Arc::new(AtomicBool::new(false));

    println!("🔧 Starting HTTP server...");
    let state = Arc::new(AppState::new(
        db.clone(),
        settings.clone(),
        scheduler.clone(),
        Arc::clone(&paused),
        broadcast_tx.clone(),
    ));
    let _server = server::start_server(state);
    println!(
        "   ✓ HTTP server listening on http://127.0.0.1:{}",
        server::DEFAULT_PORT
    );

    println!("🔧 Starting focus tracking...");
    let tracker = Tracker::new(
        SessionAggregator::new(db.clone()),
        Arc::new(NullSampleSource),
        Arc::new(PatternClassifier::with_default_rules()),
        scheduler.clone(),
        broadcast_tx.clone(),
        TrackerConfig::from_settings(&settings),
    );
    let tracker_handle = tracker.spawn(Arc::clone(&shutdown), Arc::clone(&paused));
    println!("   ✓ Tracker thread started");

    // Handle Ctrl+C
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("🎯 FocusMon is running. Press Ctrl+C to quit.");
    println!();
    println!(
        "🌐 API available at http://127.0.0.1:{}",
        server::DEFAULT_PORT
    );
    println!("   • GET /api/stats    - Today's statistics");
    println!("   • GET /api/sessions - Sessions with activities");
    println!("   • WS  /ws           - Real-time updates");
    println!("════════════════════════════════════════════════════════════════");
    println!();

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(500));
    }

    println!("\n⏳ Shutting down...");
    tracker_handle.join().expect("Tracker thread panicked");

    print_summary(&db);

    println!("\n👋 FocusMon has exited. Goodbye!");
    Ok(())
}

fn print_summary(db: &Database) {
    use focusmon::clock;
    use focusmon::notify::format::format_duration;

    let now = clock::now_ms();
    let start_of_day = clock::start_of_local_day(now);

    let total = db.total_tracked_time(start_of_day, now).unwrap_or(0);
    let apps = db.app_usage(start_of_day, now).unwrap_or_default();

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("📊 Today's Activity Summary");
    println!("════════════════════════════════════════════════════════════════");
    println!("   Focus Time:    {}", format_duration(total));
    println!("   Unique Apps:   {}", apps.len());

    if !apps.is_empty() {
        println!();
        println!("Top Applications:");
        for (i, app) in apps.iter().take(5).enumerate() {
            println!(
                "   {}. {} - {} ({} activities)",
                i + 1,
                app.app_name,
                format_duration(app.total_duration),
                app.activity_count
            );
        }
    }

    println!("════════════════════════════════════════════════════════════════");
}
