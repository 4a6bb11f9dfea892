//! Focus sampling loop.
//!
//! This module polls the foreground window on a fixed cadence, classifies
//! each sample, and feeds the session aggregator. Idle and pause
//! transitions close the open session and rest the break reminder.

pub mod classifier;

pub use classifier::*;

use crate::aggregator::SessionAggregator;
use crate::notify::NotificationScheduler;
use crate::settings::Settings;
use crate::types::Sample;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::broadcast;

/// Produces foreground-window samples for the tracker loop.
pub trait WindowSampleSource: Send + Sync {
    /// Returns the currently focused window, or `None` when there is
    /// nothing to attribute (lock screen, desktop, no permission).
    fn poll(&self) -> Option<Sample>;

    /// Seconds since the last user input.
    fn idle_seconds(&self) -> u64;
}

/// Source for platforms without a window backend. Never reports focus.
pub struct NullSampleSource;

impl WindowSampleSource for NullSampleSource {
    fn poll(&self) -> Option<Sample> {
        None
    }

    fn idle_seconds(&self) -> u64 {
        0
    }
}

/// Configuration for the tracker loop.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How often to poll for the focused window.
    pub poll_interval: Duration,

    /// User inactivity span after which the open session is closed.
    pub idle_threshold: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            idle_threshold: Duration::from_secs(300),
        }
    }
}

impl TrackerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: Duration::from_secs(settings.poll_interval_secs()),
            idle_threshold: Duration::from_secs(settings.idle_threshold_secs()),
        }
    }
}

/// The sampling loop. Owns the aggregator; everything it records flows
/// through one place.
pub struct Tracker {
    aggregator: SessionAggregator,
    source: Arc<dyn WindowSampleSource>,
    classifier: Arc<dyn Classifier>,
    scheduler: NotificationScheduler,
    broadcast_tx: broadcast::Sender<String>,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(
        aggregator: SessionAggregator,
        source: Arc<dyn WindowSampleSource>,
        classifier: Arc<dyn Classifier>,
        scheduler: NotificationScheduler,
        broadcast_tx: broadcast::Sender<String>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            aggregator,
            source,
            classifier,
            scheduler,
            broadcast_tx,
            config,
        }
    }

    /// Spawns the tracking thread.
    ///
    /// The thread polls until `shutdown` is set, skipping work while
    /// `paused` is set. The first sample after a rest (start, idle,
    /// pause, or lost focus) only establishes the timing boundary;
    /// recording begins with the second consecutive sample.
    pub fn spawn(mut self, shutdown: Arc<AtomicBool>, paused: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::spawn(move || {
            tracing::info!(
                interval_ms = self.config.poll_interval.as_millis(),
                idle_threshold_secs = self.config.idle_threshold.as_secs(),
                "Tracker thread started"
            );

            // Timestamp of the previous sample; the next recorded
            // activity spans from here to the current sample.
            let mut last_tick: Option<i64> = None;
            let mut resting = true;

            loop {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }

                if paused.load(Ordering::SeqCst) {
                    if !resting {
                        self.aggregator.close_current_session();
                        self.scheduler.on_paused();
                        resting = true;
                    }
                    last_tick = None;
                    thread::sleep(self.config.poll_interval);
                    continue;
                }

                if self.source.idle_seconds() >= self.config.idle_threshold.as_secs() {
                    if !resting {
                        tracing::debug!("User went idle, closing session");
                        self.aggregator.close_current_session();
                        self.scheduler.on_idle();
                        resting = true;
                    }
                    last_tick = None;
                    thread::sleep(self.config.poll_interval);
                    continue;
                }

                match self.source.poll() {
                    Some(sample) => {
                        if resting {
                            self.scheduler.on_activity_started();
                            resting = false;
                        }
                        if let Some(prev) = last_tick {
                            self.record(&sample, prev);
                        }
                        last_tick = Some(sample.timestamp);
                    }
                    None => {
                        // Nothing focused; drop the boundary but leave
                        // the session open until idle or pause.
                        last_tick = None;
                    }
                }

                thread::sleep(self.config.poll_interval);
            }

            self.aggregator.close_current_session();
            tracing::info!("Tracker thread stopped");
        })
    }

    fn record(&mut self, sample: &Sample, start_time: i64) {
        let class = self.classifier.classify(sample);
        match self
            .aggregator
            .on_sample(sample, &class, start_time, sample.timestamp)
        {
            Ok(activity_id) => {
                let message = serde_json::json!({
                    "type": "activity",
                    "data": {
                        "activity_id": activity_id,
                        "session_id": self.aggregator.current_session_id(),
                        "app_name": sample.app_name,
                        "category": class.category,
                        "duration": (sample.timestamp - start_time).max(0),
                    },
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                });
                if let Ok(json) = serde_json::to_string(&message) {
                    let _ = self.broadcast_tx.send(json);
                }

                self.scheduler.check_goals();
            }
            Err(e) => {
                tracing::error!(error = %e, app = %sample.app_name, "Failed to record activity");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::notify::BroadcastSink;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    struct ScriptedSource {
        samples: Mutex<VecDeque<Sample>>,
        idle_secs: AtomicU64,
    }

    impl ScriptedSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                samples: Mutex::new(VecDeque::new()),
                idle_secs: AtomicU64::new(0),
            })
        }

        fn push(&self, app: &str, timestamp: i64) {
            self.samples
                .lock()
                .unwrap()
                .push_back(Sample::new(app, "window", timestamp));
        }

        fn set_idle(&self, secs: u64) {
            self.idle_secs.store(secs, Ordering::SeqCst);
        }

        /// Waits until every queued sample was consumed and processed.
        fn drain(&self) {
            for _ in 0..500 {
                if self.samples.lock().unwrap().is_empty() {
                    thread::sleep(Duration::from_millis(20));
                    return;
                }
                thread::sleep(Duration::from_millis(2));
            }
            panic!("tracker did not consume the scripted samples");
        }
    }

    impl WindowSampleSource for ScriptedSource {
        fn poll(&self) -> Option<Sample> {
            self.samples.lock().unwrap().pop_front()
        }

        fn idle_seconds(&self) -> u64 {
            self.idle_secs.load(Ordering::SeqCst)
        }
    }

    struct Running {
        db: Database,
        source: Arc<ScriptedSource>,
        shutdown: Arc<AtomicBool>,
        paused: Arc<AtomicBool>,
        handle: JoinHandle<()>,
    }

    fn start_tracker() -> Running {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::new(Arc::new(db.clone()));
        let (tx, _rx) = broadcast::channel(64);
        let scheduler =
            NotificationScheduler::new(db.clone(), settings, Arc::new(BroadcastSink::new(tx.clone())));

        let source = ScriptedSource::new();
        let tracker = Tracker::new(
            SessionAggregator::new(db.clone()),
            source.clone(),
            Arc::new(PatternClassifier::with_default_rules()),
            scheduler,
            tx,
            TrackerConfig {
                poll_interval: Duration::from_millis(2),
                idle_threshold: Duration::from_secs(300),
            },
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let handle = tracker.spawn(shutdown.clone(), paused.clone());

        Running {
            db,
            source,
            shutdown,
            paused,
            handle,
        }
    }

    fn stop(running: Running) -> Database {
        running.shutdown.store(true, Ordering::SeqCst);
        running.handle.join().unwrap();
        running.db
    }

    #[test]
    fn test_consecutive_samples_build_one_session() {
        let running = start_tracker();
        running.source.push("Code", 1_000);
        running.source.push("Code", 6_000);
        running.source.push("Code", 11_000);
        running.source.drain();
        let db = stop(running);

        let sessions = db.sessions_with_activities(0, 100_000).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session.activity_count, 2);
        assert_eq!(sessions[0].session.total_duration, 10_000);
        assert_eq!(sessions[0].session.start_time, 1_000);
        assert_eq!(sessions[0].session.end_time, 11_000);
    }

    #[test]
    fn test_app_switch_starts_new_session() {
        let running = start_tracker();
        running.source.push("Code", 1_000);
        running.source.push("Code", 6_000);
        running.source.push("Chrome", 11_000);
        running.source.push("Chrome", 16_000);
        running.source.drain();
        let db = stop(running);

        // Newest first.
        let sessions = db.sessions_with_activities(0, 100_000).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session.app_name, "Chrome");
        assert_eq!(sessions[0].session.activity_count, 2);
        assert_eq!(sessions[1].session.app_name, "Code");
        assert_eq!(sessions[1].session.activity_count, 1);
        assert_eq!(sessions[1].session.total_duration, 5_000);
    }

    #[test]
    fn test_idle_closes_session_and_resets_boundary() {
        let running = start_tracker();
        running.source.push("Code", 1_000);
        running.source.push("Code", 6_000);
        running.source.drain();

        running.source.set_idle(600);
        thread::sleep(Duration::from_millis(20));
        running.source.set_idle(0);

        // After the rest, the first sample only re-establishes the
        // boundary; no activity bridges the gap.
        running.source.push("Code", 600_000);
        running.source.push("Code", 605_000);
        running.source.drain();
        let db = stop(running);

        let sessions = db.sessions_with_activities(0, 1_000_000).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].session.end_time, 6_000);
        assert_eq!(sessions[0].session.start_time, 600_000);
        assert_eq!(sessions[0].session.total_duration, 5_000);
    }

    #[test]
    fn test_pause_closes_session() {
        let running = start_tracker();
        running.source.push("Code", 1_000);
        running.source.push("Code", 6_000);
        running.source.drain();

        running.paused.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));

        // Samples queued while paused stay queued.
        running.source.push("Code", 700_000);
        running.source.push("Code", 705_000);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(running.source.samples.lock().unwrap().len(), 2);

        running.paused.store(false, Ordering::SeqCst);
        running.source.drain();
        let db = stop(running);

        let sessions = db.sessions_with_activities(0, 1_000_000).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].session.end_time, 6_000);
        assert_eq!(sessions[0].session.start_time, 700_000);
    }

    #[test]
    fn test_lost_focus_drops_boundary_but_keeps_session() {
        let running = start_tracker();
        running.source.push("Code", 1_000);
        running.source.push("Code", 6_000);
        running.source.drain();

        // poll() returning None for a while (empty queue) resets the
        // boundary without closing the session.
        thread::sleep(Duration::from_millis(20));

        running.source.push("Code", 20_000);
        running.source.push("Code", 25_000);
        running.source.drain();
        let db = stop(running);

        let sessions = db.sessions_with_activities(0, 100_000).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session.activity_count, 2);
        assert_eq!(sessions[0].session.total_duration, 10_000);
        assert_eq!(sessions[0].session.end_time, 25_000);
    }
}
