//! Per-family notification state machines.
//!
//! Each timed family (break reminder, daily summary) holds at most one
//! live tokio task; arming a family aborts its previous task. The goal
//! check and pomodoro families have no timer and run when invoked.
//! Every family re-checks the master `notifications_enabled` flag
//! itself; nothing is gated around it.

use crate::clock;
use crate::database::Database;
use crate::notify::format;
use crate::notify::NotificationSink;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Minimum gap between two break notifications actually shown.
const BREAK_SUPPRESSION: Duration = Duration::from_secs(5 * 60);

/// Minimum tracked time today before a daily summary is worth showing.
const SUMMARY_MINIMUM_MS: i64 = 60_000;

/// Schedules and dispatches all notification families.
///
/// Cheap to clone; clones share the same timer slots and state.
#[derive(Clone)]
pub struct NotificationScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    db: Database,
    settings: Settings,
    sink: Arc<dyn NotificationSink>,

    /// Runtime the timer tasks run on, captured by [`NotificationScheduler::start`].
    handle: Mutex<Option<Handle>>,

    /// Live single-shot break task, if armed.
    break_task: Mutex<Option<JoinHandle<()>>>,

    /// Live daily summary alarm loop.
    summary_task: Mutex<Option<JoinHandle<()>>>,

    /// When the last break notification was actually shown.
    last_break_shown: Mutex<Option<Instant>>,

    /// Local date a summary was already shown for. In-memory only, so a
    /// restart within the same day may show a second summary.
    summary_shown_for: Mutex<Option<String>>,
}

impl NotificationScheduler {
    pub fn new(db: Database, settings: Settings, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                settings,
                sink,
                handle: Mutex::new(None),
                break_task: Mutex::new(None),
                summary_task: Mutex::new(None),
                last_break_shown: Mutex::new(None),
                summary_shown_for: Mutex::new(None),
            }),
        }
    }

    /// Captures the current tokio runtime for the timer tasks and arms
    /// the daily summary alarm. Must be called from within a runtime;
    /// hooks invoked before `start` only log and do nothing.
    pub fn start(&self) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("Scheduler started outside a tokio runtime, timers disabled");
            return;
        };
        *self.inner.handle.lock().unwrap() = Some(handle);

        self.arm_daily_summary();
        tracing::info!("Notification scheduler started");
    }

    /// The user started (or resumed) working: arm a fresh break
    /// reminder, cancelling any pending one.
    pub fn on_activity_started(&self) {
        if !self.inner.settings.notifications_enabled()
            || !self.inner.settings.break_reminders_enabled()
        {
            return;
        }
        let Some(handle) = self.inner.runtime() else {
            tracing::warn!("Break reminder requested before scheduler start");
            return;
        };

        let minutes = self.inner.settings.break_interval_minutes();
        let inner = Arc::clone(&self.inner);

        let mut task_guard = self.inner.break_task.lock().unwrap();
        if let Some(task) = task_guard.take() {
            task.abort();
        }
        let task = handle.spawn(async move {
            tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
            inner.fire_break(minutes);
        });
        *task_guard = Some(task);

        tracing::debug!(minutes = minutes, "Break reminder armed");
    }

    /// The user went idle: no reminder fires while resting.
    pub fn on_idle(&self) {
        self.inner.cancel_break("idle");
    }

    /// Tracking was paused: no reminder fires while paused.
    pub fn on_paused(&self) {
        self.inner.cancel_break("paused");
    }

    /// Compares today's tracked time per category against the goal list
    /// and notifies each newly satisfied goal once per local day.
    pub fn check_goals(&self) {
        self.inner.check_goals();
    }

    /// An external pomodoro timer completed an interval.
    pub fn on_pomodoro_complete(&self, kind: &str, duration_ms: i64, label: Option<&str>) {
        self.inner.fire_pomodoro(kind, duration_ms, label);
    }

    /// (Re)arms the daily summary alarm loop. The loop sleeps until the
    /// next occurrence of the configured local hour, fires, and rearms
    /// for the next day regardless of whether anything was shown.
    fn arm_daily_summary(&self) {
        let Some(handle) = self.inner.runtime() else {
            return;
        };
        let inner = Arc::clone(&self.inner);

        let mut task_guard = self.inner.summary_task.lock().unwrap();
        if let Some(task) = task_guard.take() {
            task.abort();
        }
        let task = handle.spawn(async move {
            loop {
                let hour = inner.settings.daily_summary_hour();
                let delay = clock::delay_until_local_hour(hour);
                tracing::debug!(
                    hour = hour,
                    delay_secs = delay.as_secs(),
                    "Daily summary armed"
                );
                tokio::time::sleep(delay).await;
                inner.fire_daily_summary();
            }
        });
        *task_guard = Some(task);
    }
}

impl Inner {
    fn runtime(&self) -> Option<Handle> {
        self.handle.lock().unwrap().clone()
    }

    fn cancel_break(&self, reason: &str) {
        let mut task_guard = self.break_task.lock().unwrap();
        if let Some(task) = task_guard.take() {
            task.abort();
            tracing::debug!(reason = reason, "Break reminder cancelled");
        }
    }

    /// Break timer fired. The task never reschedules itself; only the
    /// next activity start arms a new one.
    fn fire_break(&self, minutes: u64) {
        if !self.settings.notifications_enabled() || !self.settings.break_reminders_enabled() {
            return;
        }

        let now = Instant::now();
        let mut last_shown = self.last_break_shown.lock().unwrap();
        if let Some(shown_at) = *last_shown {
            if now.duration_since(shown_at) < BREAK_SUPPRESSION {
                tracing::debug!("Break reminder suppressed, one was shown recently");
                return;
            }
        }
        *last_shown = Some(now);
        drop(last_shown);

        self.sink.show(
            "Time for a break!",
            &format!("You've been working for {} minutes.", minutes),
        );
    }

    /// Daily summary alarm fired for today.
    fn fire_daily_summary(&self) {
        let now = clock::now_ms();
        let today = clock::local_date_string(now);

        if !self.settings.notifications_enabled() || !self.settings.daily_summary_enabled() {
            tracing::debug!("Daily summary disabled, skipping");
            return;
        }
        if self.summary_shown_for.lock().unwrap().as_deref() == Some(today.as_str()) {
            tracing::debug!("Daily summary already shown today");
            return;
        }

        let start_of_day = clock::start_of_local_day(now);
        let total = match self.db.total_tracked_time(start_of_day, now) {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(error = %e, "Daily summary query failed");
                return;
            }
        };
        if total < SUMMARY_MINIMUM_MS {
            // Not marked as shown; a later firing today may still show.
            tracing::debug!(total_ms = total, "Too little tracked time for a summary");
            return;
        }

        *self.summary_shown_for.lock().unwrap() = Some(today);

        let breakdown = match self.db.category_breakdown(start_of_day, now) {
            Ok(breakdown) => breakdown,
            Err(e) => {
                tracing::warn!(error = %e, "Daily summary query failed");
                return;
            }
        };

        let goals = self.settings.daily_goals();
        let productive: i64 = breakdown
            .iter()
            .filter(|c| {
                c.category
                    .as_deref()
                    .is_some_and(|name| goals.iter().any(|g| g.category_name == name))
            })
            .map(|c| c.total_duration)
            .sum();
        let focus_percent = if total > 0 {
            (productive as f64 / total as f64 * 100.0).round() as i64
        } else {
            0
        };

        let mut body = format!("You tracked {} today.", format::format_duration(total));
        if let Some(top) = breakdown.iter().find_map(|c| c.category.as_deref()) {
            body.push_str(&format!(" Top category: {}.", format::display_name(top)));
        }
        if productive > 0 {
            body.push_str(&format!(" {}% focused.", focus_percent));
        }

        self.sink.show("Daily summary", &body);
    }

    fn check_goals(&self) {
        if !self.settings.notifications_enabled() {
            return;
        }
        let goals = self.settings.daily_goals();
        if goals.is_empty() {
            return;
        }

        let now = clock::now_ms();
        let today = clock::local_date_string(now);
        let breakdown = match self
            .db
            .category_breakdown(clock::start_of_local_day(now), now)
        {
            Ok(breakdown) => breakdown,
            Err(e) => {
                tracing::warn!(error = %e, "Goal check query failed");
                return;
            }
        };

        let mut ledger = self.settings.goal_ledger(&today);
        for goal in &goals {
            if ledger.contains(&goal.category_name) {
                continue;
            }

            let tracked = breakdown
                .iter()
                .find(|c| c.category.as_deref() == Some(goal.category_name.as_str()))
                .map(|c| c.total_duration)
                .unwrap_or(0);
            if tracked < goal.target_ms {
                continue;
            }

            ledger.mark(&goal.category_name);
            if let Err(e) = self.settings.store_goal_ledger(&ledger) {
                tracing::warn!(error = %e, "Failed to persist goal ledger");
            }

            tracing::info!(category = %goal.category_name, tracked_ms = tracked, "Goal reached");
            self.sink.show(
                "Goal reached!",
                &format!(
                    "You hit your {} goal of {}.",
                    goal.category_name,
                    format::goal_hours(goal.target_ms)
                ),
            );
        }
    }

    fn fire_pomodoro(&self, kind: &str, duration_ms: i64, label: Option<&str>) {
        if !self.settings.notifications_enabled()
            || !self.settings.pomodoro_notifications_enabled()
        {
            return;
        }

        let minutes = format::minutes_rounded(duration_ms);
        let (title, body) = if kind == "work" {
            let body = match label {
                Some(label) if !label.is_empty() => {
                    format!("\"{}\" finished — {} min of focused work.", label, minutes)
                }
                _ => format!("{} min of focused work complete.", minutes),
            };
            ("Pomodoro complete!", body)
        } else {
            (
                "Break's over!",
                format!(
                    "Your {} min {} is done. Ready to focus?",
                    minutes,
                    format::display_name(kind)
                ),
            )
        };

        self.sink.show(title, &body);
    }
}
