//! Typed settings facade over the persistent key-value store.
//!
//! All settings are stored as strings. Reads never fail: a missing or
//! unparsable value falls back to its default, so a fresh database
//! behaves the same as a seeded one.

use crate::database::Database;
use rusqlite::Result as SqlResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// String-keyed persistent storage consumed by the settings facade.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> SqlResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SqlResult<()>;
}

impl KvStore for Database {
    fn get(&self, key: &str) -> SqlResult<Option<String>> {
        self.get_setting(key)
    }

    fn set(&self, key: &str, value: &str) -> SqlResult<()> {
        self.set_setting(key, value)
    }
}

/// A user-declared daily target for one category.
///
/// Stored as a JSON array under the `daily_goals` key, with the field
/// names the frontend writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Category the goal applies to.
    pub category_name: String,

    /// Target tracked time for the category, in milliseconds per day.
    pub target_ms: i64,
}

/// Per-day record of goal categories that already triggered a
/// notification, stored as JSON under `goals_notified_today`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalLedger {
    /// Local date (`YYYY-MM-DD`) the entries belong to.
    pub date: String,

    /// Categories notified on `date`.
    pub goals: Vec<String>,
}

impl GoalLedger {
    /// Empty ledger for the given local date.
    pub fn for_date(date: &str) -> Self {
        Self {
            date: date.to_string(),
            goals: Vec::new(),
        }
    }

    /// Whether `category` was already notified on this ledger's date.
    pub fn contains(&self, category: &str) -> bool {
        self.goals.iter().any(|g| g == category)
    }

    /// Records `category` as notified.
    pub fn mark(&mut self, category: &str) {
        if !self.contains(category) {
            self.goals.push(category.to_string());
        }
    }
}

/// Typed accessors over the settings keys.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn KvStore>,
}

impl Settings {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Boolean flag. Anything but an explicit "false" counts as enabled.
    fn flag(&self, key: &str) -> bool {
        match self.store.get(key) {
            Ok(Some(value)) => value != "false",
            _ => true,
        }
    }

    fn numeric(&self, key: &str, default: u64) -> u64 {
        match self.store.get(key) {
            Ok(Some(value)) => value.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Master switch for all notification families.
    pub fn notifications_enabled(&self) -> bool {
        self.flag("notifications_enabled")
    }

    pub fn break_reminders_enabled(&self) -> bool {
        self.flag("break_reminders_enabled")
    }

    pub fn daily_summary_enabled(&self) -> bool {
        self.flag("daily_summary_enabled")
    }

    pub fn pomodoro_notifications_enabled(&self) -> bool {
        self.flag("pomodoro_notifications_enabled")
    }

    /// Minutes of activity before a break reminder fires. At least 1;
    /// anything else reads as the default of 60.
    pub fn break_interval_minutes(&self) -> u64 {
        match self.store.get("break_interval_minutes") {
            Ok(Some(value)) => match value.trim().parse::<u64>() {
                Ok(minutes) if minutes >= 1 => minutes,
                _ => 60,
            },
            _ => 60,
        }
    }

    /// Local hour for the daily summary. In-range values are used as-is,
    /// out-of-range values clamp to 0-23, unparsable values read as 18.
    pub fn daily_summary_hour(&self) -> u32 {
        match self.store.get("daily_summary_hour") {
            Ok(Some(value)) => match value.trim().parse::<i64>() {
                Ok(hour) => hour.clamp(0, 23) as u32,
                Err(_) => 18,
            },
            _ => 18,
        }
    }

    /// Window sampling cadence in seconds.
    pub fn poll_interval_secs(&self) -> u64 {
        self.numeric("poll_interval_secs", 5).max(1)
    }

    /// Seconds without user input before tracking counts as idle.
    pub fn idle_threshold_secs(&self) -> u64 {
        self.numeric("idle_threshold_secs", 300).max(1)
    }

    /// The daily goal list. Missing or malformed JSON reads as empty.
    pub fn daily_goals(&self) -> Vec<Goal> {
        let Ok(Some(raw)) = self.store.get("daily_goals") else {
            return Vec::new();
        };

        match serde_json::from_str(&raw) {
            Ok(goals) => goals,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed daily_goals");
                Vec::new()
            }
        }
    }

    /// Ledger of goal categories already notified today.
    ///
    /// A stored ledger from a different date, or malformed JSON, reads
    /// as an empty ledger for `today`.
    pub fn goal_ledger(&self, today: &str) -> GoalLedger {
        let Ok(Some(raw)) = self.store.get("goals_notified_today") else {
            return GoalLedger::for_date(today);
        };

        match serde_json::from_str::<GoalLedger>(&raw) {
            Ok(ledger) if ledger.date == today => ledger,
            Ok(_) => GoalLedger::for_date(today),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed goals_notified_today");
                GoalLedger::for_date(today)
            }
        }
    }

    /// Persists the goal ledger.
    pub fn store_goal_ledger(&self, ledger: &GoalLedger) -> SqlResult<()> {
        let json = serde_json::to_string(ledger).unwrap_or_default();
        self.store.set("goals_notified_today", &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryKv {
        map: Mutex<HashMap<String, String>>,
    }

    impl KvStore for MemoryKv {
        fn get(&self, key: &str) -> SqlResult<Option<String>> {
            Ok(self.map.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> SqlResult<()> {
            self.map
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn settings_with(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::new(Arc::new(MemoryKv {
            map: Mutex::new(map),
        }))
    }

    #[test]
    fn test_flags_default_true() {
        let settings = settings_with(&[]);

        assert!(settings.notifications_enabled());
        assert!(settings.break_reminders_enabled());
        assert!(settings.daily_summary_enabled());
        assert!(settings.pomodoro_notifications_enabled());
    }

    #[test]
    fn test_only_explicit_false_disables() {
        let settings = settings_with(&[
            ("notifications_enabled", "false"),
            ("break_reminders_enabled", "no"),
        ]);

        assert!(!settings.notifications_enabled());
        // "no" is not "false"
        assert!(settings.break_reminders_enabled());
    }

    #[test]
    fn test_break_interval_rejects_zero_and_garbage() {
        assert_eq!(settings_with(&[]).break_interval_minutes(), 60);
        assert_eq!(
            settings_with(&[("break_interval_minutes", "0")]).break_interval_minutes(),
            60
        );
        assert_eq!(
            settings_with(&[("break_interval_minutes", "soon")]).break_interval_minutes(),
            60
        );
        assert_eq!(
            settings_with(&[("break_interval_minutes", "45")]).break_interval_minutes(),
            45
        );
    }

    #[test]
    fn test_daily_summary_hour_clamped() {
        assert_eq!(settings_with(&[]).daily_summary_hour(), 18);
        assert_eq!(
            settings_with(&[("daily_summary_hour", "7")]).daily_summary_hour(),
            7
        );
        assert_eq!(
            settings_with(&[("daily_summary_hour", "99")]).daily_summary_hour(),
            23
        );
        assert_eq!(
            settings_with(&[("daily_summary_hour", "-3")]).daily_summary_hour(),
            0
        );
        assert_eq!(
            settings_with(&[("daily_summary_hour", "evening")]).daily_summary_hour(),
            18
        );
    }

    #[test]
    fn test_daily_goals_parse_and_malformed() {
        let settings = settings_with(&[(
            "daily_goals",
            r#"[{"categoryName":"development","targetMs":3600000}]"#,
        )]);
        let goals = settings.daily_goals();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].category_name, "development");
        assert_eq!(goals[0].target_ms, 3_600_000);

        assert!(settings_with(&[("daily_goals", "{broken")]).daily_goals().is_empty());
        assert!(settings_with(&[]).daily_goals().is_empty());
    }

    #[test]
    fn test_goal_ledger_resets_on_new_date() {
        let settings = settings_with(&[(
            "goals_notified_today",
            r#"{"date":"2026-08-21","goals":["development"]}"#,
        )]);

        let stale = settings.goal_ledger("2026-08-22");
        assert_eq!(stale.date, "2026-08-22");
        assert!(!stale.contains("development"));

        let fresh = settings.goal_ledger("2026-08-21");
        assert!(fresh.contains("development"));
    }

    #[test]
    fn test_goal_ledger_round_trip() {
        let settings = settings_with(&[]);

        let mut ledger = settings.goal_ledger("2026-08-22");
        ledger.mark("development");
        ledger.mark("development");
        settings.store_goal_ledger(&ledger).unwrap();

        let reread = settings.goal_ledger("2026-08-22");
        assert_eq!(reread.goals, vec!["development".to_string()]);
    }

    #[test]
    fn test_database_backed_settings() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::new(Arc::new(db.clone()));

        assert!(settings.notifications_enabled());
        db.set_setting("notifications_enabled", "false").unwrap();
        assert!(!settings.notifications_enabled());
    }
}
