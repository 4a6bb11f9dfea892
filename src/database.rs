//! SQLite database for persistent activity storage.
//!
//! This module owns the schema (activities, sessions, settings) and the
//! write-side primitives. Read-side projections live in [`crate::queries`].

use crate::clock;
use crate::types::{Classification, Sample, Session};
use rusqlite::{params, Connection, Result as SqlResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Database wrapper with thread-safe connection.
#[derive(Clone)]
pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database at the default location.
    ///
    /// Creates `<data_dir>/focusmon/activity.db` if it doesn't exist.
    pub fn open() -> SqlResult<Self> {
        let db_path = Self::get_db_path();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        tracing::info!(path = ?db_path, "Opening database");

        let conn = Connection::open(&db_path)?;

        // Enable WAL mode for better crash safety
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Opens an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Returns the default database path.
    fn get_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("focusmon")
            .join("activity.db")
    }

    /// Initializes the database schema.
    ///
    /// Safe to run on every open; all steps are idempotent.
    fn init_schema(&self) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Classified focus intervals. All timestamps are integer
            -- milliseconds since the Unix epoch.
            CREATE TABLE IF NOT EXISTS activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_name TEXT NOT NULL,
                window_title TEXT NOT NULL,
                url TEXT,
                category TEXT,
                project_name TEXT,
                file_name TEXT,
                file_type TEXT,
                language TEXT,
                domain TEXT,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                duration INTEGER NOT NULL,
                context_json TEXT,
                created_at INTEGER NOT NULL
            );

            -- Runs of consecutive same-app activities
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_name TEXT NOT NULL,
                category TEXT,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                total_duration INTEGER NOT NULL DEFAULT 0,
                activity_count INTEGER NOT NULL DEFAULT 0
            );

            -- Settings and small JSON blobs
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at INTEGER NOT NULL
            );

            -- Indexes for range queries
            CREATE INDEX IF NOT EXISTS idx_activities_start ON activities(start_time);
            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);
            "#,
        )?;

        // Databases created before sessions existed lack the column;
        // re-adding it fails once present and the failure is discarded.
        let _ = conn.execute("ALTER TABLE activities ADD COLUMN session_id INTEGER", []);

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activities_session ON activities(session_id)",
            [],
        )?;

        // Seed default settings if empty
        let settings_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0))?;
        if settings_count == 0 {
            let now = clock::now_ms();
            let defaults = [
                (
                    "notifications_enabled",
                    "true",
                    "Master switch for all notifications",
                ),
                (
                    "break_reminders_enabled",
                    "true",
                    "Break reminder notifications",
                ),
                (
                    "break_interval_minutes",
                    "60",
                    "Minutes of activity before a break reminder",
                ),
                (
                    "daily_summary_enabled",
                    "true",
                    "Daily summary notification",
                ),
                (
                    "daily_summary_hour",
                    "18",
                    "Local hour (0-23) for the daily summary",
                ),
                (
                    "pomodoro_notifications_enabled",
                    "true",
                    "Pomodoro completion notifications",
                ),
                (
                    "poll_interval_secs",
                    "5",
                    "Window sampling interval (seconds)",
                ),
                (
                    "idle_threshold_secs",
                    "300",
                    "Idle detection threshold (seconds)",
                ),
            ];

            for (key, value, description) in defaults {
                conn.execute(
                    "INSERT INTO settings (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    params![key, value, description, now],
                )?;
            }

            tracing::info!("Added {} default settings", defaults.len());
        }

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    /// Creates a new session row starting at `start_time`.
    ///
    /// The session starts with zero totals; [`Self::record_activity`]
    /// extends it.
    pub fn create_session(
        &self,
        app_name: &str,
        category: Option<&str>,
        start_time: i64,
    ) -> SqlResult<i64> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO sessions (app_name, category, start_time, end_time, total_duration, activity_count)
             VALUES (?1, ?2, ?3, ?3, 0, 0)",
            params![app_name, category, start_time],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Inserts an activity and extends its owning session in one step.
    ///
    /// The session update is a single relative-increment statement, so a
    /// reader never observes `activity_count` bumped without
    /// `total_duration`. Returns the new activity id.
    pub fn record_activity(
        &self,
        session_id: i64,
        sample: &Sample,
        class: &Classification,
        start_time: i64,
        end_time: i64,
    ) -> SqlResult<i64> {
        let duration = (end_time - start_time).max(0);
        let created_at = clock::now_ms();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO activities (session_id, app_name, window_title, url, category,
                                     project_name, file_name, file_type, language, domain,
                                     start_time, end_time, duration, context_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                session_id,
                sample.app_name,
                sample.window_title,
                sample.url,
                class.category,
                class.project_name,
                class.file_name,
                class.file_type,
                class.language,
                class.domain,
                start_time,
                end_time,
                duration,
                class.context_json,
                created_at,
            ],
        )?;
        let activity_id = conn.last_insert_rowid();

        conn.execute(
            "UPDATE sessions
             SET total_duration = total_duration + ?1,
                 activity_count = activity_count + 1,
                 end_time = ?2,
                 category = COALESCE(?3, category)
             WHERE id = ?4",
            params![duration, end_time, class.category, session_id],
        )?;

        Ok(activity_id)
    }

    /// Gets a session row by id.
    pub fn get_session(&self, id: i64) -> SqlResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, app_name, category, start_time, end_time, total_duration, activity_count
             FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    app_name: row.get(1)?,
                    category: row.get(2)?,
                    start_time: row.get(3)?,
                    end_time: row.get(4)?,
                    total_duration: row.get(5)?,
                    activity_count: row.get(6)?,
                })
            },
        ) {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // === Settings Methods ===

    /// Gets a setting value by key.
    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Sets a setting value, creating the key if it doesn't exist.
    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = clock::now_ms();
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// Gets all settings.
    pub fn get_all_settings(&self) -> SqlResult<Vec<(String, String, Option<String>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, value, description FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_database_seeds_defaults() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(
            db.get_setting("notifications_enabled").unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(
            db.get_setting("break_interval_minutes").unwrap().as_deref(),
            Some("60")
        );
        assert!(db.get_setting("daily_goals").unwrap().is_none());
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        // A second run re-applies the session_id migration, whose
        // failure must be discarded.
        db.init_schema().unwrap();
        db.init_schema().unwrap();
    }

    #[test]
    fn test_record_activity_extends_session() {
        let db = Database::open_in_memory().unwrap();
        let session_id = db.create_session("Editor", None, 0).unwrap();

        let sample = Sample::new("Editor", "main.rs", 0);
        let class = Classification {
            category: Some("development".to_string()),
            ..Default::default()
        };

        db.record_activity(session_id, &sample, &class, 0, 600_000)
            .unwrap();
        db.record_activity(session_id, &sample, &class, 600_000, 1_200_000)
            .unwrap();

        let session = db.get_session(session_id).unwrap().unwrap();
        assert_eq!(session.total_duration, 1_200_000);
        assert_eq!(session.activity_count, 2);
        assert_eq!(session.end_time, 1_200_000);
        assert_eq!(session.category.as_deref(), Some("development"));
    }

    #[test]
    fn test_session_category_keeps_last_non_null() {
        let db = Database::open_in_memory().unwrap();
        let session_id = db.create_session("Editor", None, 0).unwrap();
        let sample = Sample::new("Editor", "notes.txt", 0);

        let classified = Classification {
            category: Some("writing".to_string()),
            ..Default::default()
        };
        db.record_activity(session_id, &sample, &classified, 0, 1_000)
            .unwrap();

        // An unclassified activity must not erase the category.
        db.record_activity(session_id, &sample, &Classification::default(), 1_000, 2_000)
            .unwrap();

        let session = db.get_session(session_id).unwrap().unwrap();
        assert_eq!(session.category.as_deref(), Some("writing"));
    }

    #[test]
    fn test_set_setting_upserts() {
        let db = Database::open_in_memory().unwrap();

        db.set_setting("daily_goals", "[]").unwrap();
        assert_eq!(db.get_setting("daily_goals").unwrap().as_deref(), Some("[]"));

        db.set_setting("daily_goals", "[{\"categoryName\":\"dev\"}]")
            .unwrap();
        assert_eq!(
            db.get_setting("daily_goals").unwrap().as_deref(),
            Some("[{\"categoryName\":\"dev\"}]")
        );
    }

    #[test]
    fn test_get_session_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_session(999).unwrap().is_none());
    }
}
