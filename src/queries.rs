//! Read-side aggregation queries over stored activities and sessions.
//!
//! Every query takes an inclusive `[start_time, end_time]` millisecond
//! range except [`Database::daily_totals`], which derives its own start
//! from a day count. Hour and date bucketing use the device's local
//! timezone, not UTC.

use crate::clock;
use crate::database::Database;
use crate::types::{Activity, Session, SessionWithActivities};
use rusqlite::{params, Result as SqlResult};
use std::collections::HashMap;

const ACTIVITY_COLUMNS: &str = "id, session_id, app_name, window_title, url, category, \
     project_name, file_name, file_type, language, domain, \
     start_time, end_time, duration, context_json, created_at";

fn map_activity(row: &rusqlite::Row) -> SqlResult<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        session_id: row.get(1)?,
        app_name: row.get(2)?,
        window_title: row.get(3)?,
        url: row.get(4)?,
        category: row.get(5)?,
        project_name: row.get(6)?,
        file_name: row.get(7)?,
        file_type: row.get(8)?,
        language: row.get(9)?,
        domain: row.get(10)?,
        start_time: row.get(11)?,
        end_time: row.get(12)?,
        duration: row.get(13)?,
        context_json: row.get(14)?,
        created_at: row.get(15)?,
    })
}

impl Database {
    /// Activities whose start falls in range, newest first.
    pub fn activities_in_range(&self, start_time: i64, end_time: i64) -> SqlResult<Vec<Activity>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2
             ORDER BY start_time DESC",
            ACTIVITY_COLUMNS
        ))?;

        let rows = stmt.query_map(params![start_time, end_time], map_activity)?;
        rows.collect()
    }

    /// Summed duration and row count per app, longest first.
    pub fn app_usage(&self, start_time: i64, end_time: i64) -> SqlResult<Vec<AppUsage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT app_name,
                    COALESCE(SUM(duration), 0) as total_duration,
                    COUNT(*) as activity_count
             FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2
             GROUP BY app_name
             ORDER BY total_duration DESC",
        )?;

        let rows = stmt.query_map(params![start_time, end_time], |row| {
            Ok(AppUsage {
                app_name: row.get(0)?,
                total_duration: row.get(1)?,
                activity_count: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Summed duration and row count per category, longest first.
    ///
    /// Unclassified activities form their own bucket with a null category.
    pub fn category_breakdown(
        &self,
        start_time: i64,
        end_time: i64,
    ) -> SqlResult<Vec<CategoryUsage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT category,
                    COALESCE(SUM(duration), 0) as total_duration,
                    COUNT(*) as activity_count
             FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2
             GROUP BY category
             ORDER BY total_duration DESC",
        )?;

        let rows = stmt.query_map(params![start_time, end_time], |row| {
            Ok(CategoryUsage {
                category: row.get(0)?,
                total_duration: row.get(1)?,
                activity_count: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Summed duration and row count per project, longest first.
    /// Rows without a project are excluded.
    pub fn project_time(&self, start_time: i64, end_time: i64) -> SqlResult<Vec<ProjectUsage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT project_name,
                    COALESCE(SUM(duration), 0) as total_duration,
                    COUNT(*) as activity_count
             FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2 AND project_name IS NOT NULL
             GROUP BY project_name
             ORDER BY total_duration DESC",
        )?;

        let rows = stmt.query_map(params![start_time, end_time], |row| {
            Ok(ProjectUsage {
                project_name: row.get(0)?,
                total_duration: row.get(1)?,
                activity_count: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Summed duration and row count per domain, longest first.
    /// Rows without a domain are excluded.
    pub fn domain_usage(&self, start_time: i64, end_time: i64) -> SqlResult<Vec<DomainUsage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT domain,
                    COALESCE(SUM(duration), 0) as total_duration,
                    COUNT(*) as activity_count
             FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2 AND domain IS NOT NULL
             GROUP BY domain
             ORDER BY total_duration DESC",
        )?;

        let rows = stmt.query_map(params![start_time, end_time], |row| {
            Ok(DomainUsage {
                domain: row.get(0)?,
                total_duration: row.get(1)?,
                activity_count: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Summed duration per (local hour, category), hour ascending.
    pub fn hourly_pattern(&self, start_time: i64, end_time: i64) -> SqlResult<Vec<HourlyUsage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT CAST(strftime('%H', start_time / 1000, 'unixepoch', 'localtime') AS INTEGER) as hour,
                    category,
                    COALESCE(SUM(duration), 0) as total_duration
             FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2
             GROUP BY hour, category
             ORDER BY hour",
        )?;

        let rows = stmt.query_map(params![start_time, end_time], |row| {
            Ok(HourlyUsage {
                hour: row.get(0)?,
                category: row.get(1)?,
                total_duration: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Summed duration and row count per local calendar date over the
    /// last `days` days, newest date first.
    pub fn daily_totals(&self, days: i64) -> SqlResult<Vec<DailyUsage>> {
        let now = clock::now_ms();
        let start = now - days.max(0) * 86_400_000;

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT date(start_time / 1000, 'unixepoch', 'localtime') as day,
                    COALESCE(SUM(duration), 0) as total_duration,
                    COUNT(*) as activity_count
             FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2
             GROUP BY day
             ORDER BY day DESC",
        )?;

        let rows = stmt.query_map(params![start, now], |row| {
            Ok(DailyUsage {
                date: row.get(0)?,
                total_duration: row.get(1)?,
                activity_count: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Total tracked milliseconds over the range (0 if no rows).
    pub fn total_tracked_time(&self, start_time: i64, end_time: i64) -> SqlResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COALESCE(SUM(duration), 0) FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2",
            params![start_time, end_time],
            |row| row.get(0),
        )
    }

    /// Sessions in range joined with the activities recorded in them,
    /// newest session first.
    ///
    /// Only activities whose own start falls in the range are attached.
    /// Legacy activities without a session id group under a null bucket
    /// and are dropped, since no session row can match them.
    pub fn sessions_with_activities(
        &self,
        start_time: i64,
        end_time: i64,
    ) -> SqlResult<Vec<SessionWithActivities>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, app_name, category, start_time, end_time, total_duration, activity_count
             FROM sessions
             WHERE start_time >= ?1 AND start_time <= ?2
             ORDER BY start_time DESC",
        )?;
        let rows = stmt.query_map(params![start_time, end_time], |row| {
            Ok(Session {
                id: row.get(0)?,
                app_name: row.get(1)?,
                category: row.get(2)?,
                start_time: row.get(3)?,
                end_time: row.get(4)?,
                total_duration: row.get(5)?,
                activity_count: row.get(6)?,
            })
        })?;
        let sessions: Vec<Session> = rows.collect::<SqlResult<_>>()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM activities
             WHERE start_time >= ?1 AND start_time <= ?2
             ORDER BY start_time DESC",
            ACTIVITY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![start_time, end_time], map_activity)?;
        let activities: Vec<Activity> = rows.collect::<SqlResult<_>>()?;

        let mut by_session: HashMap<Option<i64>, Vec<Activity>> = HashMap::new();
        for activity in activities {
            by_session
                .entry(activity.session_id)
                .or_default()
                .push(activity);
        }

        Ok(sessions
            .into_iter()
            .map(|session| {
                let activities = by_session.remove(&Some(session.id)).unwrap_or_default();
                SessionWithActivities {
                    session,
                    activities,
                }
            })
            .collect())
    }
}

/// Per-app rollup over a time range.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AppUsage {
    pub app_name: String,
    pub total_duration: i64,
    pub activity_count: i64,
}

/// Per-category rollup; `category` is null for unclassified time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryUsage {
    pub category: Option<String>,
    pub total_duration: i64,
    pub activity_count: i64,
}

/// Per-project rollup over a time range.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectUsage {
    pub project_name: String,
    pub total_duration: i64,
    pub activity_count: i64,
}

/// Per-domain rollup over a time range.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DomainUsage {
    pub domain: String,
    pub total_duration: i64,
    pub activity_count: i64,
}

/// Summed duration for one (local hour, category) bucket.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HourlyUsage {
    pub hour: i32,
    pub category: Option<String>,
    pub total_duration: i64,
}

/// Summed duration and row count for one local calendar date.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DailyUsage {
    pub date: String,
    pub total_duration: i64,
    pub activity_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, Sample};
    use chrono::{Local, TimeZone};

    /// Creates a one-activity session and returns the session id.
    fn record(db: &Database, app: &str, category: Option<&str>, start: i64, end: i64) -> i64 {
        let session_id = db.create_session(app, category, start).unwrap();
        let sample = Sample::new(app, "window", start);
        let class = Classification {
            category: category.map(str::to_string),
            ..Default::default()
        };
        db.record_activity(session_id, &sample, &class, start, end)
            .unwrap();
        session_id
    }

    /// Millisecond timestamp for today's local `hour`:`min`.
    fn today_at(hour: u32, min: u32) -> i64 {
        let naive = Local::now()
            .date_naive()
            .and_hms_opt(hour, min, 0)
            .unwrap();
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_app_usage_ordered_by_duration() {
        let db = Database::open_in_memory().unwrap();
        record(&db, "Editor", None, 0, 600_000);
        record(&db, "Browser", None, 600_000, 2_400_000);

        let usage = db.app_usage(0, 3_000_000).unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].app_name, "Browser");
        assert_eq!(usage[0].total_duration, 1_800_000);
        assert_eq!(usage[1].app_name, "Editor");
        assert_eq!(usage[1].activity_count, 1);
    }

    #[test]
    fn test_category_breakdown_has_null_bucket() {
        let db = Database::open_in_memory().unwrap();
        record(&db, "Editor", Some("development"), 0, 500_000);
        record(&db, "Mystery", None, 500_000, 600_000);

        let breakdown = db.category_breakdown(0, 1_000_000).unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].category.as_deref(), Some("development"));

        let null_bucket = breakdown.iter().find(|c| c.category.is_none()).unwrap();
        assert_eq!(null_bucket.total_duration, 100_000);
    }

    #[test]
    fn test_project_and_domain_exclude_null_rows() {
        let db = Database::open_in_memory().unwrap();
        record(&db, "Editor", None, 0, 100_000);

        let session_id = db.create_session("Browser", None, 100_000).unwrap();
        let sample = Sample::new("Browser", "docs", 100_000);
        let class = Classification {
            project_name: Some("focusmon".to_string()),
            domain: Some("docs.rs".to_string()),
            ..Default::default()
        };
        db.record_activity(session_id, &sample, &class, 100_000, 400_000)
            .unwrap();

        let projects = db.project_time(0, 1_000_000).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].project_name, "focusmon");
        assert_eq!(projects[0].total_duration, 300_000);

        let domains = db.domain_usage(0, 1_000_000).unwrap();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].domain, "docs.rs");
    }

    #[test]
    fn test_activities_in_range_newest_first() {
        let db = Database::open_in_memory().unwrap();
        record(&db, "Editor", None, 100, 200);
        record(&db, "Editor", None, 300, 400);
        record(&db, "Editor", None, 900, 1_000);

        let activities = db.activities_in_range(0, 500).unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].start_time, 300);
        assert_eq!(activities[1].start_time, 100);
    }

    #[test]
    fn test_total_tracked_time() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.total_tracked_time(0, 1_000_000).unwrap(), 0);

        record(&db, "Editor", None, 0, 250_000);
        record(&db, "Editor", None, 2_000_000, 2_100_000);

        assert_eq!(db.total_tracked_time(0, 1_000_000).unwrap(), 250_000);
    }

    #[test]
    fn test_hourly_pattern_buckets_by_local_hour() {
        let db = Database::open_in_memory().unwrap();
        let nine = today_at(9, 0);
        let nine_thirty = today_at(9, 30);

        record(&db, "Editor", Some("development"), nine, nine + 600_000);
        record(
            &db,
            "Editor",
            Some("development"),
            nine_thirty,
            nine_thirty + 600_000,
        );

        let pattern = db.hourly_pattern(nine - 1, nine_thirty + 700_000).unwrap();
        assert_eq!(pattern.len(), 1);
        assert_eq!(pattern[0].hour, 9);
        assert_eq!(pattern[0].category.as_deref(), Some("development"));
        assert_eq!(pattern[0].total_duration, 1_200_000);
    }

    #[test]
    fn test_daily_totals_newest_date_first() {
        let db = Database::open_in_memory().unwrap();
        let now = clock::now_ms();
        let two_days_ago = now - 2 * 86_400_000;

        record(&db, "Editor", None, now - 60_000, now - 30_000);
        record(&db, "Editor", None, two_days_ago, two_days_ago + 45_000);

        let totals = db.daily_totals(7).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].date, clock::local_date_string(now - 60_000));
        assert_eq!(totals[0].total_duration, 30_000);
        assert_eq!(totals[1].date, clock::local_date_string(two_days_ago));
        assert_eq!(totals[1].total_duration, 45_000);
        assert!(totals[0].date > totals[1].date);
    }

    #[test]
    fn test_sessions_with_activities_grouping() {
        let db = Database::open_in_memory().unwrap();

        let editor = db.create_session("Editor", None, 0).unwrap();
        let sample = Sample::new("Editor", "main.rs", 0);
        db.record_activity(editor, &sample, &Classification::default(), 0, 100)
            .unwrap();
        db.record_activity(editor, &sample, &Classification::default(), 100, 200)
            .unwrap();

        record(&db, "Browser", None, 500, 900);

        // Legacy row without a session id
        db.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO activities (app_name, window_title, start_time, end_time, duration, created_at)
                 VALUES ('Old', 'legacy', 50, 60, 10, 0)",
                [],
            )
            .unwrap();

        let joined = db.sessions_with_activities(0, 1_000).unwrap();
        assert_eq!(joined.len(), 2);

        // Newest session first
        assert_eq!(joined[0].session.app_name, "Browser");
        assert_eq!(joined[0].activities.len(), 1);
        assert_eq!(joined[1].session.app_name, "Editor");
        assert_eq!(joined[1].activities.len(), 2);

        // The legacy activity is attached to no session
        let total_attached: usize = joined.iter().map(|s| s.activities.len()).sum();
        assert_eq!(total_attached, 3);
    }

    #[test]
    fn test_sessions_with_activities_filters_activity_range() {
        let db = Database::open_in_memory().unwrap();

        let session_id = db.create_session("Editor", None, 100).unwrap();
        let sample = Sample::new("Editor", "main.rs", 100);
        db.record_activity(session_id, &sample, &Classification::default(), 100, 200)
            .unwrap();
        db.record_activity(session_id, &sample, &Classification::default(), 5_000, 6_000)
            .unwrap();

        // Range covers the session start but only the first activity.
        let joined = db.sessions_with_activities(0, 1_000).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].activities.len(), 1);
        assert_eq!(joined[0].activities[0].start_time, 100);
    }
}
