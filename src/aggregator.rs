//! Session aggregation: classified samples in, activities and sessions out.
//!
//! The aggregator owns the open-session pointer. Exactly zero or one
//! session accepts new activities at any time, and only the thread
//! driving the aggregator mutates it.

use crate::database::Database;
use crate::types::{Classification, Sample};
use rusqlite::Result as SqlResult;

/// The session currently receiving new activities.
#[derive(Debug, Clone)]
struct OpenSession {
    app_name: String,
    session_id: i64,
}

/// Turns the stream of classified samples into activity rows grouped
/// into session rows with running totals.
///
/// Samples must arrive in non-decreasing `start_time` order; the single
/// tracker thread guarantees this.
pub struct SessionAggregator {
    db: Database,
    current: Option<OpenSession>,
}

impl SessionAggregator {
    pub fn new(db: Database) -> Self {
        Self { db, current: None }
    }

    /// Records one classified sample as an activity.
    ///
    /// Reuses the open session when the app matches, otherwise opens a
    /// new session (implicitly closing the previous one). The activity
    /// insert and the session totals update happen as one step, so a
    /// reader never sees `activity_count` bumped without
    /// `total_duration`. Returns the new activity id.
    pub fn on_sample(
        &mut self,
        sample: &Sample,
        class: &Classification,
        start_time: i64,
        end_time: i64,
    ) -> SqlResult<i64> {
        let session_id = self.get_or_create_session(sample, class, start_time)?;
        let activity_id = self
            .db
            .record_activity(session_id, sample, class, start_time, end_time)?;

        tracing::debug!(
            activity_id = activity_id,
            session_id = session_id,
            app = %sample.app_name,
            duration_ms = (end_time - start_time).max(0),
            "Recorded activity"
        );

        Ok(activity_id)
    }

    /// Returns the open session's id when its app matches the sample,
    /// otherwise creates a fresh session row and makes it the open one.
    /// Idempotent for repeated samples of the same app.
    fn get_or_create_session(
        &mut self,
        sample: &Sample,
        class: &Classification,
        start_time: i64,
    ) -> SqlResult<i64> {
        if let Some(open) = &self.current {
            if open.app_name == sample.app_name {
                return Ok(open.session_id);
            }
        }

        let session_id =
            self.db
                .create_session(&sample.app_name, class.category.as_deref(), start_time)?;

        if let Some(prev) = self.current.replace(OpenSession {
            app_name: sample.app_name.clone(),
            session_id,
        }) {
            tracing::debug!(
                session_id = prev.session_id,
                app = %prev.app_name,
                "App switch ended session"
            );
        }

        tracing::debug!(session_id = session_id, app = %sample.app_name, "Opened session");
        Ok(session_id)
    }

    /// Clears the open-session pointer without touching the session row.
    ///
    /// Called on idle, on pause, and at shutdown. The row keeps its last
    /// `end_time`; there is no closed flag distinguishing a cleanly
    /// ended session from an abandoned one.
    pub fn close_current_session(&mut self) {
        if let Some(open) = self.current.take() {
            tracing::debug!(
                session_id = open.session_id,
                app = %open.app_name,
                "Closed session"
            );
        }
    }

    /// Id of the session currently receiving activities, if any.
    pub fn current_session_id(&self) -> Option<i64> {
        self.current.as_ref().map(|open| open.session_id)
    }
}
