//! Core data types for activity tracking.
//!
//! Defines the records produced by the session aggregator and the
//! inputs it receives from the sample source and classifier.

use serde::{Deserialize, Serialize};

/// One observation of the focused app/window at a point in time.
///
/// Produced by a [`crate::tracker::WindowSampleSource`] on each poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Application name (e.g., "Code", "firefox").
    pub app_name: String,

    /// Window title at the time of the observation.
    pub window_title: String,

    /// URL if the focused window is a browser tab and the source can read it.
    pub url: Option<String>,

    /// When the observation was taken, in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Sample {
    /// Creates a sample for the given app and title, observed at `timestamp`.
    pub fn new(app_name: &str, window_title: &str, timestamp: i64) -> Self {
        Self {
            app_name: app_name.to_string(),
            window_title: window_title.to_string(),
            url: None,
            timestamp,
        }
    }
}

/// Semantic labels attached to a sample by a [`crate::tracker::Classifier`].
///
/// All fields are optional; an empty classification is valid and simply
/// produces an unlabelled activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Category label used for goals and productivity grouping.
    pub category: Option<String>,

    /// Project the activity belongs to, if the classifier can tell.
    pub project_name: Option<String>,

    /// File being edited, if the window title exposes one.
    pub file_name: Option<String>,

    /// File extension of `file_name`.
    pub file_type: Option<String>,

    /// Programming language inferred from the file type.
    pub language: Option<String>,

    /// Host of the focused URL, without scheme or path.
    pub domain: Option<String>,

    /// Opaque classifier payload stored verbatim alongside the activity.
    pub context_json: Option<String>,
}

/// One contiguous interval of classified focus on a single app/window.
///
/// Activities are inserted once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Row id, assigned on insert.
    pub id: i64,

    /// Owning session. `None` only for legacy rows that predate sessions.
    pub session_id: Option<i64>,

    /// Application name the focus interval belongs to.
    pub app_name: String,

    /// Window title at the start of the interval.
    pub window_title: String,

    /// Focused URL, when available.
    pub url: Option<String>,

    /// Classifier category, when available.
    pub category: Option<String>,

    /// Classifier project, when available.
    pub project_name: Option<String>,

    /// Classifier file name, when available.
    pub file_name: Option<String>,

    /// Classifier file extension, when available.
    pub file_type: Option<String>,

    /// Classifier language, when available.
    pub language: Option<String>,

    /// Classifier domain, when available.
    pub domain: Option<String>,

    /// Interval start, milliseconds since the Unix epoch.
    pub start_time: i64,

    /// Interval end, milliseconds since the Unix epoch.
    pub end_time: i64,

    /// Interval length in milliseconds (`end_time - start_time`, never negative).
    pub duration: i64,

    /// Opaque classifier payload, stored verbatim.
    pub context_json: Option<String>,

    /// Insert time, milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// A run of consecutive activities on the same app with no intervening
/// app switch, idle period, or pause.
///
/// Sessions are mutated in place (`end_time`, `total_duration`,
/// `activity_count`) on every activity that extends them. Whether a
/// session is still open is aggregator state, not a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Row id, assigned on insert.
    pub id: i64,

    /// Application name shared by every activity in the session.
    pub app_name: String,

    /// Latest non-null activity category seen in the session.
    pub category: Option<String>,

    /// Start of the first activity, milliseconds since the Unix epoch.
    pub start_time: i64,

    /// End of the most recent activity, milliseconds since the Unix epoch.
    pub end_time: i64,

    /// Sum of the durations of all activities in the session.
    pub total_duration: i64,

    /// Number of activities in the session.
    pub activity_count: i64,
}

/// A session together with the activities recorded inside it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionWithActivities {
    /// The session row.
    pub session: Session,

    /// Activities belonging to the session, newest first.
    pub activities: Vec<Activity>,
}
