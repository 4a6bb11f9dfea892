//! Activity and session endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock;
use crate::server::state::AppState;
use crate::types::{Activity, SessionWithActivities};

/// Query parameters for raw activities.
#[derive(Deserialize)]
pub struct ActivitiesQuery {
    /// Range start in epoch milliseconds (default: start of today)
    pub from: Option<i64>,
    /// Range end in epoch milliseconds (default: now)
    pub to: Option<i64>,
    /// Limit results (default: 500, max: 2000)
    pub limit: Option<usize>,
}

/// Response wrapper with metadata.
#[derive(Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
    pub total: usize,
    pub limit: usize,
}

/// GET /api/activities - Raw activity rows, newest first.
pub async fn get_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>, StatusCode> {
    let now = clock::now_ms();
    let from = query.from.unwrap_or_else(|| clock::start_of_local_day(now));
    let to = query.to.unwrap_or(now);
    // Cap results to keep payloads bounded
    let limit = query.limit.unwrap_or(500).min(2000);

    match state.db.activities_in_range(from, to) {
        Ok(mut activities) => {
            let total = activities.len();
            activities.truncate(limit);
            Ok(Json(ActivitiesResponse {
                activities,
                total,
                limit,
            }))
        }
        Err(e) => {
            tracing::error!(?e, "Failed to fetch activities");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Query parameters for the session view.
#[derive(Deserialize)]
pub struct SessionsQuery {
    /// Range start in epoch milliseconds (default: start of today)
    pub from: Option<i64>,
    /// Range end in epoch milliseconds (default: now)
    pub to: Option<i64>,
}

/// GET /api/sessions - Sessions joined with their activities, newest first.
pub async fn get_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<SessionWithActivities>>, StatusCode> {
    let now = clock::now_ms();
    let from = query.from.unwrap_or_else(|| clock::start_of_local_day(now));
    let to = query.to.unwrap_or(now);

    match state.db.sessions_with_activities(from, to) {
        Ok(sessions) => Ok(Json(sessions)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch sessions");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
