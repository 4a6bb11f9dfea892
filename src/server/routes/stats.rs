//! Statistics endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock;
use crate::queries::{AppUsage, CategoryUsage, DailyUsage, DomainUsage, HourlyUsage, ProjectUsage};
use crate::server::state::AppState;

/// Time range in epoch milliseconds. Defaults to the local day so far.
#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl RangeQuery {
    fn resolve(&self) -> (i64, i64) {
        let now = clock::now_ms();
        let from = self.from.unwrap_or_else(|| clock::start_of_local_day(now));
        let to = self.to.unwrap_or(now);
        (from, to)
    }
}

#[derive(Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub date: String,
    pub total_duration_ms: i64,
    pub session_count: usize,
    pub unique_apps: usize,
    pub top_category: Option<String>,
}

/// GET /api/stats - Today's summary statistics.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, StatusCode> {
    let now = clock::now_ms();
    let start_of_day = clock::start_of_local_day(now);

    let result = state
        .db
        .total_tracked_time(start_of_day, now)
        .and_then(|total| {
            let apps = state.db.app_usage(start_of_day, now)?;
            let breakdown = state.db.category_breakdown(start_of_day, now)?;
            let sessions = state.db.sessions_with_activities(start_of_day, now)?;
            Ok(StatsResponse {
                date: clock::local_date_string(now),
                total_duration_ms: total,
                session_count: sessions.len(),
                unique_apps: apps.len(),
                top_category: breakdown.iter().find_map(|c| c.category.clone()),
            })
        });

    match result {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            tracing::error!(?e, "Failed to compute stats");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/stats/apps - Focus time per app.
pub async fn get_app_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<AppUsage>>, StatusCode> {
    let (from, to) = query.resolve();
    match state.db.app_usage(from, to) {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch app stats");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/stats/categories - Focus time per category.
pub async fn get_category_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<CategoryUsage>>, StatusCode> {
    let (from, to) = query.resolve();
    match state.db.category_breakdown(from, to) {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch category stats");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/stats/projects - Focus time per project.
pub async fn get_project_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<ProjectUsage>>, StatusCode> {
    let (from, to) = query.resolve();
    match state.db.project_time(from, to) {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch project stats");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/stats/domains - Focus time per web domain.
pub async fn get_domain_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DomainUsage>>, StatusCode> {
    let (from, to) = query.resolve();
    match state.db.domain_usage(from, to) {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch domain stats");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/stats/hourly - Focus time by local hour, for charts.
pub async fn get_hourly_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<HourlyUsage>>, StatusCode> {
    let (from, to) = query.resolve();
    match state.db.hourly_pattern(from, to) {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch hourly stats");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/stats/daily?days=7 - Daily totals for trend charts.
pub async fn get_daily_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyUsage>>, StatusCode> {
    let days = query.days.unwrap_or(7);
    match state.db.daily_totals(days) {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(?e, "Failed to fetch daily totals");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
