//! Settings endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: Vec<SettingEntry>,
}

#[derive(Debug, Serialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSetting {
    pub value: String,
}

/// GET /api/settings - All settings with descriptions.
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, StatusCode> {
    match state.db.get_all_settings() {
        Ok(rows) => {
            let settings = rows
                .into_iter()
                .map(|(key, value, description)| SettingEntry {
                    key,
                    value,
                    description,
                })
                .collect();

            Ok(Json(SettingsResponse { settings }))
        }
        Err(e) => {
            tracing::error!(?e, "Failed to fetch settings");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// PUT /api/settings/:key - Upsert a single setting.
pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(body): Json<UpdateSetting>,
) -> Result<Json<SettingEntry>, StatusCode> {
    if let Err(e) = state.db.set_setting(&key, &body.value) {
        tracing::error!(?e, key = %key, "Failed to update setting");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    tracing::info!(key = %key, value = %body.value, "Setting updated");
    Ok(Json(SettingEntry {
        key,
        value: body.value,
        description: None,
    }))
}
