//! Alert endpoints.
//!
//! - `GET /api/users/{user_id}/fields/{field_id}/alerts/current`: actionable
//!   alerts computed from the latest reading.
//! - `GET /api/users/{user_id}/fields/{field_id}/alerts`: alerts previously
//!   written to the alert log.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};

use super::sensor_data::latest_reading;
use super::AppState;
use crate::error::AppResult;
use crate::models::{CurrentAlerts, StoredAlert};
use crate::{alert_log, pipeline};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route(
            "/api/users/{user_id}/fields/{field_id}/alerts/current",
            get(current),
        )
        .route("/api/users/{user_id}/fields/{field_id}/alerts", get(logged))
}

async fn current(
    Path((user_id, field_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> AppResult<Json<CurrentAlerts>> {
    // ---
    info!("GET alerts/current for {}/{}", user_id, field_id);

    let latest = latest_reading(&state, &user_id, &field_id).await?;
    let current = pipeline::current_alerts(&latest);

    info!("{} actionable alerts", current.total_alerts);
    Ok(Json(current))
}

#[derive(Serialize)]
struct LoggedAlerts {
    alerts: Vec<StoredAlert>,
}

async fn logged(
    Path((user_id, field_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> AppResult<Json<LoggedAlerts>> {
    // ---
    info!("GET alerts for {}/{}", user_id, field_id);

    let Some(pool) = &state.pool else {
        warn!("Alert log disabled (DATABASE_URL unset), returning no alerts");
        return Ok(Json(LoggedAlerts { alerts: vec![] }));
    };

    let alerts = alert_log::active_alerts(pool, &user_id, &field_id).await?;
    info!("Returning {} logged alerts", alerts.len());
    Ok(Json(LoggedAlerts { alerts }))
}
