//! Latest reading and history endpoints.
//!
//! - `GET /api/users/{user_id}/fields/{field_id}/sensor-data/latest`
//! - `GET /api/users/{user_id}/fields/{field_id}/sensor-data/history?limit=N`

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{HistoryResponse, LatestReading, NormalizedReading, RawSnapshot};
use crate::store::validate_path_segment;
use crate::{alert_log, pipeline};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route(
            "/api/users/{user_id}/fields/{field_id}/sensor-data/latest",
            get(latest),
        )
        .route(
            "/api/users/{user_id}/fields/{field_id}/sensor-data/history",
            get(history),
        )
}

async fn latest(
    Path((user_id, field_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> AppResult<Json<LatestReading>> {
    // ---
    info!("GET sensor-data/latest for {}/{}", user_id, field_id);

    let latest = latest_reading(&state, &user_id, &field_id).await?;

    info!(
        "Latest reading {} with {} alerts",
        latest.reading.reading_id(),
        latest.alerts.len()
    );
    Ok(Json(latest))
}

async fn history(
    Path((user_id, field_id)): Path<(String, String)>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> AppResult<Json<HistoryResponse>> {
    // ---
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    info!("GET sensor-data/history for {}/{}: {:?}", user_id, field_id, params);

    let max = state.config.history_limit;
    let limit = match params.limit {
        Some(0) => return Err(AppError::BadRequest("limit must be at least 1".into())),
        Some(n) => n.min(max),
        None => max,
    };

    let Some(snapshot) = fetch_snapshot(&state, &user_id, &field_id).await? else {
        info!("No history for {}/{}", user_id, field_id);
        return Ok(Json(HistoryResponse { readings: vec![] }));
    };

    let history = pipeline::history(&snapshot, limit);
    let degraded = history.readings.iter().filter(|r| r.is_degraded()).count();
    if degraded > 0 {
        warn!("{} of {} history readings are degraded", degraded, history.readings.len());
    }

    info!("Returning {} history readings", history.readings.len());
    Ok(Json(history))
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

// ---

/// Fetch raw records. Ids that cannot form a database path are
/// [`AppError::BadRequest`]; store failures are [`AppError::Store`].
pub(super) async fn fetch_snapshot(
    state: &AppState,
    user_id: &str,
    field_id: &str,
) -> AppResult<Option<RawSnapshot>> {
    // ---
    validate_path_segment("user_id", user_id)
        .and_then(|()| validate_path_segment("field_id", field_id))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    debug!("Fetching records from {} store", state.store.kind());
    state
        .store
        .fetch_records(user_id, field_id)
        .await
        .map_err(|e| AppError::Store(format!("{e:#}")))
}

/// Latest reading with alerts; fired alerts are written to the alert log
/// when one is configured.
pub(super) async fn latest_reading(
    state: &AppState,
    user_id: &str,
    field_id: &str,
) -> AppResult<LatestReading> {
    // ---
    let not_found = || AppError::NotFound(format!("No sensor data for field '{field_id}'"));

    let snapshot = fetch_snapshot(state, user_id, field_id)
        .await?
        .ok_or_else(not_found)?;

    let latest = pipeline::latest_with(
        &snapshot,
        state.config.alert_rule_set,
        chrono::Utc::now(),
    )
    .ok_or_else(not_found)?;

    if let (Some(pool), NormalizedReading::Complete(reading)) = (&state.pool, &latest.reading) {
        match alert_log::record_alerts(pool, user_id, field_id, &reading.reading_id, &latest.alerts)
            .await
        {
            Ok(n) => debug!("Logged {} new alerts", n),
            Err(e) => error!("Failed to log alerts: {}", e),
        }
    }

    Ok(latest)
}
