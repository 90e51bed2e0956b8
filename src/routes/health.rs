// src/routes/health.rs
//! API health check endpoint.
//!
//! `/health` is used by container orchestrators and CI to verify the service
//! answers HTTP requests. It reports which telemetry source and alert rule
//! set are active, but does not touch the store or the database.
//!
//! EMBP: the gateway (`mod.rs`) merges the subrouter exported here.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    alert_rules: &'static str,
    alert_rules_version: &'static str,
    alert_log: bool,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // ---
    let rules = state.config.alert_rule_set;
    Json(HealthResponse {
        status: "ok",
        store: state.store.kind(),
        alert_rules: rules.name(),
        alert_rules_version: rules.version(),
        alert_log: state.pool.is_some(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
