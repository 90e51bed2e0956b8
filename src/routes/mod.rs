//! Route gateway (EMBP): sibling modules export subrouters, this module
//! merges them and attaches the shared application state.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::store::SensorStore;
use crate::Config;

mod alerts;
mod health;
mod sensor_data;

// ---

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub store: Arc<dyn SensorStore>,
    /// Alert log; `None` when no database is configured.
    pub pool: Option<PgPool>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn SensorStore>, pool: Option<PgPool>, config: Config) -> Self {
        AppState {
            store,
            pool,
            config,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(sensor_data::router())
        .merge(alerts::router())
        .merge(health::router())
        .with_state(state)
}
