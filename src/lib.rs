//! Sensor relay backend for the ROOTAI field platform.
//!
//! Raw telemetry records are read from a storage collaborator
//! ([`store::SensorStore`]), reconciled into canonical readings by
//! [`normalize`], and classified into agronomic alerts by [`alerts`].
//! [`pipeline`] ties the two together for the latest / history views served
//! by [`routes`].
//!
//! The normalizer and alert engine are synchronous pure functions with no
//! access to the store, the database or any global state.

pub mod alert_log;
pub mod alerts;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod store;

pub use alerts::RuleSet;
pub use config::Config;
pub use models::{
    Alert, AlertKind, CanonicalReading, LatestReading, NormalizedReading, RawSnapshot, Severity,
};
pub use routes::AppState;
