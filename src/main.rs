//! Application entry point for the `rootai-sensorflow` backend service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Choosing the telemetry store (Firebase RTDB, or fixture data)
//! - Connecting the optional PostgreSQL alert log and creating its schema
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! See [`rootai_sensorflow::config::load_from_env`] for the full list, plus:
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use rootai_sensorflow::store::{FixtureStore, RtdbStore, SensorStore};
use rootai_sensorflow::{config, routes, schema, AppState};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let store: Arc<dyn SensorStore> = match &cfg.rtdb_url {
        Some(url) => Arc::new(RtdbStore::new(url, &cfg.rtdb_root, cfg.rtdb_auth.clone())?),
        None => {
            tracing::warn!("FIREBASE_RTDB_URL not set, serving fixture telemetry");
            Arc::new(FixtureStore::default())
        }
    };

    let pool = match &cfg.db_url {
        Some(db_url) => {
            let masked = config::mask_db_url(db_url);
            tracing::info!("Attempting to connect to database: {}", masked);

            let pool = PgPoolOptions::new()
                .max_connections(cfg.db_pool_max)
                .connect(db_url)
                .await
                .map_err(|e| {
                    anyhow::anyhow!("Failed to connect to database '{}': {}", masked, e)
                })?;

            tracing::info!("Successfully connected to database");
            schema::create_schema(&pool).await?;
            Some(pool)
        }
        None => {
            tracing::info!("DATABASE_URL not set, alert log disabled");
            None
        }
    };

    let addr = cfg.bind_addr;

    // Build app from routes gateway (EMBP)
    let app = routes::router(AppState::new(store, pool, cfg));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `AXUM_LOG_LEVEL` env var
///
/// Called once at startup, after `.env` is loaded so its log settings apply.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
