//! HTTP error type for route handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

// ---

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"error": ..., "code": ...}`
/// bodies. Malformed telemetry never ends up here; it is reported inside the
/// reading itself.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ---
    /// The sensor store could not be read.
    #[error("Sensor store unavailable: {0}")]
    Store(String),

    /// No telemetry exists for the requested pair.
    #[error("{0}")]
    NotFound(String),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, code, message) = match &self {
            AppError::Store(msg) => {
                tracing::error!(error = %msg, "Sensor store failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "STORE_UNAVAILABLE",
                    "Sensor data is temporarily unavailable".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_status_codes() {
        // ---
        let cases = [
            (AppError::Store("timeout".into()), StatusCode::BAD_GATEWAY),
            (AppError::NotFound("nothing".into()), StatusCode::NOT_FOUND),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::BadRequest("limit".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
