//! Optional persistence of fired alerts.
//!
//! Alerts are always recomputed from the latest reading; this log only keeps
//! a record of what fired so the dashboard can list past advisories.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Alert, StoredAlert};

// ---

/// Insert fired alerts for one reading. Returns the number of new rows;
/// alerts already logged for the same reading are skipped.
pub async fn record_alerts(
    pool: &PgPool,
    user_id: &str,
    field_id: &str,
    reading_id: &str,
    alerts: &[Alert],
) -> Result<u64, sqlx::Error> {
    // ---
    if alerts.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for alert in alerts {
        let result = sqlx::query(
            r#"
            INSERT INTO field_alerts (
                id, user_id, field_id, reading_id,
                alert_type, severity, message, recommendation
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, field_id, reading_id, alert_type) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(field_id)
        .bind(reading_id)
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(&alert.recommendation)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Active logged alerts for a pair, newest first.
pub async fn active_alerts(
    pool: &PgPool,
    user_id: &str,
    field_id: &str,
) -> Result<Vec<StoredAlert>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, StoredAlert>(
        r#"
        SELECT id, user_id, field_id, reading_id, alert_type, severity,
               message, recommendation, active, created_at
        FROM field_alerts
        WHERE user_id = $1 AND field_id = $2 AND active
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(field_id)
    .fetch_all(pool)
    .await
}
