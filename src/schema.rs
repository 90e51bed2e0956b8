//! Database schema management for the optional alert log.
//!
//! Ensures the `field_alerts` table and its indexes exist before serving
//! requests. Applied once on startup from `main.rs` when `DATABASE_URL` is
//! set (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the alert log schema (idempotent).
///
/// The unique key on (user, field, reading, type) lets the latest-reading
/// endpoint record the same alert on every poll without duplicating rows.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS field_alerts (
            id              UUID        PRIMARY KEY,
            user_id         TEXT        NOT NULL,
            field_id        TEXT        NOT NULL,
            reading_id      TEXT        NOT NULL,
            alert_type      TEXT        NOT NULL,
            severity        TEXT        NOT NULL,
            message         TEXT        NOT NULL,
            recommendation  TEXT        NOT NULL,
            active          BOOLEAN     NOT NULL DEFAULT TRUE,
            created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT uq_field_alerts_reading
                UNIQUE (user_id, field_id, reading_id, alert_type)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_field_alerts_active
            ON field_alerts (user_id, field_id, created_at DESC)
            WHERE active;
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
