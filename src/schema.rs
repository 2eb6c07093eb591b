//! Database schema management for `canal-monitor`.
//!
//! Ensures the readings table and its indexes exist before serving requests.
//! Applied once on startup from `main.rs`, only for the PostgreSQL store.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema (idempotent).
///
/// Creates the `sensor_readings` table. The `alert_tier` column is
/// constrained to the three tier names so that a row can always be read
/// back. Safe to call on every startup.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id             BIGSERIAL   PRIMARY KEY,
            reading_date   DATE        NOT NULL,
            sensor_id      VARCHAR(20) NOT NULL,
            water_level_cm INTEGER     NOT NULL CHECK (water_level_cm >= 0),
            alert_tier     VARCHAR(10) NOT NULL
                           CHECK (alert_tier IN ('LOW', 'MEDIUM', 'HIGH'))
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Filter endpoint looks up by date and by tier
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_date
            ON sensor_readings (reading_date);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_tier
            ON sensor_readings (alert_tier);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
