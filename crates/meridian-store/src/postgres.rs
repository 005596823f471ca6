use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use meridian_common::{MotionState, StatusRecord, TelemetryRecord, TrackerMode};

use crate::types::TrackerStore;

/// Status and telemetry rows are append-only; `last_status` is the newest
/// row by insertion order, not by `last_connection`.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trackers (
    serial TEXT PRIMARY KEY,
    active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS tracker_status (
    id BIGSERIAL PRIMARY KEY,
    serial TEXT NOT NULL,
    device_id BIGINT NOT NULL,
    battery DOUBLE PRECISION,
    temperature DOUBLE PRECISION,
    motion TEXT,
    mode TEXT,
    last_connection TIMESTAMPTZ,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS tracker_status_serial_id
    ON tracker_status (serial, id DESC);

CREATE TABLE IF NOT EXISTS tracker_telemetry (
    id BIGSERIAL PRIMARY KEY,
    serial TEXT NOT NULL,
    device_id BIGINT NOT NULL,
    fix_time TIMESTAMPTZ NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    altitude DOUBLE PRECISION,
    speed DOUBLE PRECISION,
    heading DOUBLE PRECISION,
    accuracy DOUBLE PRECISION
);
"#;

#[derive(Debug, Clone)]
pub struct PgTrackerStore {
    pool: PgPool,
}

impl PgTrackerStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables on boot if they are not there yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TrackerStore for PgTrackerStore {
    async fn list_active_serials(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT serial FROM trackers WHERE active ORDER BY serial")
            .fetch_all(&self.pool)
            .await?;

        let mut serials = Vec::with_capacity(rows.len());
        for row in rows {
            serials.push(row.try_get("serial")?);
        }
        Ok(serials)
    }

    async fn last_status(&self, serial: &str) -> Result<Option<StatusRecord>> {
        let row = sqlx::query(
            "SELECT serial, device_id, battery, temperature, motion, mode, last_connection
             FROM tracker_status
             WHERE serial = $1
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(serial)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let motion: Option<String> = row.try_get("motion")?;
        let mode: Option<String> = row.try_get("mode")?;
        let last_connection: Option<DateTime<Utc>> = row.try_get("last_connection")?;

        Ok(Some(StatusRecord {
            serial: row.try_get("serial")?,
            device_id: row.try_get("device_id")?,
            battery: row.try_get("battery")?,
            temperature: row.try_get("temperature")?,
            motion: motion.as_deref().and_then(MotionState::parse_loose),
            mode: mode.as_deref().and_then(TrackerMode::parse_loose),
            last_connection,
        }))
    }

    async fn insert_status(&self, status: &StatusRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO tracker_status
                 (serial, device_id, battery, temperature, motion, mode, last_connection)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&status.serial)
        .bind(status.device_id)
        .bind(status.battery)
        .bind(status.temperature)
        .bind(status.motion.map(MotionState::as_str))
        .bind(status.mode.map(TrackerMode::as_str))
        .bind(status.last_connection)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_telemetry(&self, fix: &TelemetryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO tracker_telemetry
                 (serial, device_id, fix_time, latitude, longitude, altitude, speed, heading, accuracy)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&fix.serial)
        .bind(fix.device_id)
        .bind(fix.timestamp)
        .bind(fix.latitude)
        .bind(fix.longitude)
        .bind(fix.altitude)
        .bind(fix.speed)
        .bind(fix.heading)
        .bind(fix.accuracy)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
