use anyhow::Result;
use async_trait::async_trait;

use meridian_common::{StatusRecord, TelemetryRecord};

/// The persistence sink the ingestion pipeline depends on. Any backend that
/// can hold the roster plus append-only status and telemetry rows fits.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Serials considered active for polling. Read fresh every cycle so a
    /// tracker added or removed between cycles takes effect on the next one.
    async fn list_active_serials(&self) -> Result<Vec<String>>;

    /// Most recently inserted status row for `serial`, if any.
    async fn last_status(&self, serial: &str) -> Result<Option<StatusRecord>>;

    async fn insert_status(&self, status: &StatusRecord) -> Result<()>;

    async fn insert_telemetry(&self, fix: &TelemetryRecord) -> Result<()>;
}
