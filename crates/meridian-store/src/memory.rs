use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use tokio::sync::RwLock;

use meridian_common::{StatusRecord, TelemetryRecord};

use crate::types::TrackerStore;

/// In-process store backend. Used by tests and local runs; keeps the same
/// append-only row semantics as the Postgres backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackerStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    roster: Vec<String>,
    status: HashMap<String, Vec<StatusRecord>>,
    telemetry: Vec<TelemetryRecord>,
}

impl MemoryTrackerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_roster(&self, serials: Vec<String>) {
        self.inner.write().await.roster = serials;
    }

    /// All status rows ever inserted for `serial`, oldest first.
    pub async fn status_history(&self, serial: &str) -> Vec<StatusRecord> {
        let inner = self.inner.read().await;
        inner.status.get(serial).cloned().unwrap_or_default()
    }

    pub async fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.inner.read().await.telemetry.clone()
    }
}

#[async_trait::async_trait]
impl TrackerStore for MemoryTrackerStore {
    async fn list_active_serials(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.roster.clone())
    }

    async fn last_status(&self, serial: &str) -> Result<Option<StatusRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.status.get(serial).and_then(|rows| rows.last().cloned()))
    }

    async fn insert_status(&self, status: &StatusRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .status
            .entry(status.serial.clone())
            .or_default()
            .push(status.clone());
        Ok(())
    }

    async fn insert_telemetry(&self, fix: &TelemetryRecord) -> Result<()> {
        self.inner.write().await.telemetry.push(fix.clone());
        Ok(())
    }
}
