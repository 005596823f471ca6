use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use meridian_store::TrackerStore;

use crate::api::TrackerApi;
use crate::change::should_persist;
use crate::live::{fetch_live, LiveRecord};
use crate::resolver::DeviceResolver;

/// Run cycles until the process dies. Each cycle's failure is logged and the
/// loop rearms after a fixed delay measured from the end of the cycle, so
/// cycle duration adds to the effective period.
pub async fn poll_loop(
    api: &TrackerApi,
    resolver: &DeviceResolver,
    store: &dyn TrackerStore,
    interval: Duration,
) {
    info!(interval_secs = interval.as_secs(), "ingestion loop started");
    loop {
        if let Err(e) = run_cycle(api, resolver, store).await {
            warn!(error=%e, "ingestion cycle failed");
        }
        tokio::time::sleep(interval).await;
    }
}

/// One pass over the active roster, strictly sequential. Only the roster
/// read can fail the cycle; every per-tracker problem is contained to that
/// tracker so one bad device never starves the rest.
pub async fn run_cycle(
    api: &TrackerApi,
    resolver: &DeviceResolver,
    store: &dyn TrackerStore,
) -> Result<()> {
    let roster = store.list_active_serials().await?;
    debug!(trackers = roster.len(), "cycle started");

    let mut status_rows = 0usize;
    let mut fixes = 0usize;
    for serial in &roster {
        let Some(record) = fetch_live(api, resolver, serial).await else {
            continue;
        };
        let (wrote_status, wrote_fix) = ingest_record(store, record).await;
        status_rows += usize::from(wrote_status);
        fixes += usize::from(wrote_fix);
    }

    info!(trackers = roster.len(), status_rows, fixes, "cycle complete");
    Ok(())
}

/// Persist one tracker's record: the fix unconditionally, the status only
/// when the change detector says so. Store errors are logged and dropped
/// here; a failed status write does not block the telemetry write.
async fn ingest_record(store: &dyn TrackerStore, record: LiveRecord) -> (bool, bool) {
    let LiveRecord { status, gps } = record;

    let mut wrote_status = false;
    match should_persist(store, &status).await {
        Ok(true) => {
            if let Err(e) = store.insert_status(&status).await {
                warn!(serial=%status.serial, error=%e, "status insert failed, row dropped");
            } else {
                wrote_status = true;
            }
        }
        Ok(false) => {
            debug!(serial=%status.serial, "status unchanged, write suppressed");
        }
        Err(e) => {
            warn!(serial=%status.serial, error=%e, "prior-status read failed, skipping status write");
        }
    }

    let mut wrote_fix = false;
    if let Some(fix) = gps {
        if let Err(e) = store.insert_telemetry(&fix).await {
            warn!(serial=%fix.serial, error=%e, "telemetry insert failed, fix dropped");
        } else {
            wrote_fix = true;
        }
    }

    (wrote_status, wrote_fix)
}
