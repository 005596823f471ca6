use anyhow::Result;

use meridian_common::StatusRecord;
use meridian_store::TrackerStore;

/// Decide whether `status` warrants a new row.
///
/// Reads at most one prior row (newest by insertion order). No prior row
/// means bootstrap and always persists. Otherwise the four mutable fields
/// decide; `last_connection` differs on every poll and is excluded.
pub async fn should_persist(store: &dyn TrackerStore, status: &StatusRecord) -> Result<bool> {
    let prior = store.last_status(&status.serial).await?;
    Ok(match prior {
        None => true,
        Some(prior) => !prior.same_state(status),
    })
}
