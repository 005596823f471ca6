use std::collections::HashMap;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::api::{DeviceEntry, TrackerApi};

/// Serial to internal device id, fetched once per process lifetime.
///
/// The map is never invalidated: a serial absent after the first load stays
/// a miss until restart. If the enumeration fetch itself fails, the resolver
/// holds an empty map and every lookup misses for the rest of the process.
#[derive(Debug, Default)]
pub struct DeviceResolver {
    index: OnceCell<HashMap<String, i64>>,
}

impl DeviceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn preloaded(index: HashMap<String, i64>) -> Self {
        Self {
            index: OnceCell::new_with(Some(index)),
        }
    }

    /// Look up the internal id for `serial`. A miss means "skip this tracker
    /// for this cycle," never an error.
    pub async fn resolve(&self, api: &TrackerApi, serial: &str) -> Option<i64> {
        let index = self
            .index
            .get_or_init(|| async {
                match api.list_devices().await {
                    Ok(entries) => {
                        let index = build_index(entries);
                        info!(devices = index.len(), "device identity cache loaded");
                        index
                    }
                    Err(e) => {
                        warn!(error=%e, "device enumeration failed, all lookups will miss until restart");
                        HashMap::new()
                    }
                }
            })
            .await;
        index.get(serial).copied()
    }
}

fn build_index(entries: Vec<DeviceEntry>) -> HashMap<String, i64> {
    let mut index = HashMap::new();
    for entry in entries {
        match (entry.serial, entry.id) {
            (Some(serial), Some(id)) => {
                index.insert(serial, id);
            }
            (serial, id) => {
                warn!(?serial, ?id, name = ?entry.name, "device entry missing serial or id, skipped");
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(serial: Option<&str>, id: Option<i64>) -> DeviceEntry {
        DeviceEntry {
            serial: serial.map(String::from),
            id,
            name: None,
        }
    }

    #[test]
    fn test_build_index_skips_incomplete_entries() {
        let index = build_index(vec![
            entry(Some("T-1"), Some(10)),
            entry(Some("T-2"), None),
            entry(None, Some(30)),
            entry(Some("T-4"), Some(40)),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("T-1"), Some(&10));
        assert_eq!(index.get("T-4"), Some(&40));
        assert!(!index.contains_key("T-2"));
    }

    #[test]
    fn test_build_index_duplicate_serial_last_wins() {
        let index = build_index(vec![entry(Some("T-1"), Some(10)), entry(Some("T-1"), Some(11))]);
        assert_eq!(index.get("T-1"), Some(&11));
    }

    #[tokio::test]
    async fn test_resolve_miss_on_preloaded_map() {
        let resolver = DeviceResolver::preloaded(HashMap::from([("T-1".to_string(), 10)]));
        let api = TrackerApi::unreachable();

        assert_eq!(resolver.resolve(&api, "T-1").await, Some(10));
        assert_eq!(resolver.resolve(&api, "T-9").await, None);
    }
}
