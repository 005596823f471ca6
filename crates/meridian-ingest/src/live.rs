use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use meridian_common::{MotionState, StatusRecord, TelemetryRecord, TrackerMode};

use crate::api::{RawPoint, StatusPayload, TrackerApi};
use crate::resolver::DeviceResolver;

/// One tracker's poll result: health fields plus, when a usable point came
/// back, the newest GPS fix.
#[derive(Debug, Clone)]
pub struct LiveRecord {
    pub status: StatusRecord,
    pub gps: Option<TelemetryRecord>,
}

/// Fetch and normalize the live state of one tracker.
///
/// Returns `None` on an identity miss or a status-fetch failure; both mean
/// "skip this tracker for this cycle." A points-fetch failure keeps the
/// status portion and degrades to `gps: None`.
pub async fn fetch_live(
    api: &TrackerApi,
    resolver: &DeviceResolver,
    serial: &str,
) -> Option<LiveRecord> {
    let Some(device_id) = resolver.resolve(api, serial).await else {
        warn!(%serial, "serial not in identity cache, skipping");
        return None;
    };

    let payload = match api.device_status(device_id).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(%serial, device_id, error=%e, "status fetch failed, skipping tracker");
            return None;
        }
    };
    let status = normalize_status(serial, device_id, payload);

    // Points failures are isolated: the status portion survives them.
    let gps = match api.device_points(device_id).await {
        Ok(points) => normalize_points(serial, device_id, &points),
        Err(e) => {
            warn!(%serial, device_id, error=%e, "points fetch failed, keeping status without gps");
            None
        }
    };

    debug!(%serial, device_id, has_gps = gps.is_some(), "tracker fetched");
    Some(LiveRecord { status, gps })
}

fn normalize_status(serial: &str, device_id: i64, payload: StatusPayload) -> StatusRecord {
    let motion = payload.motion.as_deref().and_then(|raw| {
        let parsed = MotionState::parse_loose(raw);
        if parsed.is_none() {
            debug!(%serial, value = raw, "unrecognized motion value");
        }
        parsed
    });
    let mode = payload.mode.as_deref().and_then(|raw| {
        let parsed = TrackerMode::parse_loose(raw);
        if parsed.is_none() {
            debug!(%serial, value = raw, "unrecognized mode value");
        }
        parsed
    });
    let last_connection = payload.last_connection.as_deref().and_then(parse_timestamp);

    StatusRecord {
        serial: serial.to_string(),
        device_id,
        battery: payload.battery,
        temperature: payload.temperature,
        motion,
        mode,
        last_connection,
    }
}

/// Pick the newest usable point and normalize it.
///
/// Entries with an empty or unparseable timestamp never win the selection.
/// Ties go to the last entry encountered. The winner still needs a full
/// lat/lng pair; otherwise the whole cycle has no fix.
fn normalize_points(serial: &str, device_id: i64, points: &[RawPoint]) -> Option<TelemetryRecord> {
    let mut newest: Option<(DateTime<Utc>, &RawPoint)> = None;
    for point in points {
        let Some(raw_ts) = point.timestamp.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(ts) = parse_timestamp(raw_ts) else {
            debug!(%serial, timestamp = raw_ts, "point timestamp did not parse");
            continue;
        };
        match newest {
            Some((newest_ts, _)) if ts < newest_ts => {}
            _ => newest = Some((ts, point)),
        }
    }

    let Some((timestamp, point)) = newest else {
        debug!(%serial, total = points.len(), "no point with a usable timestamp");
        return None;
    };

    let location = point.location.as_ref()?;
    let (Some(latitude), Some(longitude)) = (location.lat, location.lng) else {
        debug!(%serial, "newest point has no coordinate pair, dropping fix");
        return None;
    };

    Some(TelemetryRecord {
        serial: serial.to_string(),
        device_id,
        timestamp,
        latitude,
        longitude,
        altitude: point.altitude,
        speed: point.speed,
        heading: point.course,
        accuracy: point.accuracy,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Some firmware revisions report naive UTC without an offset.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::api::RawLocation;

    use super::*;

    fn point(ts: Option<&str>, lat: Option<f64>, lng: Option<f64>) -> RawPoint {
        RawPoint {
            timestamp: ts.map(String::from),
            location: Some(RawLocation { lat, lng }),
            ..RawPoint::default()
        }
    }

    #[test]
    fn test_normalize_status_all_fields_missing() {
        let status = normalize_status("T-1", 10, StatusPayload::default());
        assert_eq!(status.serial, "T-1");
        assert_eq!(status.device_id, 10);
        assert_eq!(status.battery, None);
        assert_eq!(status.temperature, None);
        assert_eq!(status.motion, None);
        assert_eq!(status.mode, None);
        assert_eq!(status.last_connection, None);
    }

    #[test]
    fn test_normalize_status_maps_fields() {
        let payload = StatusPayload {
            battery: Some(80.0),
            temperature: Some(20.0),
            motion: Some("IDLE".to_string()),
            mode: Some("armed".to_string()),
            last_connection: Some("2024-01-01T12:00:00Z".to_string()),
        };
        let status = normalize_status("T-1", 10, payload);
        assert_eq!(status.motion, Some(MotionState::Idle));
        assert_eq!(status.mode, Some(TrackerMode::Armed));
        assert!(status.last_connection.is_some());
    }

    #[test]
    fn test_normalize_status_unknown_enum_values() {
        let payload = StatusPayload {
            motion: Some("wobbling".to_string()),
            mode: Some("???".to_string()),
            ..StatusPayload::default()
        };
        let status = normalize_status("T-1", 10, payload);
        assert_eq!(status.motion, None);
        assert_eq!(status.mode, None);
    }

    #[test]
    fn test_points_selection_picks_max_timestamp() {
        let points = vec![
            point(Some("2024-01-01T00:00:05Z"), Some(1.0), Some(1.0)),
            point(Some("2024-01-01T00:00:30Z"), Some(2.0), Some(2.0)),
            point(Some("2024-01-01T00:00:10Z"), Some(3.0), Some(3.0)),
        ];
        let fix = normalize_points("T-1", 10, &points).unwrap();
        assert_eq!(fix.latitude, 2.0);
        assert_eq!(fix.timestamp_iso(), "2024-01-01T00:00:30.000Z");
    }

    #[test]
    fn test_points_selection_tie_last_wins() {
        let points = vec![
            point(Some("2024-01-01T00:00:30Z"), Some(1.0), Some(1.0)),
            point(Some("2024-01-01T00:00:30Z"), Some(2.0), Some(2.0)),
        ];
        let fix = normalize_points("T-1", 10, &points).unwrap();
        assert_eq!(fix.latitude, 2.0);
    }

    #[test]
    fn test_points_empty_or_unparseable_means_no_fix() {
        assert!(normalize_points("T-1", 10, &[]).is_none());

        let points = vec![
            point(None, Some(1.0), Some(1.0)),
            point(Some(""), Some(2.0), Some(2.0)),
            point(Some("not-a-date"), Some(3.0), Some(3.0)),
        ];
        assert!(normalize_points("T-1", 10, &points).is_none());
    }

    #[test]
    fn test_points_newest_without_coordinates_drops_fix() {
        // The older point has coordinates, but selection happens before
        // validation and never falls back.
        let points = vec![
            point(Some("2024-01-01T00:00:05Z"), Some(1.0), Some(1.0)),
            point(Some("2024-01-01T00:00:30Z"), Some(2.0), None),
        ];
        assert!(normalize_points("T-1", 10, &points).is_none());

        let mut no_location = point(Some("2024-01-01T00:00:40Z"), None, None);
        no_location.location = None;
        assert!(normalize_points("T-1", 10, &[no_location]).is_none());
    }

    #[test]
    fn test_round_trip_normalization() {
        let raw = RawPoint {
            timestamp: Some("2024-01-01T00:00:00Z".to_string()),
            location: Some(RawLocation {
                lat: Some(1.5),
                lng: Some(-2.5),
            }),
            speed: Some(3.0),
            ..RawPoint::default()
        };
        let fix = normalize_points("T-7", 7, &[raw]).unwrap();
        assert_eq!(fix.latitude, 1.5);
        assert_eq!(fix.longitude, -2.5);
        assert_eq!(fix.speed, Some(3.0));
        assert_eq!(fix.altitude, None);
        assert_eq!(fix.heading, None);
        assert_eq!(fix.accuracy, None);
        assert_eq!(fix.timestamp_iso(), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_accepts_naive_utc() {
        assert!(parse_timestamp("2024-01-01T00:00:00Z").is_some());
        assert!(parse_timestamp("2024-01-01T00:00:00.250").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_fetch_live_identity_miss_returns_none() {
        let resolver = DeviceResolver::preloaded(HashMap::new());
        let api = TrackerApi::unreachable();
        assert!(fetch_live(&api, &resolver, "T-9").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_live_status_transport_failure_returns_none() {
        let resolver = DeviceResolver::preloaded(HashMap::from([("T-1".to_string(), 10)]));
        let api = TrackerApi::unreachable();
        assert!(fetch_live(&api, &resolver, "T-1").await.is_none());
    }
}
