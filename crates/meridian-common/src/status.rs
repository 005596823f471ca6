use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Idle,
    Moving,
}

impl MotionState {
    /// Decode an upstream motion string. Unknown values are a miss, not an
    /// error; different firmware revisions spell these differently.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idle" | "static" | "stationary" => Some(Self::Idle),
            "moving" | "motion" | "in_motion" => Some(Self::Moving),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Moving => "moving",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerMode {
    Armed,
    Disarmed,
    Sleep,
}

impl TrackerMode {
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "armed" | "arm" => Some(Self::Armed),
            "disarmed" | "disarm" => Some(Self::Disarmed),
            "sleep" | "sleeping" | "standby" => Some(Self::Sleep),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Armed => "armed",
            Self::Disarmed => "disarmed",
            Self::Sleep => "sleep",
        }
    }
}

/// Non-positional health fields for one tracker, produced fresh every poll
/// cycle and compared against the last persisted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub serial: String,
    pub device_id: i64,
    pub battery: Option<f64>,
    pub temperature: Option<f64>,
    pub motion: Option<MotionState>,
    pub mode: Option<TrackerMode>,
    pub last_connection: Option<DateTime<Utc>>,
}

impl StatusRecord {
    /// True when the four mutable fields match. `last_connection` moves on
    /// every poll and must never count as a change by itself.
    pub fn same_state(&self, other: &Self) -> bool {
        self.battery == other.battery
            && self.temperature == other.temperature
            && self.motion == other.motion
            && self.mode == other.mode
    }
}
