pub mod fix;
pub mod logging;
pub mod status;

pub use fix::TelemetryRecord;
pub use status::{MotionState, StatusRecord, TrackerMode};
