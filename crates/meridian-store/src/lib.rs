pub mod memory;
pub mod postgres;
pub mod types;

pub use memory::MemoryTrackerStore;
pub use postgres::PgTrackerStore;
pub use types::TrackerStore;
