pub mod dedup;
pub mod record;
pub mod similarity;
pub mod time_serde;

pub use record::{MemoryCollection, MemoryEntry, MemoryRecord};
