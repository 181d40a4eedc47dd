use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single fact about a user. The `id` doubles as the creation-time Unix
/// timestamp and as the recency tie-break during ranking and merging.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MemoryRecord {
	pub id: i64,
	pub content: String,
	pub importance: f32,
	pub category: String,
	#[serde(default)]
	pub topics: Vec<String>,
}

/// A record together with its embedding. The embedding belongs exclusively to
/// this record and is never shared.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MemoryEntry {
	pub data: MemoryRecord,
	pub embedding: Vec<f32>,
}

/// The full set of memories owned by one user key. Replaced as a whole on
/// every save; individual fields are never persisted independently.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MemoryCollection {
	pub memories: Vec<MemoryEntry>,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub last_deduplicated_at: Option<OffsetDateTime>,
}
impl MemoryCollection {
	pub fn empty(now: OffsetDateTime) -> Self {
		Self { memories: Vec::new(), updated_at: now, last_deduplicated_at: None }
	}

	/// Next record id: the current Unix timestamp, bumped past the newest
	/// existing id so that two stores within one second stay unique and keep
	/// recency ordering.
	pub fn next_id(&self, now: OffsetDateTime) -> i64 {
		let candidate = now.unix_timestamp();

		match self.memories.iter().map(|entry| entry.data.id).max() {
			Some(max) if candidate <= max => max + 1,
			_ => candidate,
		}
	}
}
