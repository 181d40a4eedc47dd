use std::{cmp::Ordering, collections::HashSet};

use time::{Duration, OffsetDateTime};

use crate::{
	record::{MemoryCollection, MemoryRecord},
	similarity,
};

/// Importance values closer than this are treated as equal when picking a
/// merge survivor.
pub const IMPORTANCE_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug)]
pub struct DedupPolicy {
	/// Minimum hours between runs.
	pub interval_hours: i64,
	/// Exclusive: a pair at exactly this similarity is not a duplicate.
	pub similarity_threshold: f32,
	/// Collection size that must be exceeded before a run triggers.
	pub min_memories: usize,
	/// Nearest neighbors consulted per record.
	pub neighbor_k: usize,
}
impl Default for DedupPolicy {
	fn default() -> Self {
		Self { interval_hours: 24, similarity_threshold: 0.75, min_memories: 10, neighbor_k: 5 }
	}
}

/// Trigger rule evaluated before each add-triggered save. A false trigger
/// means the engine is not called at all, so a small or freshly-compacted
/// collection is never mutated.
pub fn should_run(
	collection: &MemoryCollection,
	now: OffsetDateTime,
	policy: &DedupPolicy,
) -> bool {
	if collection.memories.len() <= policy.min_memories {
		return false;
	}

	match collection.last_deduplicated_at {
		None => true,
		Some(last) => now - last > Duration::hours(policy.interval_hours),
	}
}

/// One compaction pass. Deterministic: qualifying pairs are processed in
/// similarity order with first-match-wins resolution, so overlapping clusters
/// of three or more records resolve the same way every time. Always stamps
/// `last_deduplicated_at`, even when nothing qualified. Returns the number of
/// records removed.
pub fn run(collection: &mut MemoryCollection, now: OffsetDateTime, policy: &DedupPolicy) -> usize {
	let resolutions = resolve_pairs(collection, policy);
	let mut remove = vec![false; collection.memories.len()];

	for resolution in resolutions {
		match resolution {
			Resolution::Remove { index } => remove[index] = true,
			Resolution::Merge { keep, absorb } => {
				let merged = merge_records(
					&collection.memories[keep].data,
					&collection.memories[absorb].data,
				);

				collection.memories[keep].data = merged;
				remove[absorb] = true;
			},
		}
	}

	let removed = remove.iter().filter(|flag| **flag).count();

	if removed > 0 {
		let mut index = 0;

		collection.memories.retain(|_| {
			let keep = !remove[index];

			index += 1;

			keep
		});
	}

	collection.last_deduplicated_at = Some(now);

	removed
}

#[derive(Clone, Copy, Debug)]
enum Resolution {
	Remove { index: usize },
	Merge { keep: usize, absorb: usize },
}

#[derive(Clone, Copy, Debug)]
struct DuplicatePair {
	/// Member earlier in collection order.
	first: usize,
	/// Member later in collection order.
	second: usize,
	score: f32,
}

fn resolve_pairs(collection: &MemoryCollection, policy: &DedupPolicy) -> Vec<Resolution> {
	let entries = &collection.memories;
	let pairs = collect_duplicate_pairs(collection, policy);
	let mut resolved = vec![false; entries.len()];
	let mut resolutions = Vec::new();

	for pair in pairs {
		if resolved[pair.first] || resolved[pair.second] {
			continue;
		}

		resolved[pair.first] = true;
		resolved[pair.second] = true;

		let first_importance = entries[pair.first].data.importance;
		let second_importance = entries[pair.second].data.importance;

		if (first_importance - second_importance).abs() <= IMPORTANCE_EPSILON {
			resolutions.push(Resolution::Merge { keep: pair.first, absorb: pair.second });
		} else if first_importance > second_importance {
			resolutions.push(Resolution::Remove { index: pair.second });
		} else {
			resolutions.push(Resolution::Remove { index: pair.first });
		}
	}

	resolutions
}

fn collect_duplicate_pairs(
	collection: &MemoryCollection,
	policy: &DedupPolicy,
) -> Vec<DuplicatePair> {
	let entries = &collection.memories;
	let mut seen: HashSet<(usize, usize)> = HashSet::new();
	let mut pairs = Vec::new();

	for index in 0..entries.len() {
		for neighbor in similarity::nearest_neighbors(entries, index, policy.neighbor_k) {
			// Strictly greater: a similarity of exactly the threshold does
			// not qualify.
			if neighbor.score <= policy.similarity_threshold {
				continue;
			}

			let (first, second) =
				if index < neighbor.index { (index, neighbor.index) } else { (neighbor.index, index) };

			if !seen.insert((first, second)) {
				continue;
			}

			pairs.push(DuplicatePair { first, second, score: neighbor.score });
		}
	}

	pairs.sort_by(|a, b| {
		let ord = similarity::cmp_f32_desc(a.score, b.score);

		if ord != Ordering::Equal {
			return ord;
		}

		let combined_a =
			entries[a.first].data.importance + entries[a.second].data.importance;
		let combined_b =
			entries[b.first].data.importance + entries[b.second].data.importance;
		let ord = similarity::cmp_f32_desc(combined_a, combined_b);

		if ord != Ordering::Equal {
			return ord;
		}

		min_id(entries, a).cmp(&min_id(entries, b))
	});

	pairs
}

fn min_id(entries: &[crate::record::MemoryEntry], pair: &DuplicatePair) -> i64 {
	entries[pair.first].data.id.min(entries[pair.second].data.id)
}

/// Equal-importance merge: concatenated content, order-preserving topic
/// union, the more recent id, and the first record's category. The merged
/// record keeps the first record's embedding slot.
fn merge_records(first: &MemoryRecord, second: &MemoryRecord) -> MemoryRecord {
	let mut topics = first.topics.clone();

	for topic in &second.topics {
		if !topics.contains(topic) {
			topics.push(topic.clone());
		}
	}

	MemoryRecord {
		id: first.id.max(second.id),
		content: format!("{}. {}", first.content, second.content),
		importance: first.importance,
		category: first.category.clone(),
		topics,
	}
}
