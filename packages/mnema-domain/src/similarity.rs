use std::cmp::Ordering;

use crate::record::MemoryEntry;

/// One ranked entry: its position in the collection, its record id, and the
/// cosine similarity that placed it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranked {
	pub index: usize,
	pub id: i64,
	pub score: f32,
}

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Brute-force scan ranking every entry against `query` by cosine similarity,
/// descending. Ties prefer higher importance, then higher id (most recent).
/// Entries whose similarity is undefined (zero-norm or mismatched embedding)
/// are omitted. `k` larger than the collection returns everything ranked.
pub fn top_k(entries: &[MemoryEntry], query: &[f32], k: usize) -> Vec<Ranked> {
	let mut ranked = rank_all(entries, query, None);

	ranked.truncate(k);

	ranked
}

/// The `k` nearest neighbors of the entry at `index`, self excluded. Used by
/// the deduplication pass.
pub fn nearest_neighbors(entries: &[MemoryEntry], index: usize, k: usize) -> Vec<Ranked> {
	let Some(entry) = entries.get(index) else {
		return Vec::new();
	};
	let mut ranked = rank_all(entries, &entry.embedding, Some(index));

	ranked.truncate(k);

	ranked
}

fn rank_all(entries: &[MemoryEntry], query: &[f32], exclude: Option<usize>) -> Vec<Ranked> {
	let mut ranked: Vec<Ranked> = entries
		.iter()
		.enumerate()
		.filter(|(index, _)| Some(*index) != exclude)
		.filter_map(|(index, entry)| {
			cosine_similarity(&entry.embedding, query)
				.map(|score| Ranked { index, id: entry.data.id, score })
		})
		.collect();

	ranked.sort_by(|a, b| {
		let ord = cmp_f32_desc(a.score, b.score);

		if ord != Ordering::Equal {
			return ord;
		}

		let ord =
			cmp_f32_desc(entries[a.index].data.importance, entries[b.index].data.importance);

		if ord != Ordering::Equal {
			return ord;
		}

		b.id.cmp(&a.id)
	});

	ranked
}
