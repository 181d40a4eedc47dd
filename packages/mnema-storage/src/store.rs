use std::sync::Arc;

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{BlobStore, Error, Result};
use mnema_domain::{
	MemoryCollection, MemoryEntry, MemoryRecord,
	dedup::{self, DedupPolicy},
	similarity,
};

/// Per-user blob key, mirroring the persisted layout
/// `{user-scope}/__long-memories/data.json`.
pub fn memory_blob_key(user_key: &str) -> Result<String> {
	let trimmed = user_key.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidArgument("User key must be non-empty.".to_string()));
	}
	if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
		return Err(Error::InvalidArgument(
			"User key must not contain path separators.".to_string(),
		));
	}

	Ok(format!("{trimmed}/__long-memories/data.json"))
}

pub fn dedup_policy(memory: &mnema_config::Memory) -> DedupPolicy {
	DedupPolicy {
		interval_hours: memory.dedup_interval_hours,
		similarity_threshold: memory.similarity_threshold,
		min_memories: memory.min_memories_for_dedup,
		neighbor_k: memory.neighbor_k,
	}
}

/// A record accepted for storage; the store assigns its id.
#[derive(Clone, Debug)]
pub struct NewMemory {
	pub content: String,
	pub importance: f32,
	pub category: String,
	pub topics: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct AddOutcome {
	pub id: i64,
	pub deduplicated: bool,
	pub removed: usize,
}

/// The only component that reads or writes persisted memory state, and the
/// sole owner of the process-wide cache.
///
/// The cache and lock table grow with the number of distinct user keys seen
/// by the process and are never evicted; that growth is an accepted
/// limitation of the design. Mutations for one user key are serialized
/// through the per-key lock; different user keys proceed in parallel. There
/// is no cross-process exclusion: when several processes write the same
/// user's data, the last successful save wins.
pub struct CollectionStore {
	blob: Arc<dyn BlobStore>,
	dimensions: u32,
	policy: DedupPolicy,
	cache: DashMap<String, MemoryCollection>,
	locks: DashMap<String, Arc<Mutex<()>>>,
}
impl CollectionStore {
	pub fn new(blob: Arc<dyn BlobStore>, dimensions: u32, policy: DedupPolicy) -> Self {
		Self { blob, dimensions, policy, cache: DashMap::new(), locks: DashMap::new() }
	}

	fn user_lock(&self, user_key: &str) -> Arc<Mutex<()>> {
		self.locks.entry(user_key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
	}

	/// Cached copy if present; otherwise the persisted blob; otherwise a
	/// fresh empty collection (a new user is not an error).
	///
	/// Lock-free callers never write the cache: a snapshot fetched outside
	/// the user lock may predate a save that completed in the meantime, and
	/// inserting it would hide that save from the next mutation. Only the
	/// locked paths populate the cache.
	pub async fn load(&self, user_key: &str) -> Result<MemoryCollection> {
		let blob_key = memory_blob_key(user_key)?;

		if let Some(cached) = self.cache.get(&blob_key) {
			return Ok(cached.clone());
		}

		self.fetch(&blob_key).await
	}

	/// Cache-miss load for mutations. Caller must hold the user lock, so the
	/// fetched snapshot cannot race a save and is safe to cache.
	async fn load_for_update(&self, blob_key: &str) -> Result<MemoryCollection> {
		if let Some(cached) = self.cache.get(blob_key) {
			return Ok(cached.clone());
		}

		let collection = self.fetch(blob_key).await?;

		self.cache.insert(blob_key.to_string(), collection.clone());

		Ok(collection)
	}

	/// Full-collection replace. The cache is only updated after the blob
	/// write succeeds, so a failed save leaves both disk and cache exactly
	/// as they were.
	pub async fn save(&self, user_key: &str, mut collection: MemoryCollection) -> Result<()> {
		let blob_key = memory_blob_key(user_key)?;

		collection.updated_at = OffsetDateTime::now_utc();

		let bytes = serde_json::to_vec(&collection).map_err(|err| {
			Error::Persistence(format!("Failed to serialize memory collection: {err}."))
		})?;

		self.blob.put(&blob_key, bytes).await?;
		self.cache.insert(blob_key, collection);

		Ok(())
	}

	/// Append a new record under the user lock, run the deduplication pass
	/// when its trigger fires, then save. All-or-nothing: nothing is
	/// persisted until the full new collection is computed.
	pub async fn add(
		&self,
		user_key: &str,
		memory: NewMemory,
		embedding: Vec<f32>,
	) -> Result<AddOutcome> {
		if embedding.len() != self.dimensions as usize {
			return Err(Error::InvalidArgument(format!(
				"Embedding dimension {} does not match the configured {}.",
				embedding.len(),
				self.dimensions,
			)));
		}

		let blob_key = memory_blob_key(user_key)?;
		let lock = self.user_lock(user_key);
		let _guard = lock.lock().await;
		let mut collection = self.load_for_update(&blob_key).await?;
		let now = OffsetDateTime::now_utc();
		let id = collection.next_id(now);

		collection.memories.push(MemoryEntry {
			data: MemoryRecord {
				id,
				content: memory.content,
				importance: memory.importance,
				category: memory.category,
				topics: memory.topics,
			},
			embedding,
		});

		let mut outcome = AddOutcome { id, deduplicated: false, removed: 0 };

		if dedup::should_run(&collection, now, &self.policy) {
			outcome.removed = dedup::run(&mut collection, now, &self.policy);
			outcome.deduplicated = true;

			tracing::info!(user_key, removed = outcome.removed, "Deduplication pass completed.");
		}

		self.save(user_key, collection).await?;

		Ok(outcome)
	}

	/// Irreversible: removes the persisted blob and the cache entry. Fails
	/// with `NotFound` when nothing was ever persisted for the user.
	pub async fn delete_all(&self, user_key: &str) -> Result<()> {
		let blob_key = memory_blob_key(user_key)?;
		let lock = self.user_lock(user_key);
		let _guard = lock.lock().await;
		let existed = self.blob.delete(&blob_key).await?;

		if !existed {
			return Err(Error::NotFound(format!("No memories exist for user {user_key}.")));
		}

		self.cache.remove(&blob_key);

		tracing::info!(user_key, "Deleted all memories.");

		Ok(())
	}

	/// Rank the user's memories against a query embedding. Read-only; does
	/// not take the user lock.
	pub async fn rank(
		&self,
		user_key: &str,
		query: &[f32],
		top_k: usize,
	) -> Result<Vec<(MemoryRecord, f32)>> {
		let collection = self.load(user_key).await?;
		let ranked = similarity::top_k(&collection.memories, query, top_k);

		Ok(ranked
			.into_iter()
			.map(|r| (collection.memories[r.index].data.clone(), r.score))
			.collect())
	}

	async fn fetch(&self, blob_key: &str) -> Result<MemoryCollection> {
		let Some(bytes) = self.blob.get(blob_key).await? else {
			return Ok(MemoryCollection::empty(OffsetDateTime::now_utc()));
		};
		let collection: MemoryCollection = serde_json::from_slice(&bytes).map_err(|err| {
			Error::CorruptData(format!("Failed to parse memory collection: {err}."))
		})?;

		self.validate_dimensions(&collection)?;

		Ok(collection)
	}

	fn validate_dimensions(&self, collection: &MemoryCollection) -> Result<()> {
		for entry in &collection.memories {
			if entry.embedding.len() != self.dimensions as usize {
				return Err(Error::CorruptData(format!(
					"Record {} has embedding dimension {}, expected {}.",
					entry.data.id,
					entry.embedding.len(),
					self.dimensions,
				)));
			}
		}

		Ok(())
	}
}
