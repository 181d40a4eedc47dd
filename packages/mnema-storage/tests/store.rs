use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use mnema_domain::{MemoryCollection, MemoryEntry, MemoryRecord};
use mnema_storage::{
	BlobStore, CollectionStore, Error, FsBlobStore, NewMemory, dedup_policy, memory_blob_key,
};
use mnema_testkit::{FailingBlobStore, MemoryBlobStore, test_memory_config};

const DIMS: u32 = 4;

fn new_store(blob: Arc<dyn BlobStore>) -> CollectionStore {
	CollectionStore::new(blob, DIMS, dedup_policy(&test_memory_config()))
}

fn new_memory(content: &str, importance: f32) -> NewMemory {
	NewMemory {
		content: content.to_string(),
		importance,
		category: "general".to_string(),
		topics: vec![],
	}
}

fn unit_x() -> Vec<f32> {
	vec![1.0, 0.0, 0.0, 0.0]
}

#[tokio::test]
async fn fs_blob_store_round_trips_and_deletes() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let blob = FsBlobStore::new(dir.path());
	let key = memory_blob_key("user-1").expect("valid key");

	assert_eq!(blob.get(&key).await.expect("get"), None);

	blob.put(&key, b"payload".to_vec()).await.expect("put");

	assert_eq!(blob.get(&key).await.expect("get"), Some(b"payload".to_vec()));

	blob.put(&key, b"replaced".to_vec()).await.expect("put");

	assert_eq!(blob.get(&key).await.expect("get"), Some(b"replaced".to_vec()));
	assert!(blob.delete(&key).await.expect("delete"));
	assert!(!blob.delete(&key).await.expect("delete"));
	assert_eq!(blob.get(&key).await.expect("get"), None);
}

#[tokio::test]
async fn save_then_load_round_trips_the_collection() {
	let blob: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
	let store = new_store(blob.clone());
	let collection = MemoryCollection {
		memories: vec![MemoryEntry {
			data: MemoryRecord {
				id: 1,
				content: "User lives in Paris, France".to_string(),
				importance: 0.9,
				category: "personal_info".to_string(),
				topics: vec!["home".to_string(), "location".to_string()],
			},
			embedding: vec![0.1, 0.2, 0.3, 0.4],
		}],
		updated_at: OffsetDateTime::now_utc(),
		last_deduplicated_at: None,
	};

	store.save("user-1", collection.clone()).await.expect("save");

	// A fresh store over the same blobs bypasses the first store's cache.
	let cold = new_store(blob);
	let loaded = cold.load("user-1").await.expect("load");

	assert_eq!(loaded.memories.len(), 1);
	assert_eq!(loaded.memories[0].data, collection.memories[0].data);

	for (a, b) in
		loaded.memories[0].embedding.iter().zip(collection.memories[0].embedding.iter())
	{
		assert!((a - b).abs() < 1e-6);
	}
}

#[tokio::test]
async fn loading_an_absent_user_yields_an_empty_collection() {
	let store = new_store(Arc::new(MemoryBlobStore::new()));
	let loaded = store.load("nobody").await.expect("load");

	assert!(loaded.memories.is_empty());
	assert_eq!(loaded.last_deduplicated_at, None);
}

#[tokio::test]
async fn malformed_blob_is_corrupt_data() {
	let blob = Arc::new(MemoryBlobStore::new());
	let key = memory_blob_key("user-1").expect("valid key");

	blob.insert_raw(&key, b"not json".to_vec());

	let store = new_store(blob);
	let err = store.load("user-1").await.expect_err("Expected a corrupt-data error.");

	assert!(matches!(err, Error::CorruptData(_)));
}

#[tokio::test]
async fn wrong_embedding_dimension_is_corrupt_data() {
	let blob: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
	let seed = new_store(blob.clone());
	let collection = MemoryCollection {
		memories: vec![MemoryEntry {
			data: MemoryRecord {
				id: 1,
				content: "short vector".to_string(),
				importance: 0.5,
				category: "general".to_string(),
				topics: vec![],
			},
			embedding: vec![1.0, 0.0],
		}],
		updated_at: OffsetDateTime::now_utc(),
		last_deduplicated_at: None,
	};

	// Written with a permissive dimension, read back with the configured one.
	CollectionStore::new(blob.clone(), 2, dedup_policy(&test_memory_config()))
		.save("user-1", collection)
		.await
		.expect("save");

	let err = seed.load("user-1").await.expect_err("Expected a corrupt-data error.");

	assert!(matches!(err, Error::CorruptData(_)));
}

#[tokio::test]
async fn add_assigns_unique_ids_and_persists() {
	let store = new_store(Arc::new(MemoryBlobStore::new()));
	let first = store.add("user-1", new_memory("a", 0.5), unit_x()).await.expect("add");
	let second =
		store.add("user-1", new_memory("b", 0.5), vec![0.0, 1.0, 0.0, 0.0]).await.expect("add");

	assert!(second.id > first.id);

	let loaded = store.load("user-1").await.expect("load");

	assert_eq!(loaded.memories.len(), 2);
}

#[tokio::test]
async fn add_rejects_a_mismatched_embedding() {
	let store = new_store(Arc::new(MemoryBlobStore::new()));
	let err = store
		.add("user-1", new_memory("a", 0.5), vec![1.0, 0.0])
		.await
		.expect_err("Expected an invalid-argument error.");

	assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn add_runs_dedup_when_the_trigger_fires() {
	let blob: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
	// Wide dimension so the seed entries can be pairwise orthogonal.
	let store = CollectionStore::new(blob, 12, dedup_policy(&test_memory_config()));
	let now = OffsetDateTime::now_utc();
	let mut memories = Vec::new();

	for i in 0..11 {
		let mut embedding = vec![0.0_f32; 12];

		embedding[i] = 1.0;
		memories.push(MemoryEntry {
			data: MemoryRecord {
				id: i as i64 + 1,
				content: format!("fact {i}"),
				importance: 0.5,
				category: "general".to_string(),
				topics: vec![],
			},
			embedding,
		});
	}

	let seeded = MemoryCollection {
		memories,
		updated_at: now,
		last_deduplicated_at: Some(now - Duration::hours(25)),
	};

	store.save("user-1", seeded).await.expect("save");

	let mut embedding = vec![0.0_f32; 12];

	embedding[11] = 1.0;

	let outcome = store.add("user-1", new_memory("fact 11", 0.5), embedding).await.expect("add");

	assert!(outcome.deduplicated);
	assert_eq!(outcome.removed, 0);

	let loaded = store.load("user-1").await.expect("load");

	assert_eq!(loaded.memories.len(), 12);
	assert!(loaded.last_deduplicated_at.expect("stamped") > now - Duration::minutes(1));
}

#[tokio::test]
async fn add_skips_dedup_below_the_size_threshold() {
	let store = new_store(Arc::new(MemoryBlobStore::new()));

	for i in 0..5 {
		let outcome = store
			.add("user-1", new_memory(&format!("fact {i}"), 0.5), unit_x())
			.await
			.expect("add");

		assert!(!outcome.deduplicated);
	}

	let loaded = store.load("user-1").await.expect("load");

	assert_eq!(loaded.memories.len(), 5);
	assert_eq!(loaded.last_deduplicated_at, None);
}

#[tokio::test]
async fn failed_save_leaves_cache_and_disk_untouched() {
	let inner: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
	let failing = Arc::new(FailingBlobStore::new(inner.clone()));
	let store = new_store(failing.clone());

	store.add("user-1", new_memory("kept", 0.9), unit_x()).await.expect("add");

	let key = memory_blob_key("user-1").expect("valid key");
	let before = inner.raw(&key).expect("blob present");

	failing.fail_puts(true);

	let err = store
		.add("user-1", new_memory("lost", 0.1), unit_x())
		.await
		.expect_err("Expected a persistence error.");

	assert!(matches!(err, Error::Persistence(_)));

	// Cache still serves the last successful state, disk is unchanged.
	let loaded = store.load("user-1").await.expect("load");

	assert_eq!(loaded.memories.len(), 1);
	assert_eq!(loaded.memories[0].data.content, "kept");
	assert_eq!(inner.raw(&key).expect("blob present"), before);
}

#[tokio::test]
async fn delete_all_fails_for_an_unknown_user_and_succeeds_once() {
	let store = new_store(Arc::new(MemoryBlobStore::new()));
	let err = store.delete_all("user-1").await.expect_err("Expected not-found.");

	assert!(matches!(err, Error::NotFound(_)));

	store.add("user-1", new_memory("a", 0.5), unit_x()).await.expect("add");
	store.delete_all("user-1").await.expect("delete_all");

	let err = store.delete_all("user-1").await.expect_err("Expected not-found.");

	assert!(matches!(err, Error::NotFound(_)));

	// The collection is gone, not emptied in place.
	let loaded = store.load("user-1").await.expect("load");

	assert!(loaded.memories.is_empty());
}

#[tokio::test]
async fn concurrent_adds_for_one_user_lose_nothing() {
	let store = Arc::new(new_store(Arc::new(MemoryBlobStore::new())));
	let a = {
		let store = store.clone();

		tokio::spawn(async move {
			store.add("user-1", new_memory("first", 0.5), vec![1.0, 0.0, 0.0, 0.0]).await
		})
	};
	let b = {
		let store = store.clone();

		tokio::spawn(async move {
			store.add("user-1", new_memory("second", 0.5), vec![0.0, 1.0, 0.0, 0.0]).await
		})
	};

	a.await.expect("join").expect("add");
	b.await.expect("join").expect("add");

	let loaded = store.load("user-1").await.expect("load");

	assert_eq!(loaded.memories.len(), 2);
}

#[tokio::test]
async fn search_loads_never_populate_the_cache() {
	let blob: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
	let writer = new_store(blob.clone());

	writer.add("user-1", new_memory("first", 0.5), vec![1.0, 0.0, 0.0, 0.0]).await.expect("add");

	// A second store over the same blobs, standing in for a reader whose
	// fetched snapshot lands after a save it did not observe.
	let reader = new_store(blob.clone());

	reader.rank("user-1", &[1.0, 0.0, 0.0, 0.0], 1).await.expect("rank");
	writer.add("user-1", new_memory("second", 0.5), vec![0.0, 1.0, 0.0, 0.0]).await.expect("add");

	// If the rank had cached its one-record snapshot, this add would build on
	// it and persist a collection without "second".
	reader.add("user-1", new_memory("third", 0.5), vec![0.0, 0.0, 1.0, 0.0]).await.expect("add");

	let persisted = new_store(blob).load("user-1").await.expect("load");
	let contents: Vec<_> =
		persisted.memories.iter().map(|entry| entry.data.content.as_str()).collect();

	assert_eq!(contents, ["first", "second", "third"]);
}

#[tokio::test]
async fn rank_returns_descending_similarity() {
	// Closely-angled vectors would qualify as duplicates, so keep the
	// compaction trigger out of reach.
	let mut memory = test_memory_config();

	memory.min_memories_for_dedup = 100;

	let store = CollectionStore::new(Arc::new(MemoryBlobStore::new()), DIMS, dedup_policy(&memory));

	for i in 0..20 {
		let angle = i as f32 * 0.05;

		store
			.add(
				"user-1",
				new_memory(&format!("fact {i}"), 0.5),
				vec![angle.cos(), angle.sin(), 0.0, 0.0],
			)
			.await
			.expect("add");
	}

	let ranked = store.rank("user-1", &[1.0, 0.0, 0.0, 0.0], 3).await.expect("rank");

	assert_eq!(ranked.len(), 3);
	assert_eq!(ranked[0].0.content, "fact 0");
	assert!(ranked[0].1 >= ranked[1].1);
	assert!(ranked[1].1 >= ranked[2].1);
}
