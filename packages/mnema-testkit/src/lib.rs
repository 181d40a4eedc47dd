//! Shared fixtures for in-process tests: an in-memory blob store, a
//! failure-injecting blob store, a deterministic stub embedder, and a config
//! builder. Nothing here talks to the network.

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use dashmap::DashMap;

use mnema_config::{Config, EmbeddingProviderConfig, Memory, Providers, Service, Storage};
use mnema_providers::{BoxFuture as ProviderFuture, EmbeddingProvider};
use mnema_storage::{BlobStore, BoxFuture, Error, Result};

/// Blob store backed by a process-local map.
#[derive(Default)]
pub struct MemoryBlobStore {
	blobs: DashMap<String, Vec<u8>>,
}
impl MemoryBlobStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.blobs.contains_key(key)
	}

	pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
		self.blobs.get(key).map(|bytes| bytes.clone())
	}

	pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
		self.blobs.insert(key.to_string(), bytes);
	}
}
impl BlobStore for MemoryBlobStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
		let bytes = self.blobs.get(key).map(|b| b.clone());

		Box::pin(async move { Ok(bytes) })
	}

	fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>> {
		self.blobs.insert(key.to_string(), bytes);

		Box::pin(async move { Ok(()) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>> {
		let existed = self.blobs.remove(key).is_some();

		Box::pin(async move { Ok(existed) })
	}
}

/// Wraps another blob store and fails every put while the switch is on, for
/// exercising save-failure consistency.
pub struct FailingBlobStore {
	inner: Arc<dyn BlobStore>,
	fail_puts: AtomicBool,
}
impl FailingBlobStore {
	pub fn new(inner: Arc<dyn BlobStore>) -> Self {
		Self { inner, fail_puts: AtomicBool::new(false) }
	}

	pub fn fail_puts(&self, fail: bool) {
		self.fail_puts.store(fail, Ordering::SeqCst);
	}
}
impl BlobStore for FailingBlobStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
		self.inner.get(key)
	}

	fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>> {
		if self.fail_puts.load(Ordering::SeqCst) {
			return Box::pin(async move {
				Err(Error::Persistence("Injected put failure.".to_string()))
			});
		}

		self.inner.put(key, bytes)
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>> {
		self.inner.delete(key)
	}
}

/// Deterministic embedder: programmed vectors per text, with a hash-derived
/// unit vector as the fallback so unprogrammed texts still embed stably.
#[derive(Default)]
pub struct StubEmbedding {
	programmed: Mutex<HashMap<String, Vec<f32>>>,
}
impl StubEmbedding {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn program(&self, text: &str, vector: Vec<f32>) {
		self.programmed
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(text.to_string(), vector);
	}

	fn vector_for(&self, text: &str, dimensions: usize) -> Vec<f32> {
		if let Some(vector) =
			self.programmed.lock().unwrap_or_else(|err| err.into_inner()).get(text)
		{
			return vector.clone();
		}

		fallback_vector(text, dimensions)
	}
}
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> ProviderFuture<'a, mnema_providers::Result<Vec<Vec<f32>>>> {
		let dimensions = cfg.dimensions as usize;
		let vectors =
			texts.iter().map(|text| self.vector_for(text, dimensions)).collect::<Vec<_>>();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Embedder that always fails, for exercising the all-or-nothing store path.
pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> ProviderFuture<'a, mnema_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Err(mnema_providers::Error::InvalidResponse {
				message: "Embedding backend unavailable.".to_string(),
			})
		})
	}
}

fn fallback_vector(text: &str, dimensions: usize) -> Vec<f32> {
	let mut state = 0xcbf2_9ce4_8422_2325_u64;

	for byte in text.bytes() {
		state ^= u64::from(byte);
		state = state.wrapping_mul(0x100_0000_01b3);
	}

	let mut vector = Vec::with_capacity(dimensions);

	for _ in 0..dimensions.max(1) {
		state ^= state << 13;
		state ^= state >> 7;
		state ^= state << 17;
		vector.push((state as f32 / u64::MAX as f32) - 0.5);
	}

	let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);

	vector.iter_mut().for_each(|v| *v /= norm);

	vector
}

pub fn test_config(dimensions: u32) -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage { root: "/tmp/mnema-test".to_string() },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "stub".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "stub".to_string(),
				dimensions,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
		},
		memory: test_memory_config(),
	}
}

pub fn test_memory_config() -> Memory {
	Memory {
		dedup_interval_hours: 24,
		similarity_threshold: 0.75,
		min_memories_for_dedup: 10,
		neighbor_k: 5,
		default_top_k: 5,
		max_top_k: 20,
	}
}
