use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub memory: Memory,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	/// Root directory for per-user memory blobs.
	pub root: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Memory {
	/// Minimum hours between deduplication runs.
	#[serde(default = "default_dedup_interval_hours")]
	pub dedup_interval_hours: i64,
	/// Exclusive cosine-similarity threshold above which two records are duplicates.
	#[serde(default = "default_similarity_threshold")]
	pub similarity_threshold: f32,
	/// Collection size that must be exceeded before deduplication runs.
	#[serde(default = "default_min_memories_for_dedup")]
	pub min_memories_for_dedup: usize,
	/// Nearest neighbors consulted per record during deduplication.
	#[serde(default = "default_neighbor_k")]
	pub neighbor_k: usize,
	#[serde(default = "default_top_k")]
	pub default_top_k: u32,
	#[serde(default = "default_max_top_k")]
	pub max_top_k: u32,
}

fn default_dedup_interval_hours() -> i64 {
	24
}

fn default_similarity_threshold() -> f32 {
	0.75
}

fn default_min_memories_for_dedup() -> usize {
	10
}

fn default_neighbor_k() -> usize {
	5
}

fn default_top_k() -> u32 {
	5
}

fn default_max_top_k() -> u32 {
	20
}
