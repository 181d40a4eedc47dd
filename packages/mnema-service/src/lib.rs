pub mod delete;
mod error;
pub mod search;
pub mod store;

pub use delete::{DeleteAllRequest, DeleteAllResponse};
pub use error::{Error, Result};
pub use search::{SearchItem, SearchRequest, SearchResponse};
pub use store::{StoreRequest, StoreResponse};

use std::sync::Arc;

use mnema_config::Config;
use mnema_providers::{EmbeddingProvider, HttpEmbedding};
use mnema_storage::{BlobStore, CollectionStore, dedup_policy};

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(HttpEmbedding) }
	}
}

/// The whole external surface of the memory subsystem: `store`, `search`,
/// and `delete_all`. Everything else is internal.
pub struct MemoryService {
	pub cfg: Config,
	pub collections: CollectionStore,
	pub providers: Providers,
}
impl MemoryService {
	pub fn new(cfg: Config, blob: Arc<dyn BlobStore>) -> Self {
		Self::with_providers(cfg, blob, Providers::default())
	}

	pub fn with_providers(cfg: Config, blob: Arc<dyn BlobStore>, providers: Providers) -> Self {
		let collections = CollectionStore::new(
			blob,
			cfg.providers.embedding.dimensions,
			dedup_policy(&cfg.memory),
		);

		Self { cfg, collections, providers }
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[text.to_string()])
			.await?;
		let Some(embedding) = embeddings.into_iter().next() else {
			return Err(Error::Embedding {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if embedding.len() != self.cfg.providers.embedding.dimensions as usize {
			return Err(Error::Embedding {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(embedding)
	}
}
