use serde::{Deserialize, Serialize};

use crate::{Error, MemoryService, Result};
use mnema_storage::NewMemory;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreRequest {
	pub user_key: String,
	pub content: String,
	#[serde(default = "default_importance")]
	pub importance: f32,
	#[serde(default = "default_category")]
	pub category: String,
	#[serde(default)]
	pub topics: Vec<String>,
}

fn default_importance() -> f32 {
	0.5
}

fn default_category() -> String {
	"general".to_string()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StoreResponse {
	pub id: i64,
	pub deduplicated: bool,
	pub removed: usize,
}

impl MemoryService {
	/// Store one fact. Validation happens before any I/O; the embedding is
	/// computed before anything is written, so a backend failure persists
	/// nothing.
	pub async fn store(&self, req: StoreRequest) -> Result<StoreResponse> {
		// Blank content is rejected, but content with deliberate surrounding
		// whitespace is persisted as given.
		if req.content.trim().is_empty() {
			return Err(Error::Validation { message: "content is required.".to_string() });
		}
		if !req.importance.is_finite() || !(0.0..=1.0).contains(&req.importance) {
			return Err(Error::Validation {
				message: "importance must be in the range 0.0-1.0.".to_string(),
			});
		}

		let embedding = self.embed_one(&req.content).await?;
		let outcome = self
			.collections
			.add(
				&req.user_key,
				NewMemory {
					content: req.content,
					importance: req.importance,
					category: req.category,
					topics: req.topics,
				},
				embedding,
			)
			.await?;

		tracing::debug!(
			user_key = req.user_key.as_str(),
			id = outcome.id,
			deduplicated = outcome.deduplicated,
			"Stored memory."
		);

		Ok(StoreResponse {
			id: outcome.id,
			deduplicated: outcome.deduplicated,
			removed: outcome.removed,
		})
	}
}
