use serde::{Deserialize, Serialize};

use crate::{Error, MemoryService, Result};
use mnema_domain::MemoryRecord;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub user_key: String,
	pub query: String,
	/// Defaults to `memory.default_top_k` when omitted.
	#[serde(default)]
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	pub record: MemoryRecord,
	pub score: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
}

impl MemoryService {
	/// Rank the user's memories against a natural-language query. An
	/// unknown user or empty collection yields an empty result, not an
	/// error.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let top_k = req.top_k.unwrap_or(self.cfg.memory.default_top_k);

		if top_k < 1 || top_k > self.cfg.memory.max_top_k {
			return Err(Error::Validation {
				message: format!(
					"top_k must be in the range 1-{}.",
					self.cfg.memory.max_top_k
				),
			});
		}

		let query = self.embed_one(&req.query).await?;
		let ranked = self.collections.rank(&req.user_key, &query, top_k as usize).await?;

		tracing::debug!(
			user_key = req.user_key.as_str(),
			results = ranked.len(),
			"Searched memories."
		);

		Ok(SearchResponse {
			items: ranked.into_iter().map(|(record, score)| SearchItem { record, score }).collect(),
		})
	}
}
