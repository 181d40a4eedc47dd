use serde::{Deserialize, Serialize};

use crate::{MemoryService, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteAllRequest {
	pub user_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteAllResponse {
	pub user_key: String,
}

impl MemoryService {
	/// Destroy every memory for the user. Irreversible; fails with
	/// `NotFound` when nothing was ever persisted.
	pub async fn delete_all(&self, req: DeleteAllRequest) -> Result<DeleteAllResponse> {
		self.collections.delete_all(&req.user_key).await?;

		Ok(DeleteAllResponse { user_key: req.user_key })
	}
}
