use std::{
	io,
	path::{Path, PathBuf},
};

use crate::{BoxFuture, Error, Result};

/// Opaque per-user byte-blob persistence. `put` must be a single
/// replace-style write: after a failed put the previous object is still
/// intact.
pub trait BlobStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;
	fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>>;
	/// Returns whether an object existed at `key`.
	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>>;
}

/// Filesystem-backed blob store. Keys map to paths under `root`; writes go
/// through a temp file and a rename so a crashed or failed put never leaves
/// a half-written object behind.
pub struct FsBlobStore {
	root: PathBuf,
}
impl FsBlobStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	fn path_for(&self, key: &str) -> PathBuf {
		self.root.join(key)
	}
}
impl BlobStore for FsBlobStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
		let path = self.path_for(key);

		Box::pin(async move {
			match tokio::fs::read(&path).await {
				Ok(bytes) => Ok(Some(bytes)),
				Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
				Err(err) => Err(Error::Persistence(format!(
					"Failed to read blob at {path:?}: {err}."
				))),
			}
		})
	}

	fn put<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>> {
		let path = self.path_for(key);

		Box::pin(async move {
			if let Some(parent) = path.parent() {
				tokio::fs::create_dir_all(parent).await.map_err(|err| {
					Error::Persistence(format!(
						"Failed to create blob directory at {parent:?}: {err}."
					))
				})?;
			}

			let tmp = tmp_path(&path);

			tokio::fs::write(&tmp, &bytes).await.map_err(|err| {
				Error::Persistence(format!("Failed to write blob at {tmp:?}: {err}."))
			})?;
			tokio::fs::rename(&tmp, &path).await.map_err(|err| {
				Error::Persistence(format!("Failed to replace blob at {path:?}: {err}."))
			})?;

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>> {
		let path = self.path_for(key);

		Box::pin(async move {
			match tokio::fs::remove_file(&path).await {
				Ok(()) => Ok(true),
				Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
				Err(err) => Err(Error::Persistence(format!(
					"Failed to delete blob at {path:?}: {err}."
				))),
			}
		})
	}
}

fn tmp_path(path: &Path) -> PathBuf {
	let mut tmp = path.as_os_str().to_os_string();

	tmp.push(".tmp");

	PathBuf::from(tmp)
}
