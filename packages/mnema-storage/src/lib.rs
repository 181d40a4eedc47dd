pub mod blob;
mod error;
pub mod store;

pub use blob::{BlobStore, FsBlobStore};
pub use error::{Error, Result};
pub use store::{AddOutcome, CollectionStore, NewMemory, dedup_policy, memory_blob_key};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
