#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Corrupt data: {message}")]
	CorruptData { message: String },
	#[error("Persistence error: {message}")]
	Persistence { message: String },
	#[error("Embedding error: {message}")]
	Embedding { message: String },
}
impl From<mnema_storage::Error> for Error {
	fn from(err: mnema_storage::Error) -> Self {
		match err {
			mnema_storage::Error::InvalidArgument(message) => Self::Validation { message },
			mnema_storage::Error::NotFound(message) => Self::NotFound { message },
			mnema_storage::Error::CorruptData(message) => Self::CorruptData { message },
			mnema_storage::Error::Persistence(message) => Self::Persistence { message },
		}
	}
}
impl From<mnema_providers::Error> for Error {
	fn from(err: mnema_providers::Error) -> Self {
		Self::Embedding { message: err.to_string() }
	}
}
pub type Result<T, E = Error> = std::result::Result<T, E>;
