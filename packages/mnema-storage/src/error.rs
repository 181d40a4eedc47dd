#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Corrupt data: {0}")]
	CorruptData(String),
	#[error("Persistence error: {0}")]
	Persistence(String),
}
impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Persistence(err.to_string())
	}
}
pub type Result<T, E = Error> = std::result::Result<T, E>;
