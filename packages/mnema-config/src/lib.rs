mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, EmbeddingProviderConfig, Memory, Providers, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.root.trim().is_empty() {
		return Err(Error::Validation { message: "storage.root must be non-empty.".to_string() });
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.memory.dedup_interval_hours <= 0 {
		return Err(Error::Validation {
			message: "memory.dedup_interval_hours must be greater than zero.".to_string(),
		});
	}
	if !cfg.memory.similarity_threshold.is_finite() {
		return Err(Error::Validation {
			message: "memory.similarity_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.memory.similarity_threshold) {
		return Err(Error::Validation {
			message: "memory.similarity_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.memory.min_memories_for_dedup == 0 {
		return Err(Error::Validation {
			message: "memory.min_memories_for_dedup must be greater than zero.".to_string(),
		});
	}
	if cfg.memory.neighbor_k == 0 {
		return Err(Error::Validation {
			message: "memory.neighbor_k must be greater than zero.".to_string(),
		});
	}
	if cfg.memory.default_top_k == 0 {
		return Err(Error::Validation {
			message: "memory.default_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.memory.max_top_k < cfg.memory.default_top_k {
		return Err(Error::Validation {
			message: "memory.max_top_k must be at least memory.default_top_k.".to_string(),
		});
	}

	Ok(())
}
