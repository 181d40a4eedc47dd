//! Serde adapters for the RFC 3339 timestamps carried by persisted
//! collections. `updated_at` is always a string; `last_deduplicated_at`
//! round-trips `None` as JSON `null` through the [`option`] submodule.

use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn serialize<S>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match timestamp.format(&Rfc3339) {
		Ok(formatted) => serializer.serialize_str(&formatted),
		Err(err) => Err(S::Error::custom(format!("unrepresentable timestamp: {err}"))),
	}
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: Cow<str> = Deserialize::deserialize(deserializer)?;

	parse_rfc3339(&raw).map_err(D::Error::custom)
}

fn parse_rfc3339(raw: &str) -> Result<OffsetDateTime, String> {
	OffsetDateTime::parse(raw, &Rfc3339)
		.map_err(|err| format!("invalid RFC 3339 timestamp {raw:?}: {err}"))
}

pub mod option {
	use super::*;

	pub fn serialize<S>(
		timestamp: &Option<OffsetDateTime>,
		serializer: S,
	) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match timestamp {
			Some(timestamp) => super::serialize(timestamp, serializer),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw: Option<Cow<str>> = Deserialize::deserialize(deserializer)?;

		raw.as_deref().map(parse_rfc3339).transpose().map_err(D::Error::custom)
	}
}
