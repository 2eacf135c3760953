use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::equality::structural_eq;

/// Field name used as the stable identity of untyped (JSON) records.
pub const ID_FIELD: &str = "id";

/// Stable identity of a record within one collection.
///
/// Integer and text identities never compare equal to each other: `Int(1)` and
/// `Text("1")` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
	/// Numeric identity (database serial ids).
	Int(i64),
	/// Textual identity (uuids, slugs).
	Text(String),
}

impl RecordKey {
	/// Extracts an identity from a JSON value.
	///
	/// Only strings and integers representable as `i64` qualify. Floats, booleans,
	/// `null` and containers yield `None`.
	pub fn from_json(value: &Value) -> Option<Self> {
		match value {
			Value::String(text) => Some(Self::Text(text.clone())),
			Value::Number(number) => number.as_i64().map(Self::Int),
			_ => None,
		}
	}
}

impl fmt::Display for RecordKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(id) => write!(f, "{id}"),
			Self::Text(id) => f.write_str(id),
		}
	}
}

impl From<i64> for RecordKey {
	fn from(id: i64) -> Self {
		Self::Int(id)
	}
}

impl From<&str> for RecordKey {
	fn from(id: &str) -> Self {
		Self::Text(id.to_owned())
	}
}

impl From<String> for RecordKey {
	fn from(id: String) -> Self {
		Self::Text(id)
	}
}

/// An entity with a stable identity and comparable content.
pub trait Record {
	/// Returns the record identity, or `None` when the identity field is missing
	/// or unusable. Records without identity are excluded from reconciliation.
	fn key(&self) -> Option<RecordKey>;

	/// Returns true when both records carry the same content.
	///
	/// Only called for records that share a key.
	fn content_eq(&self, other: &Self) -> bool;
}

impl Record for Value {
	fn key(&self) -> Option<RecordKey> {
		self.get(ID_FIELD).and_then(RecordKey::from_json)
	}

	fn content_eq(&self, other: &Self) -> bool {
		structural_eq(self, other)
	}
}
