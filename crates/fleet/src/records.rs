use chrono::{DateTime, Utc};
use convoy_primitives::{Record, RecordKey, RoleId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::trip::Trip;

/// Implements [`Record`] keyed by the integer `id` field with full equality as content.
macro_rules! id_record {
	($($ty:ty),+ $(,)?) => {
		$(
			impl Record for $ty {
				fn key(&self) -> Option<RecordKey> {
					Some(RecordKey::Int(self.id))
				}

				fn content_eq(&self, other: &Self) -> bool {
					self == other
				}
			}
		)+
	};
}

id_record!(Company, Branch, Van, Employee, Trip);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
	pub id: i64,
	pub name: String,
	#[serde(default)]
	pub tax_number: Option<String>,
	#[serde(default)]
	pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
	pub id: i64,
	pub company_id: i64,
	pub name: String,
	#[serde(default)]
	pub city: Option<String>,
}

/// Operational state of a van.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VanStatus {
	#[default]
	Available,
	InUse,
	Maintenance,
	Retired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Van {
	pub id: i64,
	pub branch_id: i64,
	pub plate: String,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub status: VanStatus,
	#[serde(default)]
	pub odometer_km: u32,
	#[serde(default)]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Van {
	/// Content equality that ignores `updated_at`, which the backend bumps on
	/// every write even when nothing else changed.
	pub fn same_content(&self, other: &Self) -> bool {
		let strip = |van: &Self| Self {
			updated_at: None,
			..van.clone()
		};
		strip(self) == strip(other)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
	pub id: i64,
	pub branch_id: i64,
	pub full_name: String,
	#[serde(default)]
	pub email: Option<String>,
	pub role_id: RoleId,
	#[serde(default = "active_default")]
	pub active: bool,
}

fn active_default() -> bool {
	true
}
