//! Trip ("mission") lifecycle: start, complete, delete.

use chrono::{DateTime, Utc};
use convoy_primitives::RecordKey;
use convoy_reconcile::{Reconciled, Snapshot, remove_keys, upsert_rows};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
	#[default]
	Planned,
	Active,
	Completed,
	Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
	pub id: i64,
	pub van_id: i64,
	pub driver_id: i64,
	#[serde(default)]
	pub status: TripStatus,
	#[serde(default)]
	pub destination: Option<String>,
	pub start_km: u32,
	#[serde(default)]
	pub end_km: Option<u32>,
	#[serde(default)]
	pub started_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripError {
	#[error("trip {id} is {status}, expected active")]
	NotActive { id: i64, status: TripStatus },
	#[error("end odometer {end_km} km is below start odometer {start_km} km")]
	OdometerRollback { start_km: u32, end_km: u32 },
	#[error("van {van_id} is already on active trip {trip_id}")]
	VanBusy { van_id: i64, trip_id: i64 },
	#[error("trip {id} not found")]
	NotFound { id: i64 },
	#[error("trip {id} is active and cannot be deleted")]
	DeleteActive { id: i64 },
}

impl Trip {
	/// A trip that started at `at` with the van's odometer at `start_km`.
	pub fn start(id: i64, van_id: i64, driver_id: i64, start_km: u32, at: DateTime<Utc>) -> Self {
		Self {
			id,
			van_id,
			driver_id,
			status: TripStatus::Active,
			destination: None,
			start_km,
			end_km: None,
			started_at: Some(at),
			completed_at: None,
		}
	}

	pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
		self.destination = Some(destination.into());
		self
	}

	pub fn is_active(&self) -> bool {
		self.status == TripStatus::Active
	}

	/// Returns the completed version of this trip.
	pub fn complete(&self, end_km: u32, at: DateTime<Utc>) -> Result<Self, TripError> {
		if !self.is_active() {
			return Err(TripError::NotActive {
				id: self.id,
				status: self.status,
			});
		}
		if end_km < self.start_km {
			return Err(TripError::OdometerRollback {
				start_km: self.start_km,
				end_km,
			});
		}
		Ok(Self {
			status: TripStatus::Completed,
			end_km: Some(end_km),
			completed_at: Some(at),
			..self.clone()
		})
	}

	/// Distance driven, known once the trip is completed.
	pub fn distance_km(&self) -> Option<u32> {
		self.end_km.map(|end| end.saturating_sub(self.start_km))
	}
}

/// Adds an active `trip` to the collection. A van runs at most one active trip.
pub fn start_trip(trips: &Snapshot<Trip>, trip: Trip) -> Result<Reconciled<Trip>, TripError> {
	if let Some(busy) = trips.iter().find(|t| t.is_active() && t.van_id == trip.van_id && t.id != trip.id) {
		return Err(TripError::VanBusy {
			van_id: trip.van_id,
			trip_id: busy.id,
		});
	}
	Ok(upsert_rows(trips, [trip]))
}

/// Completes trip `id` in place.
pub fn complete_trip(trips: &Snapshot<Trip>, id: i64, end_km: u32, at: DateTime<Utc>) -> Result<Reconciled<Trip>, TripError> {
	let trip = trips.find(&RecordKey::Int(id)).ok_or(TripError::NotFound { id })?;
	let completed = trip.complete(end_km, at)?;
	Ok(upsert_rows(trips, [completed]))
}

/// Removes trip `id`. Active trips must be completed first.
pub fn delete_trip(trips: &Snapshot<Trip>, id: i64) -> Result<Reconciled<Trip>, TripError> {
	let key = RecordKey::Int(id);
	let trip = trips.find(&key).ok_or(TripError::NotFound { id })?;
	if trip.is_active() {
		return Err(TripError::DeleteActive { id });
	}
	Ok(remove_keys(trips, &[key]))
}
