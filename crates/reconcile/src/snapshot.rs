use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use convoy_primitives::{Record, RecordKey};

/// Immutable, cheaply cloneable collection of records for one resource.
///
/// Records are held behind `Arc` so reconciliation can hand the same
/// allocation to the next snapshot when a record did not change.
pub struct Snapshot<T> {
	records: Arc<[Arc<T>]>,
}

impl<T> Snapshot<T> {
	/// Wraps already shared records.
	pub fn new(records: Vec<Arc<T>>) -> Self {
		Self { records: records.into() }
	}

	/// Builds a snapshot from owned records, allocating one `Arc` per record.
	pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
		Self::new(records.into_iter().map(Arc::new).collect())
	}

	/// Returns true if both snapshots share the same backing allocation.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.records, &other.records)
	}

	/// Returns the records as a slice.
	pub fn as_slice(&self) -> &[Arc<T>] {
		&self.records
	}
}

impl<T: Record> Snapshot<T> {
	/// Finds the record with the given identity.
	pub fn find(&self, key: &RecordKey) -> Option<&Arc<T>> {
		self.records.iter().find(|record| record.key().as_ref() == Some(key))
	}

	/// Returns record identities in snapshot order. Records without identity are skipped.
	pub fn keys(&self) -> Vec<RecordKey> {
		self.records.iter().filter_map(|record| record.key()).collect()
	}
}

impl<T> Clone for Snapshot<T> {
	fn clone(&self) -> Self {
		Self {
			records: Arc::clone(&self.records),
		}
	}
}

impl<T> Default for Snapshot<T> {
	fn default() -> Self {
		Self::new(Vec::new())
	}
}

impl<T> Deref for Snapshot<T> {
	type Target = [Arc<T>];

	fn deref(&self) -> &Self::Target {
		&self.records
	}
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.records.iter()).finish()
	}
}

impl<T> FromIterator<T> for Snapshot<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Self::from_records(iter)
	}
}
