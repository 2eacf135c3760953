//! Three-way classification of incoming records against a base snapshot.

use std::sync::Arc;

use convoy_primitives::{Record, RecordKey};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::snapshot::Snapshot;

/// Where a retained record lands in the merged output, in incoming scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
	/// Keep the base record at `base`; `slot` indexes [`Partition::unchanged`].
	Unchanged { base: usize, slot: usize },
	/// Use the fresh record at `slot` in [`Partition::updated`].
	Updated { slot: usize },
}

/// Counts describing one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
	pub added: usize,
	pub updated: usize,
	pub unchanged: usize,
	pub removed: usize,
	/// Incoming records skipped for lacking an identity.
	pub invalid: usize,
}

impl ReconcileStats {
	/// Returns true if any record was added, updated or removed.
	pub fn has_changes(&self) -> bool {
		self.added + self.updated + self.removed > 0
	}
}

/// Result of partitioning incoming records against a base snapshot.
///
/// `unchanged` and `removed` hold the base allocations; `added` and `updated`
/// hold fresh ones.
#[derive(Debug)]
pub struct Partition<T> {
	added: Vec<Arc<T>>,
	updated: Vec<Arc<T>>,
	unchanged: Vec<Arc<T>>,
	removed: Vec<Arc<T>>,
	invalid: usize,
	pub(crate) base_len: usize,
	pub(crate) placements: Vec<Placement>,
}

impl<T> Partition<T> {
	/// Records whose identity was not present in the base, in incoming order.
	pub fn added(&self) -> &[Arc<T>] {
		&self.added
	}

	/// Fresh versions of records whose content changed, in incoming order.
	pub fn updated(&self) -> &[Arc<T>] {
		&self.updated
	}

	/// Base records whose content is unchanged, in incoming order.
	pub fn unchanged(&self) -> &[Arc<T>] {
		&self.unchanged
	}

	/// Base records absent from the incoming payload, in base order.
	pub fn removed(&self) -> &[Arc<T>] {
		&self.removed
	}

	/// Number of incoming records skipped for lacking an identity.
	pub fn invalid(&self) -> usize {
		self.invalid
	}

	pub fn stats(&self) -> ReconcileStats {
		ReconcileStats {
			added: self.added.len(),
			updated: self.updated.len(),
			unchanged: self.unchanged.len(),
			removed: self.removed.len(),
			invalid: self.invalid,
		}
	}
}

/// Partitions `incoming` against `base` using [`Record::content_eq`].
pub fn partition<T: Record>(base: &Snapshot<T>, incoming: impl IntoIterator<Item = T>) -> Partition<T> {
	partition_by(base, incoming, T::content_eq)
}

/// Partitions `incoming` against `base` with a caller-supplied content comparator.
///
/// - identity missing: the incoming record is skipped and counted as invalid
/// - duplicate identity in `incoming`: the last occurrence wins, in its own position
/// - identity not in `base`: added
/// - identity in `base`, `eq` false: updated
/// - identity in `base`, `eq` true: unchanged (keeps the base `Arc`)
/// - base identities never seen in `incoming`: removed
pub fn partition_by<T, F>(base: &Snapshot<T>, incoming: impl IntoIterator<Item = T>, eq: F) -> Partition<T>
where
	T: Record,
	F: Fn(&T, &T) -> bool,
{
	let mut base_index: FxHashMap<RecordKey, usize> = FxHashMap::default();
	base_index.reserve(base.len());
	let mut removed_at = Vec::new();

	for (index, record) in base.iter().enumerate() {
		let Some(key) = record.key() else {
			warn!(index, "base record without identity dropped");
			removed_at.push(index);
			continue;
		};
		if let Some(previous) = base_index.insert(key, index) {
			warn!(index, previous, "duplicate identity in base snapshot, keeping last");
			removed_at.push(previous);
		}
	}

	let incoming: Vec<T> = incoming.into_iter().collect();
	let mut keys = Vec::with_capacity(incoming.len());
	let mut last_position: FxHashMap<RecordKey, usize> = FxHashMap::default();
	let mut invalid = 0;

	for (position, record) in incoming.iter().enumerate() {
		let key = record.key();
		match &key {
			Some(key) => {
				if let Some(earlier) = last_position.insert(key.clone(), position) {
					debug!(%key, earlier, position, "duplicate incoming identity, keeping last");
				}
			}
			None => {
				warn!(position, "incoming record without identity skipped");
				invalid += 1;
			}
		}
		keys.push(key);
	}

	let mut added = Vec::new();
	let mut updated = Vec::new();
	let mut unchanged = Vec::new();
	let mut placements = Vec::new();

	for (position, (record, key)) in incoming.into_iter().zip(keys).enumerate() {
		let Some(key) = key else { continue };
		if last_position.get(&key) != Some(&position) {
			continue;
		}

		match base_index.remove(&key) {
			None => added.push(Arc::new(record)),
			Some(index) => {
				let existing = &base[index];
				if eq(existing.as_ref(), &record) {
					placements.push(Placement::Unchanged {
						base: index,
						slot: unchanged.len(),
					});
					unchanged.push(Arc::clone(existing));
				} else {
					placements.push(Placement::Updated { slot: updated.len() });
					updated.push(Arc::new(record));
				}
			}
		}
	}

	removed_at.extend(base_index.into_values());
	removed_at.sort_unstable();
	let removed = removed_at.into_iter().map(|index| Arc::clone(&base[index])).collect();

	Partition {
		added,
		updated,
		unchanged,
		removed,
		invalid,
		base_len: base.len(),
		placements,
	}
}
