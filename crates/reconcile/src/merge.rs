//! Reference-preserving merge of a partition into the next snapshot.

use std::sync::Arc;

use convoy_primitives::Record;

use crate::error::ReconcileError;
use crate::partition::{Partition, Placement, ReconcileStats, partition, partition_by};
use crate::snapshot::Snapshot;

/// Snapshot produced by a reconciliation together with its counts.
#[derive(Debug)]
pub struct Reconciled<T> {
	pub snapshot: Snapshot<T>,
	pub stats: ReconcileStats,
}

/// Builds the snapshot that follows `base` given `partition`.
///
/// Output order: unchanged and updated records in incoming scan order, then
/// added records in incoming order. Unchanged records are the very `Arc`s
/// found in `base`. When the result is element-wise identical to `base`, `base`
/// itself is returned so the collection keeps its identity too.
///
/// `base` must be the snapshot the partition was computed from.
pub fn merge<T>(base: &Snapshot<T>, partition: &Partition<T>) -> Result<Snapshot<T>, ReconcileError> {
	if base.len() != partition.base_len {
		return Err(ReconcileError::BaseMismatch {
			expected: partition.base_len,
			actual: base.len(),
		});
	}

	let mut records = Vec::with_capacity(partition.placements.len() + partition.added().len());
	for placement in &partition.placements {
		match *placement {
			Placement::Unchanged { base: index, slot } => {
				let original = base.get(index).ok_or(ReconcileError::BaseMoved { index })?;
				if !Arc::ptr_eq(original, &partition.unchanged()[slot]) {
					return Err(ReconcileError::BaseMoved { index });
				}
				records.push(Arc::clone(original));
			}
			Placement::Updated { slot } => records.push(Arc::clone(&partition.updated()[slot])),
		}
	}
	records.extend(partition.added().iter().cloned());

	let identical = records.len() == base.len() && records.iter().zip(base.iter()).all(|(next, prev)| Arc::ptr_eq(next, prev));
	if identical {
		return Ok(base.clone());
	}
	Ok(Snapshot::new(records))
}

/// Partitions `incoming` against `base` and merges the result.
pub fn reconcile<T: Record>(base: &Snapshot<T>, incoming: impl IntoIterator<Item = T>) -> Result<Reconciled<T>, ReconcileError> {
	let partition = partition(base, incoming);
	let snapshot = merge(base, &partition)?;
	Ok(Reconciled {
		snapshot,
		stats: partition.stats(),
	})
}

/// [`reconcile`] with a caller-supplied content comparator.
pub fn reconcile_by<T, F>(base: &Snapshot<T>, incoming: impl IntoIterator<Item = T>, eq: F) -> Result<Reconciled<T>, ReconcileError>
where
	T: Record,
	F: Fn(&T, &T) -> bool,
{
	let partition = partition_by(base, incoming, eq);
	let snapshot = merge(base, &partition)?;
	Ok(Reconciled {
		snapshot,
		stats: partition.stats(),
	})
}
