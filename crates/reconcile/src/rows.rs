//! Row-level updates from mutation responses.
//!
//! A mutation (start trip, edit van, ...) answers with the rows it touched
//! rather than the whole collection. These helpers fold such rows into a
//! snapshot in place: positions are kept, untouched records keep their `Arc`,
//! and nothing outside the given rows is removed.

use std::sync::Arc;

use convoy_primitives::{Record, RecordKey};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::merge::Reconciled;
use crate::partition::ReconcileStats;
use crate::snapshot::Snapshot;

/// Replaces records whose identity matches one of `rows` and appends the rest.
///
/// A row equal in content to the record it matches leaves that record's `Arc`
/// in place. Duplicate identities among `rows` resolve to the last one.
pub fn upsert_rows<T: Record>(base: &Snapshot<T>, rows: impl IntoIterator<Item = T>) -> Reconciled<T> {
	let mut stats = ReconcileStats::default();
	let mut pending: Vec<Option<T>> = Vec::new();
	let mut by_key: FxHashMap<RecordKey, usize> = FxHashMap::default();

	for row in rows {
		let Some(key) = row.key() else {
			warn!("mutation row without identity skipped");
			stats.invalid += 1;
			continue;
		};
		match by_key.get(&key) {
			Some(&slot) => pending[slot] = Some(row),
			None => {
				by_key.insert(key, pending.len());
				pending.push(Some(row));
			}
		}
	}

	let mut changed = false;
	let mut records = Vec::with_capacity(base.len() + pending.len());
	for record in base.iter() {
		let row = record
			.key()
			.and_then(|key| by_key.get(&key).copied())
			.and_then(|slot| pending[slot].take());
		match row {
			Some(row) if !record.content_eq(&row) => {
				stats.updated += 1;
				changed = true;
				records.push(Arc::new(row));
			}
			_ => {
				stats.unchanged += 1;
				records.push(Arc::clone(record));
			}
		}
	}

	for row in pending.into_iter().flatten() {
		stats.added += 1;
		changed = true;
		records.push(Arc::new(row));
	}

	let snapshot = if changed { Snapshot::new(records) } else { base.clone() };
	Reconciled { snapshot, stats }
}

/// Drops records whose identity is listed in `keys`.
pub fn remove_keys<T: Record>(base: &Snapshot<T>, keys: &[RecordKey]) -> Reconciled<T> {
	let doomed: FxHashSet<&RecordKey> = keys.iter().collect();
	let mut stats = ReconcileStats::default();
	let mut records = Vec::with_capacity(base.len());

	for record in base.iter() {
		if record.key().is_some_and(|key| doomed.contains(&key)) {
			stats.removed += 1;
		} else {
			stats.unchanged += 1;
			records.push(Arc::clone(record));
		}
	}

	let snapshot = if stats.removed > 0 { Snapshot::new(records) } else { base.clone() };
	Reconciled { snapshot, stats }
}
