use std::collections::BTreeMap;
use std::sync::Arc;

use convoy_primitives::{Record, RecordKey, structural_eq_ignoring};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

use super::*;

#[derive(Debug, Clone, PartialEq)]
struct Row {
	id: Option<i64>,
	status: &'static str,
}

impl Record for Row {
	fn key(&self) -> Option<RecordKey> {
		self.id.map(RecordKey::Int)
	}

	fn content_eq(&self, other: &Self) -> bool {
		self == other
	}
}

fn row(id: i64, status: &'static str) -> Row {
	Row { id: Some(id), status }
}

fn ids<T: Record>(records: &[Arc<T>]) -> Vec<RecordKey> {
	records.iter().filter_map(|r| r.key()).collect()
}

fn int_keys(keys: &[i64]) -> Vec<RecordKey> {
	keys.iter().copied().map(RecordKey::Int).collect()
}

#[test]
fn scenario_add_remove_keep() {
	let a = Snapshot::from_records(vec![json!({"id": 1, "status": "active"}), json!({"id": 2, "status": "active"})]);
	let b = vec![json!({"id": 1, "status": "active"}), json!({"id": 3, "status": "active"})];

	let p = partition(&a, b);
	assert_eq!(ids(p.added()), int_keys(&[3]));
	assert_eq!(ids(p.removed()), int_keys(&[2]));
	assert_eq!(ids(p.unchanged()), int_keys(&[1]));
	assert!(p.updated().is_empty());

	let merged = merge(&a, &p).unwrap();
	assert_eq!(merged.keys(), int_keys(&[1, 3]));
	assert!(Arc::ptr_eq(&merged[0], &a[0]), "unchanged record must keep its allocation");
	assert_eq!(*merged[1], json!({"id": 3, "status": "active"}));
}

#[test]
fn updated_records_get_fresh_allocations() {
	let a = Snapshot::from_records(vec![row(1, "active"), row(2, "active")]);
	let p = partition(&a, vec![row(1, "active"), row(2, "completed")]);

	assert_eq!(ids(p.updated()), int_keys(&[2]));
	let merged = merge(&a, &p).unwrap();
	assert!(Arc::ptr_eq(&merged[0], &a[0]));
	assert!(!Arc::ptr_eq(&merged[1], &a[1]));
	assert_eq!(merged[1].status, "completed");
}

#[test]
fn merge_orders_retained_by_scan_then_added() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "a"), row(3, "a")]);
	let b = vec![row(9, "new"), row(3, "a"), row(1, "changed"), row(8, "new"), row(2, "a")];

	let merged = merge(&a, &partition(&a, b)).unwrap();
	assert_eq!(merged.keys(), int_keys(&[3, 1, 2, 9, 8]));
}

#[test]
fn reorder_only_produces_new_collection_with_shared_records() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "a")]);
	let p = partition(&a, vec![row(2, "a"), row(1, "a")]);
	assert!(!p.stats().has_changes());

	let merged = merge(&a, &p).unwrap();
	assert!(!merged.ptr_eq(&a));
	assert_eq!(merged.keys(), int_keys(&[2, 1]));
	assert!(Arc::ptr_eq(&merged[0], &a[1]));
	assert!(Arc::ptr_eq(&merged[1], &a[0]));
}

#[test]
fn identical_payload_keeps_collection_identity() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "b")]);
	let merged = merge(&a, &partition(&a, vec![row(1, "a"), row(2, "b")])).unwrap();
	assert!(merged.ptr_eq(&a));
}

#[test]
fn duplicate_incoming_identity_last_wins() {
	let a = Snapshot::from_records(vec![row(1, "a")]);
	let b = vec![row(2, "first"), row(1, "a"), row(2, "second")];

	let p = partition(&a, b);
	assert_eq!(p.added().len(), 1);
	assert_eq!(p.added()[0].status, "second");

	let merged = merge(&a, &p).unwrap();
	assert_eq!(merged.keys(), int_keys(&[1, 2]));
}

#[test]
fn duplicate_retained_identity_uses_last_position() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "a")]);
	let b = vec![row(2, "a"), row(1, "a"), row(2, "b")];

	let p = partition(&a, b);
	assert_eq!(ids(p.unchanged()), int_keys(&[1]));
	assert_eq!(ids(p.updated()), int_keys(&[2]));
	let merged = merge(&a, &p).unwrap();
	assert_eq!(merged.keys(), int_keys(&[1, 2]));
	assert_eq!(merged[1].status, "b");
}

#[test]
fn records_without_identity_are_skipped_not_collided() {
	let a = Snapshot::from_records(vec![row(1, "a")]);
	let b = vec![Row { id: None, status: "x" }, row(1, "a"), Row { id: None, status: "y" }];

	let p = partition(&a, b);
	assert_eq!(p.invalid(), 2);
	assert_eq!(p.stats().invalid, 2);
	assert!(p.added().is_empty());
	assert_eq!(merge(&a, &p).unwrap().len(), 1);
}

#[test]
fn json_records_without_id_are_invalid() {
	let a = Snapshot::default();
	let p = partition(&a, vec![json!({"plate": "X"}), json!({"id": null}), json!({"id": 4})]);
	assert_eq!(p.invalid(), 2);
	assert_eq!(ids(p.added()), int_keys(&[4]));
}

#[test]
fn empty_base_adds_everything() {
	let a = Snapshot::<Row>::default();
	let p = partition(&a, vec![row(1, "a"), row(2, "b")]);
	assert_eq!(ids(p.added()), int_keys(&[1, 2]));
	assert!(p.removed().is_empty() && p.unchanged().is_empty() && p.updated().is_empty());
}

#[test]
fn empty_incoming_removes_everything() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "b")]);
	let p = partition(&a, Vec::new());
	assert_eq!(ids(p.removed()), int_keys(&[1, 2]));
	assert!(merge(&a, &p).unwrap().is_empty());
}

#[test]
fn duplicate_base_identity_reports_earlier_as_removed() {
	let a = Snapshot::from_records(vec![row(1, "old"), row(1, "a")]);
	let p = partition(&a, vec![row(1, "a")]);
	assert_eq!(p.removed().len(), 1);
	assert!(Arc::ptr_eq(&p.removed()[0], &a[0]));
	assert!(Arc::ptr_eq(&p.unchanged()[0], &a[1]));
}

#[test]
fn merge_rejects_foreign_base() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "a")]);
	let other = Snapshot::from_records(vec![row(1, "a")]);
	let p = partition(&a, vec![row(1, "a")]);

	assert_eq!(merge(&other, &p).unwrap_err(), ReconcileError::BaseMismatch { expected: 2, actual: 1 });

	let same_len = Snapshot::from_records(vec![row(1, "a"), row(2, "a")]);
	assert_eq!(merge(&same_len, &p).unwrap_err(), ReconcileError::BaseMoved { index: 0 });
}

#[test]
fn custom_comparator_ignores_volatile_fields() {
	let a = Snapshot::from_records(vec![json!({"id": 1, "status": "active", "updated_at": "t1"})]);
	let b = vec![json!({"id": 1, "status": "active", "updated_at": "t2"})];

	let strict = partition(&a, b.clone());
	assert_eq!(strict.updated().len(), 1);

	let relaxed = reconcile_by(&a, b, |x: &Value, y: &Value| structural_eq_ignoring(x, y, &["updated_at"])).unwrap();
	assert_eq!(relaxed.stats.unchanged, 1);
	assert!(relaxed.snapshot.ptr_eq(&a));
}

#[test]
fn reconcile_reports_stats() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "a"), row(3, "a")]);
	let out = reconcile(&a, vec![row(1, "a"), row(2, "b"), row(4, "a")]).unwrap();
	assert_eq!(
		out.stats,
		ReconcileStats {
			added: 1,
			updated: 1,
			unchanged: 1,
			removed: 1,
			invalid: 0,
		}
	);
	assert!(out.stats.has_changes());
}

#[test]
fn upsert_replaces_in_place_and_appends() {
	let a = Snapshot::from_records(vec![row(1, "active"), row(2, "active"), row(3, "active")]);
	let out = upsert_rows(&a, vec![row(2, "completed"), row(5, "active"), row(3, "active")]);

	assert_eq!(out.snapshot.keys(), int_keys(&[1, 2, 3, 5]));
	assert!(Arc::ptr_eq(&out.snapshot[0], &a[0]));
	assert!(Arc::ptr_eq(&out.snapshot[2], &a[2]));
	assert_eq!(out.snapshot[1].status, "completed");
	assert_eq!((out.stats.updated, out.stats.added, out.stats.unchanged), (1, 1, 2));
}

#[test]
fn upsert_without_changes_keeps_collection_identity() {
	let a = Snapshot::from_records(vec![row(1, "active")]);
	let out = upsert_rows(&a, vec![row(1, "active"), Row { id: None, status: "x" }]);
	assert!(out.snapshot.ptr_eq(&a));
	assert_eq!(out.stats.invalid, 1);
}

#[test]
fn remove_keys_drops_only_listed_records() {
	let a = Snapshot::from_records(vec![row(1, "a"), row(2, "a"), row(3, "a")]);
	let out = remove_keys(&a, &int_keys(&[2, 42]));
	assert_eq!(out.snapshot.keys(), int_keys(&[1, 3]));
	assert!(Arc::ptr_eq(&out.snapshot[1], &a[2]));
	assert_eq!(out.stats.removed, 1);

	let untouched = remove_keys(&a, &int_keys(&[42]));
	assert!(untouched.snapshot.ptr_eq(&a));
}

fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
	const STATUSES: [&str; 3] = ["active", "completed", "maintenance"];
	prop::collection::btree_map(0i64..40, 0usize..STATUSES.len(), 0..16)
		.prop_map(|map: BTreeMap<i64, usize>| map.into_iter().map(|(id, s)| row(id, STATUSES[s])).collect())
}

proptest! {
	/// Partitioning a collection against itself leaves everything unchanged.
	#[test]
	fn prop_self_partition_is_unchanged(rows in arb_rows()) {
		let a = Snapshot::from_records(rows.clone());
		let p = partition(&a, rows);
		prop_assert!(p.added().is_empty());
		prop_assert!(p.removed().is_empty());
		prop_assert!(p.updated().is_empty());
		prop_assert_eq!(p.unchanged().len(), a.len());
		for (kept, original) in p.unchanged().iter().zip(a.iter()) {
			prop_assert!(Arc::ptr_eq(kept, original));
		}
	}

	/// Disjoint identities: everything old is removed, everything new is added.
	#[test]
	fn prop_disjoint_partition(old in arb_rows(), new in arb_rows()) {
		let new: Vec<Row> = new.into_iter().map(|r| Row { id: r.id.map(|id| id + 1000), ..r }).collect();
		let a = Snapshot::from_records(old);
		let p = partition(&a, new.clone());
		prop_assert_eq!(p.added().len(), new.len());
		prop_assert_eq!(p.removed().len(), a.len());
		prop_assert!(p.unchanged().is_empty());
		prop_assert!(p.updated().is_empty());
	}

	/// Merging the same payload twice yields the same collection, and a second
	/// partition against the result finds nothing to change.
	#[test]
	fn prop_merge_is_idempotent(old in arb_rows(), new in arb_rows()) {
		let a = Snapshot::from_records(old);
		let first = merge(&a, &partition(&a, new.clone())).unwrap();
		let second = merge(&a, &partition(&a, new.clone())).unwrap();
		let values = |s: &Snapshot<Row>| s.iter().map(|r| (**r).clone()).collect::<Vec<_>>();
		prop_assert_eq!(values(&first), values(&second));

		let repeat = partition(&first, new);
		prop_assert!(!repeat.stats().has_changes());
		for kept in repeat.unchanged() {
			let original = first.find(&kept.key().unwrap()).unwrap();
			prop_assert!(Arc::ptr_eq(kept, original));
		}
	}

	/// Every record unchanged between the collections keeps its allocation, and
	/// retained records precede added ones.
	#[test]
	fn prop_unchanged_records_keep_reference(old in arb_rows(), new in arb_rows()) {
		let a = Snapshot::from_records(old);
		let p = partition(&a, new.clone());
		let merged = merge(&a, &p).unwrap();

		for record in merged.iter() {
			if let Some(original) = a.find(&record.key().unwrap()) && original.content_eq(record) {
				prop_assert!(Arc::ptr_eq(original, record));
			}
		}

		let retained = p.unchanged().len() + p.updated().len();
		let expected_order: Vec<RecordKey> = new
			.iter()
			.filter(|r| a.find(&r.key().unwrap()).is_some())
			.chain(new.iter().filter(|r| a.find(&r.key().unwrap()).is_none()))
			.filter_map(Record::key)
			.collect();
		prop_assert_eq!(merged.keys(), expected_order);
		prop_assert_eq!(merged.len(), retained + p.added().len());
	}
}
