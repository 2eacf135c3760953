use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use convoy_primitives::{Record, RecordKey, structural_eq_ignoring};
use convoy_reconcile::{Snapshot, partition_by};
use serde::Serialize;
use serde_json::Value;

/// Identities per partition class plus the merged order.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
	pub added: Vec<RecordKey>,
	pub updated: Vec<RecordKey>,
	pub unchanged: Vec<RecordKey>,
	pub removed: Vec<RecordKey>,
	pub invalid: usize,
	/// Identities of the merged snapshot, in order.
	pub merged: Vec<RecordKey>,
}

/// Reconciles `new` against `old`, skipping `ignore` fields in the comparison.
pub fn diff_records(old: Vec<Value>, new: Vec<Value>, ignore: &[String]) -> anyhow::Result<DiffSummary> {
	let ignored: Vec<&str> = ignore.iter().map(String::as_str).collect();
	let base = Snapshot::from_records(old);
	let partition = partition_by(&base, new, |a, b| structural_eq_ignoring(a, b, &ignored));
	let merged = convoy_reconcile::merge(&base, &partition)?;

	let keys = |records: &[Arc<Value>]| records.iter().filter_map(|record| record.key()).collect::<Vec<_>>();
	Ok(DiffSummary {
		added: keys(partition.added()),
		updated: keys(partition.updated()),
		unchanged: keys(partition.unchanged()),
		removed: keys(partition.removed()),
		invalid: partition.invalid(),
		merged: merged.keys(),
	})
}

pub fn run_diff(old: &Path, new: &Path, ignore: &[String], json: bool, out: &mut impl Write) -> anyhow::Result<()> {
	let summary = diff_records(read_records(old)?, read_records(new)?, ignore)?;

	if json {
		serde_json::to_writer_pretty(&mut *out, &summary)?;
		writeln!(out)?;
		return Ok(());
	}

	writeln!(
		out,
		"added {}  updated {}  unchanged {}  removed {}  invalid {}",
		summary.added.len(),
		summary.updated.len(),
		summary.unchanged.len(),
		summary.removed.len(),
		summary.invalid
	)?;
	for (marker, keys) in [("+", &summary.added), ("~", &summary.updated), ("-", &summary.removed)] {
		for key in keys {
			writeln!(out, "{marker} {key}")?;
		}
	}
	writeln!(out, "merged: {}", join_keys(&summary.merged))?;
	Ok(())
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Value>> {
	let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("{} is not a JSON array of records", path.display()))
}

fn join_keys(keys: &[RecordKey]) -> String {
	keys.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}
