use thiserror::Error;

/// Errors raised while merging a partition into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
	/// The snapshot passed to `merge` is not the one the partition was computed from.
	#[error("partition was computed against a base of {expected} records, got {actual}")]
	BaseMismatch {
		/// Base length recorded by the partition.
		expected: usize,
		/// Length of the snapshot handed to merge.
		actual: usize,
	},
	/// A retained record no longer sits at the recorded base position.
	#[error("base record at position {index} changed identity since partitioning")]
	BaseMoved {
		/// Position in the base snapshot.
		index: usize,
	},
}
