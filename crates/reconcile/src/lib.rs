//! Incremental reconciliation of record collections.
//!
//! A refresh delivers the full current set of records for a resource. Rather
//! than replacing the client snapshot wholesale, [`partition`] classifies every
//! incoming record against the previous [`Snapshot`] and [`merge`] builds the
//! next snapshot so that unchanged records keep the exact `Arc` they had
//! before. Consumers can then detect change with [`Arc::ptr_eq`] instead of
//! deep comparison.
//!
//! ```text
//! old snapshot ──┐
//!                ├─ partition ─► {added, updated, unchanged, removed} ─ merge ─► next snapshot
//! incoming rows ─┘
//! ```
//!
//! [`Arc::ptr_eq`]: std::sync::Arc::ptr_eq

pub mod error;
pub mod merge;
pub mod partition;
pub mod rows;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use error::ReconcileError;
pub use merge::{Reconciled, merge, reconcile, reconcile_by};
pub use partition::{Partition, ReconcileStats, partition, partition_by};
pub use rows::{remove_keys, upsert_rows};
pub use snapshot::Snapshot;
