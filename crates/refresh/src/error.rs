use convoy_primitives::{FetchError, ResourceKey};
use convoy_reconcile::ReconcileError;
use thiserror::Error;

/// Failure of one refresh cycle. The previous snapshot is left untouched.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
	/// The fetch collaborator failed.
	#[error("failed to fetch {key}: {source}")]
	Fetch { key: ResourceKey, source: FetchError },
	/// The fetched records could not be merged into the snapshot.
	#[error("failed to reconcile {key}: {source}")]
	Reconcile { key: ResourceKey, source: ReconcileError },
	/// The cycle task panicked or was cancelled before committing.
	#[error("refresh of {key} aborted")]
	Aborted { key: ResourceKey },
}

impl RefreshError {
	/// Resource whose refresh failed.
	pub fn key(&self) -> &ResourceKey {
		match self {
			Self::Fetch { key, .. } | Self::Reconcile { key, .. } | Self::Aborted { key } => key,
		}
	}
}
