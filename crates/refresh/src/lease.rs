use convoy_primitives::{Record, RecordKey, ResourceKey};
use convoy_reconcile::{Reconciled, Snapshot};
use tokio::sync::watch;

use crate::error::RefreshError;
use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome, RefreshReport};

/// A consumer's attachment to one resource key.
///
/// The lease reads the key's state container and keeps it alive. Dropping the
/// last lease for a key detaches it: the snapshot is discarded and results
/// still in flight are thrown away on arrival.
pub struct RefreshLease<T> {
	orchestrator: RefreshOrchestrator<T>,
	key: ResourceKey,
	generation: u64,
	receiver: watch::Receiver<Snapshot<T>>,
}

impl<T> RefreshLease<T> {
	pub(crate) fn new(orchestrator: RefreshOrchestrator<T>, key: ResourceKey, generation: u64, receiver: watch::Receiver<Snapshot<T>>) -> Self {
		Self {
			orchestrator,
			key,
			generation,
			receiver,
		}
	}

	pub fn key(&self) -> &ResourceKey {
		&self.key
	}

	/// Returns the current snapshot.
	pub fn snapshot(&self) -> Snapshot<T> {
		Snapshot::clone(&self.receiver.borrow())
	}

	/// Returns a receiver notified on every commit that changes the snapshot.
	pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
		self.receiver.clone()
	}

	/// Waits for the next snapshot change.
	///
	/// Returns `None` once the key was detached and its last change observed.
	pub async fn changed(&mut self) -> Option<Snapshot<T>> {
		self.receiver.changed().await.ok()?;
		Some(Snapshot::clone(&self.receiver.borrow_and_update()))
	}

	/// Returns false after the key was detached by [`RefreshOrchestrator::clear`].
	pub fn is_attached(&self) -> bool {
		self.orchestrator.inner.is_attached(&self.key, self.generation)
	}
}

impl<T> RefreshLease<T>
where
	T: Record + Send + Sync + 'static,
{
	/// See [`RefreshOrchestrator::refresh`].
	pub async fn refresh(&self) -> Result<RefreshOutcome<T>, RefreshError> {
		self.orchestrator.refresh(&self.key).await
	}

	/// See [`RefreshOrchestrator::refresh_forced`].
	pub async fn refresh_forced(&self) -> Result<RefreshOutcome<T>, RefreshError> {
		self.orchestrator.refresh_forced(&self.key).await
	}

	/// See [`RefreshOrchestrator::refresh_if_stale`].
	pub async fn refresh_if_stale(&self) -> Result<RefreshOutcome<T>, RefreshError> {
		self.orchestrator.refresh_if_stale(&self.key).await
	}

	/// See [`RefreshOrchestrator::apply_rows`].
	pub fn apply_rows(&self, rows: impl IntoIterator<Item = T>) -> Option<RefreshReport<T>> {
		self.orchestrator.apply_rows(&self.key, rows)
	}

	/// See [`RefreshOrchestrator::remove_rows`].
	pub fn remove_rows(&self, keys: &[RecordKey]) -> Option<RefreshReport<T>> {
		self.orchestrator.remove_rows(&self.key, keys)
	}

	/// See [`RefreshOrchestrator::update`].
	pub fn update<E>(&self, edit: impl FnOnce(&Snapshot<T>) -> Result<Reconciled<T>, E>) -> Result<Option<RefreshReport<T>>, E> {
		self.orchestrator.update(&self.key, edit)
	}
}

impl<T> Drop for RefreshLease<T> {
	fn drop(&mut self) {
		self.orchestrator.inner.release(&self.key, self.generation);
	}
}
