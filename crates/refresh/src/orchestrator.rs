use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use convoy_cache::{CacheState, ResourceCache};
use convoy_primitives::{FetchError, Record, RecordKey, ResourceKey};
use convoy_reconcile::{ReconcileStats, Reconciled, Snapshot, reconcile, reconcile_by, remove_keys, upsert_rows};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RefreshConfig;
use crate::error::RefreshError;
use crate::fetch::ResourceFetcher;
use crate::lease::RefreshLease;
use crate::metrics::{RefreshCounters, RefreshMetrics};

/// Cache of committed snapshots keyed by resource.
pub type SnapshotCache<T> = ResourceCache<ResourceKey, Snapshot<T>>;

/// Content comparator used instead of [`Record::content_eq`].
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

type CycleResult<T> = Result<CycleOutcome<T>, RefreshError>;
type SharedCycle<T> = Shared<BoxFuture<'static, CycleResult<T>>>;

/// Current phase of one resource key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No cycle running.
	Idle,
	/// Waiting on the fetch collaborator.
	Fetching,
	/// Partitioning and merging fetched records.
	Reconciling,
}

/// Result of a committed refresh cycle.
pub struct RefreshReport<T> {
	pub key: ResourceKey,
	/// Snapshot after the commit.
	pub snapshot: Snapshot<T>,
	pub stats: ReconcileStats,
	/// False when the commit left the snapshot identical to the previous one.
	pub changed: bool,
}

impl<T> Clone for RefreshReport<T> {
	fn clone(&self) -> Self {
		Self {
			key: self.key.clone(),
			snapshot: self.snapshot.clone(),
			stats: self.stats,
			changed: self.changed,
		}
	}
}

impl<T> std::fmt::Debug for RefreshReport<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RefreshReport")
			.field("key", &self.key)
			.field("records", &self.snapshot.len())
			.field("stats", &self.stats)
			.field("changed", &self.changed)
			.finish()
	}
}

/// What happened to a refresh request.
#[derive(Debug)]
pub enum RefreshOutcome<T> {
	/// The cycle ran (or was joined) and its result was committed.
	Committed(RefreshReport<T>),
	/// Dropped: the throttle window since the last cycle has not elapsed.
	Throttled,
	/// Dropped: the key is not attached, or detached before the result arrived.
	Discarded,
	/// Skipped by [`RefreshOrchestrator::refresh_if_stale`]: the snapshot is fresh.
	Fresh,
}

impl<T> RefreshOutcome<T> {
	/// Returns the report of a committed cycle.
	pub fn report(&self) -> Option<&RefreshReport<T>> {
		match self {
			Self::Committed(report) => Some(report),
			_ => None,
		}
	}

	pub fn is_committed(&self) -> bool {
		matches!(self, Self::Committed(_))
	}
}

impl<T> Clone for RefreshOutcome<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Committed(report) => Self::Committed(report.clone()),
			Self::Throttled => Self::Throttled,
			Self::Discarded => Self::Discarded,
			Self::Fresh => Self::Fresh,
		}
	}
}

enum CycleOutcome<T> {
	Committed(RefreshReport<T>),
	Discarded,
}

impl<T> Clone for CycleOutcome<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Committed(report) => Self::Committed(report.clone()),
			Self::Discarded => Self::Discarded,
		}
	}
}

impl<T> From<CycleOutcome<T>> for RefreshOutcome<T> {
	fn from(outcome: CycleOutcome<T>) -> Self {
		match outcome {
			CycleOutcome::Committed(report) => Self::Committed(report),
			CycleOutcome::Discarded => Self::Discarded,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
	Throttled,
	Forced,
	IfStale,
}

/// State container and scheduling state for one attached key.
struct Slot<T> {
	/// Unique across all slots ever created, so a recreated key never matches
	/// a cycle started for its predecessor.
	generation: u64,
	leases: usize,
	phase: RefreshPhase,
	last_completed: Option<Instant>,
	inflight: Option<SharedCycle<T>>,
	tx: watch::Sender<Snapshot<T>>,
}

pub(crate) struct Inner<T> {
	fetcher: Arc<dyn ResourceFetcher<T>>,
	cache: Arc<SnapshotCache<T>>,
	config: RefreshConfig,
	comparator: Option<Comparator<T>>,
	slots: Mutex<FxHashMap<ResourceKey, Slot<T>>>,
	next_generation: AtomicU64,
	metrics: RefreshMetrics,
}

/// Coordinates fetch, reconcile and commit for every key of one record type.
///
/// Cheap to clone; clones share state.
pub struct RefreshOrchestrator<T> {
	pub(crate) inner: Arc<Inner<T>>,
}

impl<T> Clone for RefreshOrchestrator<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Inner<T> {
	/// Drops one lease; the last one detaches the key and discards its snapshot.
	pub(crate) fn release(&self, key: &ResourceKey, generation: u64) {
		let mut slots = self.slots.lock();
		let Some(slot) = slots.get_mut(key).filter(|slot| slot.generation == generation) else {
			return;
		};
		slot.leases = slot.leases.saturating_sub(1);
		if slot.leases == 0 {
			slots.remove(key);
			self.cache.remove(key);
			debug!(%key, generation, "resource detached");
		}
	}

	pub(crate) fn is_attached(&self, key: &ResourceKey, generation: u64) -> bool {
		self.slots.lock().get(key).is_some_and(|slot| slot.generation == generation)
	}

	/// Caches an edited snapshot without extending its freshness window.
	fn store_edited(&self, key: &ResourceKey, snapshot: Snapshot<T>) {
		let now = Instant::now();
		match self.cache.entry(key) {
			Some(entry) if entry.is_fresh(now) => self.cache.set_with_ttl(key.clone(), snapshot, entry.remaining(now)),
			_ => {
				self.cache.set_with_ttl(key.clone(), snapshot, self.config.stale_after);
				self.cache.invalidate(key);
			}
		}
	}

	/// Resets a slot whose cycle task died before committing.
	fn abandon_cycle(&self, key: &ResourceKey, generation: u64, error: &JoinError) -> CycleResult<T> {
		if let Some(slot) = self.slots.lock().get_mut(key).filter(|slot| slot.generation == generation) {
			slot.inflight = None;
			slot.phase = RefreshPhase::Idle;
		}
		RefreshMetrics::bump(&self.metrics.failures);
		warn!(%key, %error, "refresh task aborted, keeping previous snapshot");
		Err(RefreshError::Aborted { key: key.clone() })
	}
}

impl<T> Inner<T>
where
	T: Record + Send + Sync + 'static,
{
	async fn run_cycle(self: Arc<Self>, key: ResourceKey, generation: u64) -> CycleResult<T> {
		RefreshMetrics::bump(&self.metrics.fetches);
		let fetched = self.fetcher.fetch(&key).await;
		self.complete_cycle(&key, generation, fetched)
	}

	fn complete_cycle(&self, key: &ResourceKey, generation: u64, fetched: Result<Vec<T>, FetchError>) -> CycleResult<T> {
		let mut slots = self.slots.lock();
		let Some(slot) = slots.get_mut(key).filter(|slot| slot.generation == generation) else {
			RefreshMetrics::bump(&self.metrics.discarded);
			debug!(%key, generation, "discarding refresh result for detached resource");
			return Ok(CycleOutcome::Discarded);
		};
		slot.inflight = None;

		let records = match fetched {
			Ok(records) => records,
			Err(source) => {
				slot.phase = RefreshPhase::Idle;
				RefreshMetrics::bump(&self.metrics.failures);
				warn!(%key, error = %source, "refresh fetch failed, keeping previous snapshot");
				return Err(RefreshError::Fetch { key: key.clone(), source });
			}
		};

		slot.phase = RefreshPhase::Reconciling;
		let base = Snapshot::clone(&slot.tx.borrow());
		let reconciled = match &self.comparator {
			Some(eq) => reconcile_by(&base, records, eq.as_ref()),
			None => reconcile(&base, records),
		};
		slot.phase = RefreshPhase::Idle;

		let reconciled = match reconciled {
			Ok(reconciled) => reconciled,
			Err(source) => {
				RefreshMetrics::bump(&self.metrics.failures);
				warn!(%key, error = %source, "refresh reconcile failed, keeping previous snapshot");
				return Err(RefreshError::Reconcile { key: key.clone(), source });
			}
		};

		slot.last_completed = Some(Instant::now());
		let snapshot = reconciled.snapshot;
		let changed = !snapshot.ptr_eq(&base);
		if changed {
			slot.tx.send_replace(snapshot.clone());
		}
		self.cache.set_with_ttl(key.clone(), snapshot.clone(), self.config.stale_after);
		RefreshMetrics::bump(&self.metrics.commits);

		let stats = reconciled.stats;
		debug!(
			%key,
			added = stats.added,
			updated = stats.updated,
			unchanged = stats.unchanged,
			removed = stats.removed,
			invalid = stats.invalid,
			changed,
			"refresh committed"
		);

		Ok(CycleOutcome::Committed(RefreshReport {
			key: key.clone(),
			snapshot,
			stats,
			changed,
		}))
	}
}

impl<T> RefreshOrchestrator<T>
where
	T: Record + Send + Sync + 'static,
{
	/// Creates an orchestrator comparing records with [`Record::content_eq`].
	pub fn new(fetcher: Arc<dyn ResourceFetcher<T>>, cache: Arc<SnapshotCache<T>>, config: RefreshConfig) -> Self {
		Self::build(fetcher, cache, config, None)
	}

	/// Creates an orchestrator with a custom content comparator, e.g. one that
	/// ignores volatile timestamp fields.
	pub fn with_comparator(
		fetcher: Arc<dyn ResourceFetcher<T>>,
		cache: Arc<SnapshotCache<T>>,
		config: RefreshConfig,
		comparator: Comparator<T>,
	) -> Self {
		Self::build(fetcher, cache, config, Some(comparator))
	}

	fn build(fetcher: Arc<dyn ResourceFetcher<T>>, cache: Arc<SnapshotCache<T>>, config: RefreshConfig, comparator: Option<Comparator<T>>) -> Self {
		Self {
			inner: Arc::new(Inner {
				fetcher,
				cache,
				config,
				comparator,
				slots: Mutex::new(FxHashMap::default()),
				next_generation: AtomicU64::new(1),
				metrics: RefreshMetrics::default(),
			}),
		}
	}

	pub fn config(&self) -> &RefreshConfig {
		&self.inner.config
	}

	/// Attaches a consumer to `key`, creating its state container on first use.
	///
	/// A new container starts from the cached snapshot if one exists.
	pub fn attach(&self, key: impl Into<ResourceKey>) -> RefreshLease<T> {
		let key = key.into();
		let mut slots = self.inner.slots.lock();
		let slot = slots.entry(key.clone()).or_insert_with(|| {
			let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
			let initial = self.inner.cache.get(&key).unwrap_or_default();
			debug!(%key, generation, records = initial.len(), "resource attached");
			Slot {
				generation,
				leases: 0,
				phase: RefreshPhase::Idle,
				last_completed: None,
				inflight: None,
				tx: watch::Sender::new(initial),
			}
		});
		slot.leases += 1;
		let receiver = slot.tx.subscribe();
		let generation = slot.generation;
		drop(slots);

		RefreshLease::new(self.clone(), key, generation, receiver)
	}

	/// Refreshes `key` unless the throttle window is still open.
	pub async fn refresh(&self, key: &ResourceKey) -> Result<RefreshOutcome<T>, RefreshError> {
		self.request(key, RefreshMode::Throttled).await
	}

	/// Refreshes `key` ignoring the throttle window. Still joins an in-flight fetch.
	pub async fn refresh_forced(&self, key: &ResourceKey) -> Result<RefreshOutcome<T>, RefreshError> {
		self.request(key, RefreshMode::Forced).await
	}

	/// Refreshes `key` only when its cached snapshot is missing or stale.
	pub async fn refresh_if_stale(&self, key: &ResourceKey) -> Result<RefreshOutcome<T>, RefreshError> {
		self.request(key, RefreshMode::IfStale).await
	}

	async fn request(&self, key: &ResourceKey, mode: RefreshMode) -> Result<RefreshOutcome<T>, RefreshError> {
		let cycle = {
			let mut slots = self.inner.slots.lock();
			let Some(slot) = slots.get_mut(key) else {
				debug!(%key, "refresh requested for detached resource");
				return Ok(RefreshOutcome::Discarded);
			};

			if let Some(inflight) = &slot.inflight {
				RefreshMetrics::bump(&self.inner.metrics.coalesced);
				debug!(%key, "joining in-flight refresh");
				inflight.clone()
			} else {
				if mode == RefreshMode::IfStale && self.inner.cache.state(key) == CacheState::Fresh {
					return Ok(RefreshOutcome::Fresh);
				}
				if mode != RefreshMode::Forced
					&& let Some(last) = slot.last_completed
					&& last.elapsed() < self.inner.config.min_interval
				{
					RefreshMetrics::bump(&self.inner.metrics.throttled);
					debug!(%key, since_ms = last.elapsed().as_millis() as u64, "refresh throttled");
					return Ok(RefreshOutcome::Throttled);
				}

				let cycle = self.spawn_cycle(key.clone(), slot.generation);
				slot.inflight = Some(cycle.clone());
				slot.phase = RefreshPhase::Fetching;
				cycle
			}
		};

		cycle.await.map(RefreshOutcome::from)
	}

	/// Runs the cycle on the runtime so it completes even when every caller
	/// stops waiting.
	fn spawn_cycle(&self, key: ResourceKey, generation: u64) -> SharedCycle<T> {
		let task = tokio::spawn(Arc::clone(&self.inner).run_cycle(key.clone(), generation));
		let inner = Arc::clone(&self.inner);
		async move {
			match task.await {
				Ok(result) => result,
				Err(error) => inner.abandon_cycle(&key, generation, &error),
			}
		}
		.boxed()
		.shared()
	}

	/// Marks the cached snapshot stale and reopens the throttle window.
	pub fn invalidate(&self, key: &ResourceKey) {
		if let Some(slot) = self.inner.slots.lock().get_mut(key) {
			slot.last_completed = None;
		}
		self.inner.cache.invalidate(key);
	}

	/// Detaches every key and clears the cache (logout).
	///
	/// Consumers still holding leases observe an empty snapshot and are no
	/// longer attached.
	pub fn clear(&self) {
		let mut slots = self.inner.slots.lock();
		let detached = slots.len();
		for (_, slot) in slots.drain() {
			slot.tx.send_replace(Snapshot::default());
		}
		drop(slots);
		self.inner.cache.clear();
		debug!(detached, "cleared all resources");
	}

	/// Folds mutation response rows into the snapshot of `key`.
	///
	/// Returns `None` when `key` is not attached. See [`upsert_rows`].
	pub fn apply_rows(&self, key: &ResourceKey, rows: impl IntoIterator<Item = T>) -> Option<RefreshReport<T>> {
		self.update(key, |base| Ok::<_, Infallible>(upsert_rows(base, rows))).ok().flatten()
	}

	/// Drops the records listed in `keys` from the snapshot of `resource`.
	///
	/// Returns `None` when `resource` is not attached.
	pub fn remove_rows(&self, resource: &ResourceKey, keys: &[RecordKey]) -> Option<RefreshReport<T>> {
		self.update(resource, |base| Ok::<_, Infallible>(remove_keys(base, keys))).ok().flatten()
	}

	/// Applies a local edit computed from the current snapshot of `key`.
	///
	/// `edit` runs under the slot lock, so no refresh commits in between. It
	/// must not block. Consumers are notified only when the snapshot changed.
	/// The throttle window and the cache freshness window are left as they are.
	pub fn update<E>(&self, key: &ResourceKey, edit: impl FnOnce(&Snapshot<T>) -> Result<Reconciled<T>, E>) -> Result<Option<RefreshReport<T>>, E> {
		let mut slots = self.inner.slots.lock();
		let Some(slot) = slots.get_mut(key) else {
			debug!(%key, "local edit for detached resource ignored");
			return Ok(None);
		};

		let base = Snapshot::clone(&slot.tx.borrow());
		let Reconciled { snapshot, stats } = edit(&base)?;
		let changed = !snapshot.ptr_eq(&base);
		if changed {
			slot.tx.send_replace(snapshot.clone());
			self.inner.store_edited(key, snapshot.clone());
		}
		debug!(%key, added = stats.added, updated = stats.updated, removed = stats.removed, changed, "local edit applied");

		Ok(Some(RefreshReport {
			key: key.clone(),
			snapshot,
			stats,
			changed,
		}))
	}

	/// Current phase of `key`; detached keys are idle.
	pub fn phase(&self, key: &ResourceKey) -> RefreshPhase {
		self.inner.slots.lock().get(key).map_or(RefreshPhase::Idle, |slot| slot.phase)
	}

	/// Current snapshot of an attached key.
	pub fn snapshot(&self, key: &ResourceKey) -> Option<Snapshot<T>> {
		self.inner.slots.lock().get(key).map(|slot| Snapshot::clone(&slot.tx.borrow()))
	}

	/// Keys with at least one attached consumer.
	pub fn attached_keys(&self) -> Vec<ResourceKey> {
		let mut keys: Vec<_> = self.inner.slots.lock().keys().cloned().collect();
		keys.sort();
		keys
	}

	pub fn counters(&self) -> RefreshCounters {
		self.inner.metrics.snapshot()
	}
}
