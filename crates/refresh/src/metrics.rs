use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of refresh counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshCounters {
	/// Fetches issued to the collaborator.
	pub fetches: u64,
	/// Requests that joined an in-flight fetch.
	pub coalesced: u64,
	/// Requests dropped by the throttle window.
	pub throttled: u64,
	/// Cycles that reached the commit step.
	pub commits: u64,
	/// Results dropped because the key detached meanwhile.
	pub discarded: u64,
	/// Cycles that ended in an error.
	pub failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshMetrics {
	pub(crate) fetches: AtomicU64,
	pub(crate) coalesced: AtomicU64,
	pub(crate) throttled: AtomicU64,
	pub(crate) commits: AtomicU64,
	pub(crate) discarded: AtomicU64,
	pub(crate) failures: AtomicU64,
}

impl RefreshMetrics {
	pub(crate) fn bump(counter: &AtomicU64) {
		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self) -> RefreshCounters {
		RefreshCounters {
			fetches: self.fetches.load(Ordering::Relaxed),
			coalesced: self.coalesced.load(Ordering::Relaxed),
			throttled: self.throttled.load(Ordering::Relaxed),
			commits: self.commits.load(Ordering::Relaxed),
			discarded: self.discarded.load(Ordering::Relaxed),
			failures: self.failures.load(Ordering::Relaxed),
		}
	}
}
