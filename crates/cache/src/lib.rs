//! Explicit keyed cache with per-entry staleness windows.
//!
//! [`ResourceCache`] is created once and shared by reference (`Arc`) with every
//! component that needs it. Entries move through three states:
//!
//! - **Fresh**: stored less than `ttl` ago and not invalidated
//! - **Stale**: older than `ttl`, or explicitly invalidated; the value is kept
//!   so later reconciliation can still reuse its records
//! - **Missing**: never stored, removed, or cleared
//!
//! Time comes from [`tokio::time::Instant`], so paused-clock tests can step
//! through staleness windows deterministically.

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

/// Lookup state of one cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
	Missing,
	Fresh,
	Stale,
}

/// One cached value with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
	pub value: V,
	pub stored_at: Instant,
	pub ttl: Duration,
	pub invalidated: bool,
}

impl<V> CacheEntry<V> {
	/// Returns true if the entry is within its window and not invalidated.
	pub fn is_fresh(&self, now: Instant) -> bool {
		!self.invalidated && now.saturating_duration_since(self.stored_at) < self.ttl
	}

	/// Time left before the entry goes stale, zero if already stale.
	pub fn remaining(&self, now: Instant) -> Duration {
		if self.invalidated {
			return Duration::ZERO;
		}
		self.ttl.saturating_sub(now.saturating_duration_since(self.stored_at))
	}
}

/// Thread-safe keyed cache.
#[derive(Debug)]
pub struct ResourceCache<K, V> {
	entries: Mutex<FxHashMap<K, CacheEntry<V>>>,
	default_ttl: Duration,
}

impl<K, V> ResourceCache<K, V>
where
	K: Eq + Hash,
	V: Clone,
{
	/// Creates an empty cache whose entries go stale after `default_ttl`.
	pub fn new(default_ttl: Duration) -> Self {
		Self {
			entries: Mutex::new(FxHashMap::default()),
			default_ttl,
		}
	}

	/// Window applied by [`set`](Self::set).
	pub fn default_ttl(&self) -> Duration {
		self.default_ttl
	}

	/// Returns the cached value regardless of age.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.entries.lock().get(key).map(|entry| entry.value.clone())
	}

	/// Returns the cached value only while it is fresh.
	pub fn get_fresh<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		let now = Instant::now();
		self.entries
			.lock()
			.get(key)
			.filter(|entry| entry.is_fresh(now))
			.map(|entry| entry.value.clone())
	}

	/// Returns a copy of the full entry.
	pub fn entry<Q>(&self, key: &Q) -> Option<CacheEntry<V>>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.entries.lock().get(key).cloned()
	}

	pub fn state<Q>(&self, key: &Q) -> CacheState
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		let now = Instant::now();
		match self.entries.lock().get(key) {
			None => CacheState::Missing,
			Some(entry) if entry.is_fresh(now) => CacheState::Fresh,
			Some(_) => CacheState::Stale,
		}
	}

	/// Stores `value` with the default window, replacing any previous entry.
	pub fn set(&self, key: K, value: V) {
		self.set_with_ttl(key, value, self.default_ttl);
	}

	/// Stores `value` with an explicit window.
	pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
		let entry = CacheEntry {
			value,
			stored_at: Instant::now(),
			ttl,
			invalidated: false,
		};
		self.entries.lock().insert(key, entry);
	}

	/// Marks an entry stale while keeping its value. Returns false if missing.
	pub fn invalidate<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		match self.entries.lock().get_mut(key) {
			Some(entry) => {
				entry.invalidated = true;
				true
			}
			None => false,
		}
	}

	/// Marks every entry stale.
	pub fn invalidate_all(&self) {
		for entry in self.entries.lock().values_mut() {
			entry.invalidated = true;
		}
	}

	/// Removes an entry, returning its value.
	pub fn remove<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.entries.lock().remove(key).map(|entry| entry.value)
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TTL: Duration = Duration::from_secs(30);

	#[tokio::test(start_paused = true)]
	async fn entries_go_stale_after_window() {
		let cache = ResourceCache::<String, u32>::new(TTL);
		cache.set("vans".to_string(), 1);
		assert_eq!(cache.state("vans"), CacheState::Fresh);
		assert_eq!(cache.get_fresh("vans"), Some(1));

		tokio::time::advance(TTL - Duration::from_millis(1)).await;
		assert_eq!(cache.state("vans"), CacheState::Fresh);

		tokio::time::advance(Duration::from_millis(1)).await;
		assert_eq!(cache.state("vans"), CacheState::Stale);
		assert_eq!(cache.get_fresh("vans"), None);
		assert_eq!(cache.get("vans"), Some(1), "stale values stay readable");
	}

	#[tokio::test(start_paused = true)]
	async fn invalidate_keeps_value_until_next_set() {
		let cache = ResourceCache::<String, u32>::new(TTL);
		assert!(!cache.invalidate("vans"));

		cache.set("vans".to_string(), 1);
		assert!(cache.invalidate("vans"));
		assert_eq!(cache.state("vans"), CacheState::Stale);
		assert_eq!(cache.get("vans"), Some(1));
		assert_eq!(cache.entry("vans").map(|e| e.remaining(Instant::now())), Some(Duration::ZERO));

		cache.set("vans".to_string(), 2);
		assert_eq!(cache.get_fresh("vans"), Some(2));
	}

	#[tokio::test(start_paused = true)]
	async fn explicit_ttl_overrides_default() {
		let cache = ResourceCache::<String, u32>::new(TTL);
		cache.set_with_ttl("perms".to_string(), 7, Duration::from_secs(1));
		tokio::time::advance(Duration::from_secs(1)).await;
		assert_eq!(cache.state("perms"), CacheState::Stale);
	}

	#[tokio::test(start_paused = true)]
	async fn clear_and_remove_forget_entries() {
		let cache = ResourceCache::<String, u32>::new(TTL);
		cache.set("a".to_string(), 1);
		cache.set("b".to_string(), 2);
		assert_eq!(cache.len(), 2);

		assert_eq!(cache.remove("a"), Some(1));
		assert_eq!(cache.state("a"), CacheState::Missing);

		cache.invalidate_all();
		assert_eq!(cache.state("b"), CacheState::Stale);

		cache.clear();
		assert!(cache.is_empty());
	}
}
