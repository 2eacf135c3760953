use std::time::Duration;

/// Default minimum interval between two effective refreshes of one key.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default window after which a committed snapshot counts as stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Refresh timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
	/// Throttle window measured from the last completed cycle.
	pub min_interval: Duration,
	/// Staleness window for committed snapshots.
	pub stale_after: Duration,
	/// Period for timer-driven refreshes, `None` to disable polling.
	pub poll_interval: Option<Duration>,
}

impl Default for RefreshConfig {
	fn default() -> Self {
		Self {
			min_interval: DEFAULT_MIN_INTERVAL,
			stale_after: DEFAULT_STALE_AFTER,
			poll_interval: None,
		}
	}
}
