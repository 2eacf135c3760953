use std::time::Duration;

use convoy_primitives::Record;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::lease::RefreshLease;
use crate::orchestrator::RefreshOutcome;

/// Spawns a task refreshing `lease`'s key every `period`.
///
/// The first refresh runs immediately. The task owns the lease and stops when
/// `cancel` fires or the key is detached by a clear; its refreshes go through
/// the normal throttle and single-flight rules.
pub fn spawn_periodic_refresh<T>(lease: RefreshLease<T>, period: Duration, cancel: CancellationToken) -> JoinHandle<()>
where
	T: Record + Send + Sync + 'static,
{
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => break,
				_ = ticker.tick() => {}
			}
			if !lease.is_attached() {
				break;
			}

			match lease.refresh().await {
				Ok(RefreshOutcome::Committed(report)) if report.changed => {
					debug!(key = %lease.key(), records = report.snapshot.len(), "periodic refresh changed snapshot");
				}
				Ok(_) => {}
				Err(error) => warn!(key = %lease.key(), %error, "periodic refresh failed"),
			}
		}

		debug!(key = %lease.key(), "periodic refresh stopped");
	})
}
