use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use convoy_refresh::{RefreshConfig, RefreshOrchestrator, ResourceFetcher, SnapshotCache, spawn_periodic_refresh};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::fixtures::FixtureStore;

/// Refresh period used when neither the flag nor the config sets one.
const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(2);

/// Polls `resource` from `fixtures` and prints each snapshot change.
///
/// Runs until `cycles` changes were printed, or forever without a limit.
pub async fn run_watch(
	fixtures: &Path,
	resource: &str,
	cycles: Option<usize>,
	interval: Option<Duration>,
	config: RefreshConfig,
	out: &mut impl Write,
) -> anyhow::Result<()> {
	let interval = interval.or(config.poll_interval).unwrap_or(DEFAULT_WATCH_INTERVAL);
	let fetcher: Arc<dyn ResourceFetcher<Value>> = Arc::new(FixtureStore::new(fixtures));
	let cache = Arc::new(SnapshotCache::new(config.stale_after));
	let orchestrator = RefreshOrchestrator::new(fetcher, cache, config);

	let mut lease = orchestrator.attach(resource);
	let cancel = CancellationToken::new();
	let poller = spawn_periodic_refresh(orchestrator.attach(resource), interval, cancel.clone());
	info!(resource, interval_ms = interval.as_millis() as u64, "watching resource");

	let mut seen = 0;
	while cycles.is_none_or(|limit| seen < limit) {
		let Some(snapshot) = lease.changed().await else {
			break;
		};
		seen += 1;
		let keys: Vec<String> = snapshot.keys().iter().map(ToString::to_string).collect();
		writeln!(out, "#{seen} {resource}: {} records [{}]", snapshot.len(), keys.join(" "))?;
		out.flush()?;
	}

	cancel.cancel();
	poller.await?;
	let counters = orchestrator.counters();
	info!(
		fetches = counters.fetches,
		commits = counters.commits,
		failures = counters.failures,
		"watch finished"
	);
	Ok(())
}
