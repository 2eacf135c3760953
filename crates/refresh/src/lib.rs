//! Refresh orchestration for reconciled record collections.
//!
//! One [`RefreshOrchestrator`] serves every resource key of one record type.
//! Each attached key owns a state container (a watch channel holding the
//! current [`Snapshot`]) that changes through a refresh cycle or a local edit
//! ([`RefreshOrchestrator::apply_rows`], [`RefreshOrchestrator::update`]):
//!
//! ```text
//! Idle ─► Fetching ─► Reconciling ─► Idle
//!   └──► (throttled: request dropped)
//! ```
//!
//! # Single flight
//!
//! At most one fetch per key is in flight. A request arriving while a fetch is
//! running joins it and receives the same result. Cycles run as runtime tasks,
//! so a caller that stops waiting does not stall the key.
//!
//! # Throttling
//!
//! A request arriving less than [`RefreshConfig::min_interval`] after the last
//! completed cycle is dropped and reported as [`RefreshOutcome::Throttled`].
//! Failed cycles do not arm the window, so a manual retry goes through.
//!
//! # Liveness
//!
//! Consumers hold a [`RefreshLease`]. When the last lease for a key is dropped
//! the key detaches; results arriving afterwards are discarded without error.
//!
//! [`Snapshot`]: convoy_reconcile::Snapshot

mod config;
mod error;
mod fetch;
mod lease;
mod metrics;
mod orchestrator;
mod poll;


pub use config::RefreshConfig;
pub use error::RefreshError;
pub use fetch::{FnFetcher, ResourceFetcher};
pub use lease::RefreshLease;
pub use metrics::RefreshCounters;
pub use orchestrator::{Comparator, RefreshOrchestrator, RefreshOutcome, RefreshPhase, RefreshReport, SnapshotCache};
pub use poll::spawn_periodic_refresh;
