use std::sync::Arc;

use convoy_cache::ResourceCache;
use convoy_primitives::{FetchError, RoleId, UserId};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::PermissionConfig;
use crate::error::{RbacError, Result};
use crate::fetch::PermissionFetcher;
use crate::permission::{Grant, PermissionSetDescriptor};

type SharedLoad = Shared<BoxFuture<'static, Result<LoadOutcome>>>;

/// Load state of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPhase {
	Unloaded,
	Loading,
	Loaded,
}

/// The authenticated user and the role whose grant is being checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub user_id: UserId,
	pub role_id: RoleId,
}

impl Session {
	pub fn new(user_id: impl Into<String>, role_id: i64) -> Self {
		Self {
			user_id: UserId::new(user_id),
			role_id: RoleId(role_id),
		}
	}
}

/// Result of [`PermissionResolver::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
	/// The grant is loaded. `cached` is true when no fetch was needed.
	Loaded { cached: bool },
	/// The session changed while the fetch was running; its result was dropped.
	Superseded,
}

struct State {
	phase: PermissionPhase,
	session: Option<Session>,
	grant: Option<Arc<Grant>>,
	expires_at: Option<Instant>,
	/// Bumped by every session change and invalidation.
	generation: u64,
	/// Fetch of the current generation, joined by concurrent loads.
	inflight: Option<SharedLoad>,
}

impl State {
	fn unload(&mut self) {
		self.phase = PermissionPhase::Unloaded;
		self.grant = None;
		self.expires_at = None;
		self.inflight = None;
		self.generation += 1;
	}

	fn install(&mut self, grant: Arc<Grant>, expires_at: Instant) {
		self.phase = PermissionPhase::Loaded;
		self.grant = Some(grant);
		self.expires_at = Some(expires_at);
	}
}

struct Inner {
	cache: ResourceCache<UserId, Arc<Grant>>,
	config: PermissionConfig,
	state: RwLock<State>,
}

impl Inner {
	/// Installs a fetch result unless the session moved on while it ran.
	fn complete_load(&self, session: &Session, generation: u64, fetched: std::result::Result<Vec<PermissionSetDescriptor>, FetchError>) -> Result<LoadOutcome> {
		let mut state = self.state.write();
		if state.generation != generation {
			debug!(user = %session.user_id, "discarding permissions for superseded session");
			return Ok(LoadOutcome::Superseded);
		}
		state.inflight = None;

		let descriptors = match fetched {
			Ok(descriptors) => descriptors,
			Err(source) => {
				state.phase = PermissionPhase::Unloaded;
				warn!(user = %session.user_id, error = %source, "permission fetch failed, denying all");
				return Err(RbacError::Fetch {
					user: session.user_id.clone(),
					source,
				});
			}
		};

		if !descriptors.iter().any(|d| d.role_id == session.role_id) {
			warn!(user = %session.user_id, role = %session.role_id, "no permission set for role, denying all");
		}
		let grant = Arc::new(Grant::resolve(session.role_id, &descriptors, self.config.policy));
		debug!(
			user = %session.user_id,
			role = %session.role_id,
			permissions = grant.permissions.len(),
			high_privilege = grant.high_privilege,
			"permissions loaded"
		);
		self.cache.set(session.user_id.clone(), Arc::clone(&grant));
		state.install(grant, Instant::now() + self.config.cache_ttl);
		Ok(LoadOutcome::Loaded { cached: false })
	}

	/// Resets a load whose fetch task died before installing anything.
	fn abandon_load(&self, user: &UserId, generation: u64, error: &JoinError) -> Result<LoadOutcome> {
		let mut state = self.state.write();
		if state.generation == generation {
			state.inflight = None;
			state.phase = PermissionPhase::Unloaded;
		}
		warn!(%user, %error, "permission fetch aborted, denying all");
		Err(RbacError::Aborted { user: user.clone() })
	}
}

/// Resolves permission checks for the current session.
///
/// Concurrent [`load`](Self::load) calls share one fetch. The fetch runs as a
/// runtime task, so its result is installed even if every caller stops waiting.
pub struct PermissionResolver {
	fetcher: Arc<dyn PermissionFetcher>,
	inner: Arc<Inner>,
}

impl PermissionResolver {
	pub fn new(fetcher: Arc<dyn PermissionFetcher>, config: PermissionConfig) -> Self {
		Self {
			fetcher,
			inner: Arc::new(Inner {
				cache: ResourceCache::new(config.cache_ttl),
				config,
				state: RwLock::new(State {
					phase: PermissionPhase::Unloaded,
					session: None,
					grant: None,
					expires_at: None,
					generation: 0,
					inflight: None,
				}),
			}),
		}
	}

	pub fn config(&self) -> &PermissionConfig {
		&self.inner.config
	}

	/// Switches to `session`. Any change unloads the current grant; a role
	/// change also drops the user's cached grant.
	pub fn set_session(&self, session: Session) {
		let mut state = self.inner.state.write();
		if state.session.as_ref() == Some(&session) {
			return;
		}
		if let Some(previous) = &state.session
			&& previous.user_id == session.user_id
		{
			self.inner.cache.remove(&previous.user_id);
		}
		debug!(user = %session.user_id, role = %session.role_id, "permission session changed");
		state.unload();
		state.session = Some(session);
	}

	pub fn session(&self) -> Option<Session> {
		self.inner.state.read().session.clone()
	}

	/// Forgets the session and every cached grant.
	pub fn logout(&self) {
		let mut state = self.inner.state.write();
		state.unload();
		state.session = None;
		self.inner.cache.clear();
		debug!("permission session cleared");
	}

	/// Unloads the current grant and drops it from the cache; the next
	/// [`load`](Self::load) fetches again.
	pub fn invalidate(&self) {
		let mut state = self.inner.state.write();
		if let Some(session) = &state.session {
			self.inner.cache.remove(&session.user_id);
		}
		state.unload();
	}

	/// Loads the grant of the current session, from cache when fresh. Joins a
	/// fetch already running for the same session.
	pub async fn load(&self) -> Result<LoadOutcome> {
		let load = {
			let mut state = self.inner.state.write();
			let session = state.session.clone().ok_or(RbacError::NoSession)?;

			if let Some(inflight) = &state.inflight {
				debug!(user = %session.user_id, "joining in-flight permission load");
				inflight.clone()
			} else {
				if let Some(entry) = self.inner.cache.entry(&session.user_id)
					&& entry.is_fresh(Instant::now())
					&& entry.value.role_id == session.role_id
				{
					state.install(entry.value, entry.stored_at + entry.ttl);
					debug!(user = %session.user_id, "permissions loaded from cache");
					return Ok(LoadOutcome::Loaded { cached: true });
				}

				state.phase = PermissionPhase::Loading;
				let load = self.spawn_load(session, state.generation);
				state.inflight = Some(load.clone());
				load
			}
		};

		load.await
	}

	fn spawn_load(&self, session: Session, generation: u64) -> SharedLoad {
		let task = tokio::spawn({
			let fetcher = Arc::clone(&self.fetcher);
			let inner = Arc::clone(&self.inner);
			let session = session.clone();
			async move {
				let fetched = fetcher.fetch_permissions(&session.user_id).await;
				inner.complete_load(&session, generation, fetched)
			}
		});
		let inner = Arc::clone(&self.inner);
		async move {
			match task.await {
				Ok(outcome) => outcome,
				Err(error) => inner.abandon_load(&session.user_id, generation, &error),
			}
		}
		.boxed()
		.shared()
	}

	/// Current phase, after applying grant expiry.
	pub fn phase(&self) -> PermissionPhase {
		self.current_grant();
		self.inner.state.read().phase
	}

	/// The loaded grant, or `None` while unloaded, loading or expired.
	pub fn grant(&self) -> Option<Arc<Grant>> {
		self.current_grant()
	}

	/// Returns true if the loaded grant allows `name`. Fail-closed.
	pub fn has_permission(&self, name: &str) -> bool {
		self.current_grant().is_some_and(|grant| grant.allows(name))
	}

	/// Returns true if the loaded grant allows at least one of `names`.
	pub fn has_any_permission(&self, names: &[&str]) -> bool {
		self.current_grant().is_some_and(|grant| names.iter().any(|name| grant.allows(name)))
	}

	/// Returns true if the loaded grant allows every one of `names`.
	pub fn has_all_permissions(&self, names: &[&str]) -> bool {
		self.current_grant().is_some_and(|grant| names.iter().all(|name| grant.allows(name)))
	}

	/// Returns true if the loaded grant short-circuits every check.
	pub fn is_high_privilege(&self) -> bool {
		self.current_grant().is_some_and(|grant| grant.high_privilege)
	}

	/// Explicitly granted permission names in lexical order; empty unless loaded.
	pub fn permissions(&self) -> Vec<String> {
		self.current_grant()
			.map(|grant| grant.permissions.sorted().into_iter().map(str::to_owned).collect())
			.unwrap_or_default()
	}

	fn current_grant(&self) -> Option<Arc<Grant>> {
		let state = self.inner.state.upgradable_read();
		if state.phase != PermissionPhase::Loaded {
			return None;
		}
		match state.expires_at {
			Some(expires_at) if Instant::now() >= expires_at => {
				let mut state = RwLockUpgradableReadGuard::upgrade(state);
				if let Some(session) = &state.session {
					debug!(user = %session.user_id, "permission grant expired");
				}
				state.unload();
				None
			}
			_ => state.grant.clone(),
		}
	}
}
