use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use convoy_primitives::{FetchError, RoleId, UserId};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::*;

#[derive(Default)]
struct ScriptedPermissions {
	calls: AtomicUsize,
	responses: Mutex<VecDeque<std::result::Result<Vec<PermissionSetDescriptor>, FetchError>>>,
	gate: Option<Arc<Semaphore>>,
}

impl ScriptedPermissions {
	fn new(responses: impl IntoIterator<Item = std::result::Result<Vec<PermissionSetDescriptor>, FetchError>>) -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(responses.into_iter().collect()),
			..Self::default()
		})
	}

	fn gated(responses: impl IntoIterator<Item = std::result::Result<Vec<PermissionSetDescriptor>, FetchError>>, gate: Arc<Semaphore>) -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(responses.into_iter().collect()),
			gate: Some(gate),
			..Self::default()
		})
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl PermissionFetcher for ScriptedPermissions {
	async fn fetch_permissions(&self, _user: &UserId) -> std::result::Result<Vec<PermissionSetDescriptor>, FetchError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if let Some(gate) = &self.gate {
			gate.acquire().await.expect("gate closed").forget();
		}
		self.responses.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
	}
}

fn descriptor(role: i64, permissions: &[&str]) -> PermissionSetDescriptor {
	PermissionSetDescriptor {
		role_id: RoleId(role),
		permissions: permissions.iter().map(|name| name.to_string()).collect(),
		high_privilege: false,
	}
}

fn numbered(role: i64, count: usize) -> PermissionSetDescriptor {
	PermissionSetDescriptor {
		role_id: RoleId(role),
		permissions: (0..count).map(|i| format!("resource{i}:read")).collect(),
		high_privilege: false,
	}
}

fn resolver(fetcher: &Arc<ScriptedPermissions>, config: PermissionConfig) -> PermissionResolver {
	PermissionResolver::new(Arc::clone(fetcher) as Arc<dyn PermissionFetcher>, config)
}

#[tokio::test]
async fn unloaded_resolver_denies_everything() {
	let fetcher = ScriptedPermissions::new([]);
	let resolver = resolver(&fetcher, PermissionConfig::default());

	assert_eq!(resolver.phase(), PermissionPhase::Unloaded);
	assert!(!resolver.has_permission("companies:read"));
	assert!(!resolver.has_any_permission(&["companies:read"]));
	assert!(!resolver.has_all_permissions(&[]));
	assert!(!resolver.is_high_privilege());
	assert!(resolver.permissions().is_empty());
	assert_eq!(resolver.load().await, Err(RbacError::NoSession));
	assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn loaded_grant_answers_membership() {
	let fetcher = ScriptedPermissions::new([Ok(vec![
		descriptor(2, &["vans:read", "trips:read", "trips:create"]),
		descriptor(3, &["companies:delete"]),
	])]);
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("alice", 2));

	assert_eq!(resolver.load().await, Ok(LoadOutcome::Loaded { cached: false }));
	assert_eq!(resolver.phase(), PermissionPhase::Loaded);
	assert!(resolver.has_permission("trips:create"));
	assert!(!resolver.has_permission("companies:delete"));
	assert!(resolver.has_any_permission(&["companies:delete", "vans:read"]));
	assert!(!resolver.has_all_permissions(&["vans:read", "vans:delete"]));
	assert!(!resolver.is_high_privilege());
	assert_eq!(resolver.permissions(), vec!["trips:create", "trips:read", "vans:read"]);
}

#[tokio::test]
async fn twelve_permissions_grant_everything() {
	let fetcher = ScriptedPermissions::new([Ok(vec![numbered(1, 12)])]);
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("admin", 1));
	resolver.load().await.expect("load succeeds");

	assert!(resolver.is_high_privilege());
	assert!(resolver.has_permission("anything:whatsoever"));
}

#[test]
fn permission_count_threshold_is_inclusive() {
	let policy = PrivilegePolicy::default();
	let nine: PermissionSet = (0..9).map(|i| format!("p{i}")).collect();
	let ten: PermissionSet = (0..10).map(|i| format!("p{i}")).collect();

	assert!(!policy.is_high_privilege(&nine, false));
	assert!(policy.is_high_privilege(&ten, false));
	assert!(PrivilegePolicy::PermissionCount { threshold: 3 }.is_high_privilege(&nine, false));
	assert!(!PrivilegePolicy::Disabled.is_high_privilege(&ten, true));
}

#[tokio::test]
async fn explicit_flag_policy_ignores_permission_count() {
	let mut flagged = descriptor(5, &["vans:read"]);
	flagged.high_privilege = true;
	let fetcher = ScriptedPermissions::new([Ok(vec![numbered(4, 12), flagged])]);
	let config = PermissionConfig {
		policy: PrivilegePolicy::ExplicitFlag,
		..PermissionConfig::default()
	};
	let resolver = resolver(&fetcher, config);

	resolver.set_session(Session::new("manager", 4));
	resolver.load().await.expect("load succeeds");
	assert!(!resolver.is_high_privilege());
	assert!(!resolver.has_permission("anything:whatsoever"));

	resolver.set_session(Session::new("owner", 5));
	resolver.load().await.expect("load succeeds");
	assert!(resolver.is_high_privilege());
	assert!(resolver.has_permission("anything:whatsoever"));
}

#[tokio::test]
async fn loading_resolver_denies_until_fetch_completes() {
	let gate = Arc::new(Semaphore::new(0));
	let fetcher = ScriptedPermissions::gated([Ok(vec![descriptor(2, &["vans:read"])])], Arc::clone(&gate));
	let resolver = Arc::new(resolver(&fetcher, PermissionConfig::default()));
	resolver.set_session(Session::new("alice", 2));

	let pending = tokio::spawn({
		let resolver = Arc::clone(&resolver);
		async move { resolver.load().await }
	});
	while fetcher.calls() == 0 {
		tokio::task::yield_now().await;
	}
	assert_eq!(resolver.phase(), PermissionPhase::Loading);
	assert!(!resolver.has_permission("vans:read"));

	gate.add_permits(1);
	assert_eq!(pending.await.expect("load task panicked"), Ok(LoadOutcome::Loaded { cached: false }));
	assert!(resolver.has_permission("vans:read"));
}

#[tokio::test]
async fn fetch_failure_stays_fail_closed() {
	let fetcher = ScriptedPermissions::new([Err(FetchError::transport("timeout")), Ok(vec![descriptor(2, &["vans:read"])])]);
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("alice", 2));

	let error = resolver.load().await.expect_err("fetch failure surfaces");
	assert!(matches!(error, RbacError::Fetch { .. }));
	assert_eq!(resolver.phase(), PermissionPhase::Unloaded);
	assert!(!resolver.has_permission("vans:read"));

	resolver.load().await.expect("retry succeeds");
	assert!(resolver.has_permission("vans:read"));
}

#[tokio::test]
async fn session_change_discards_running_fetch() {
	let gate = Arc::new(Semaphore::new(0));
	let fetcher = ScriptedPermissions::gated(
		[Ok(vec![numbered(1, 12)]), Ok(vec![descriptor(2, &["vans:read"])])],
		Arc::clone(&gate),
	);
	let resolver = Arc::new(resolver(&fetcher, PermissionConfig::default()));
	resolver.set_session(Session::new("admin", 1));

	let pending = tokio::spawn({
		let resolver = Arc::clone(&resolver);
		async move { resolver.load().await }
	});
	while fetcher.calls() == 0 {
		tokio::task::yield_now().await;
	}

	resolver.set_session(Session::new("driver", 2));
	gate.add_permits(1);
	assert_eq!(pending.await.expect("load task panicked"), Ok(LoadOutcome::Superseded));
	assert_eq!(resolver.phase(), PermissionPhase::Unloaded);
	assert!(!resolver.has_permission("anything:whatsoever"));

	gate.add_permits(1);
	resolver.load().await.expect("load succeeds");
	assert!(resolver.has_permission("vans:read"));
	assert!(!resolver.is_high_privilege());
}

#[tokio::test(start_paused = true)]
async fn grant_expires_after_cache_window() {
	let fetcher = ScriptedPermissions::new([Ok(vec![descriptor(2, &["vans:read"])]), Ok(vec![descriptor(2, &["vans:read"])])]);
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("alice", 2));
	resolver.load().await.expect("load succeeds");

	tokio::time::advance(DEFAULT_PERMISSION_TTL - Duration::from_secs(1)).await;
	assert!(resolver.has_permission("vans:read"));

	tokio::time::advance(Duration::from_secs(1)).await;
	assert!(!resolver.has_permission("vans:read"));
	assert_eq!(resolver.phase(), PermissionPhase::Unloaded);

	assert_eq!(resolver.load().await, Ok(LoadOutcome::Loaded { cached: false }));
	assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn returning_user_loads_from_cache() {
	let fetcher = ScriptedPermissions::new([Ok(vec![descriptor(2, &["vans:read"])]), Ok(vec![descriptor(3, &["trips:read"])])]);
	let resolver = resolver(&fetcher, PermissionConfig::default());

	resolver.set_session(Session::new("alice", 2));
	resolver.load().await.expect("load succeeds");
	resolver.set_session(Session::new("bob", 3));
	resolver.load().await.expect("load succeeds");
	assert!(resolver.has_permission("trips:read"));

	resolver.set_session(Session::new("alice", 2));
	assert!(!resolver.has_permission("vans:read"));
	assert_eq!(resolver.load().await, Ok(LoadOutcome::Loaded { cached: true }));
	assert!(resolver.has_permission("vans:read"));
	assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn role_change_refetches() {
	let fetcher = ScriptedPermissions::new([
		Ok(vec![descriptor(2, &["vans:read"]), descriptor(3, &["trips:read"])]),
		Ok(vec![descriptor(2, &["vans:read"]), descriptor(3, &["trips:read"])]),
	]);
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("alice", 2));
	resolver.load().await.expect("load succeeds");

	resolver.set_session(Session::new("alice", 3));
	assert_eq!(resolver.load().await, Ok(LoadOutcome::Loaded { cached: false }));
	assert!(resolver.has_permission("trips:read"));
	assert!(!resolver.has_permission("vans:read"));
	assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn missing_role_descriptor_denies_all() {
	let fetcher = ScriptedPermissions::new([Ok(vec![numbered(1, 12)])]);
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("driver", 9));

	resolver.load().await.expect("load succeeds");
	assert_eq!(resolver.phase(), PermissionPhase::Loaded);
	assert!(!resolver.has_permission("resource0:read"));
	assert!(!resolver.is_high_privilege());
}

#[tokio::test]
async fn logout_and_invalidate_unload() {
	let fetcher = ScriptedPermissions::new((0..3).map(|_| Ok(vec![descriptor(2, &["vans:read"])])));
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("alice", 2));
	resolver.load().await.expect("load succeeds");

	resolver.invalidate();
	assert!(!resolver.has_permission("vans:read"));
	assert_eq!(resolver.load().await, Ok(LoadOutcome::Loaded { cached: false }));

	resolver.logout();
	assert!(resolver.session().is_none());
	assert!(!resolver.has_permission("vans:read"));
	assert_eq!(resolver.load().await, Err(RbacError::NoSession));
	assert_eq!(fetcher.calls(), 2);
}

#[test]
fn descriptor_flag_defaults_to_false() {
	let descriptor: PermissionSetDescriptor =
		serde_json::from_str(r#"{"role_id": 2, "permissions": ["vans:read", "vans:read"]}"#).expect("valid descriptor");
	assert!(!descriptor.high_privilege);

	let grant = Grant::resolve(RoleId(2), &[descriptor], PrivilegePolicy::default());
	assert_eq!(grant.permissions.len(), 1);
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
	let gate = Arc::new(Semaphore::new(0));
	let fetcher = ScriptedPermissions::gated(
		[Ok(vec![descriptor(2, &["vans:read"])]), Err(FetchError::transport("timeout"))],
		Arc::clone(&gate),
	);
	let resolver = Arc::new(resolver(&fetcher, PermissionConfig::default()));
	resolver.set_session(Session::new("alice", 2));

	let loads: Vec<_> = (0..3)
		.map(|_| {
			let resolver = Arc::clone(&resolver);
			tokio::spawn(async move { resolver.load().await })
		})
		.collect();
	while fetcher.calls() == 0 {
		tokio::task::yield_now().await;
	}

	gate.add_permits(2);
	for load in loads {
		let outcome = load.await.expect("load task panicked");
		assert!(matches!(outcome, Ok(LoadOutcome::Loaded { .. })), "unexpected outcome {outcome:?}");
	}
	assert_eq!(fetcher.calls(), 1);
	assert_eq!(resolver.phase(), PermissionPhase::Loaded);
	assert!(resolver.has_permission("vans:read"));
}

#[tokio::test(start_paused = true)]
async fn abandoned_load_still_installs_grant() {
	let gate = Arc::new(Semaphore::new(0));
	let fetcher = ScriptedPermissions::gated([Ok(vec![descriptor(2, &["vans:read"])])], Arc::clone(&gate));
	let resolver = resolver(&fetcher, PermissionConfig::default());
	resolver.set_session(Session::new("alice", 2));

	let timed_out = tokio::time::timeout(Duration::from_millis(10), resolver.load()).await;
	assert!(timed_out.is_err());
	assert_eq!(resolver.phase(), PermissionPhase::Loading);

	gate.add_permits(1);
	while resolver.phase() == PermissionPhase::Loading {
		tokio::task::yield_now().await;
	}
	assert!(resolver.has_permission("vans:read"));
	assert_eq!(resolver.load().await, Ok(LoadOutcome::Loaded { cached: true }));
	assert_eq!(fetcher.calls(), 1);
}
