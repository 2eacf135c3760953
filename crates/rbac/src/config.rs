use std::time::Duration;

use crate::policy::PrivilegePolicy;

/// Default lifetime of a loaded grant.
pub const DEFAULT_PERMISSION_TTL: Duration = Duration::from_secs(300);

/// Resolver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionConfig {
	/// How long a fetched grant answers checks before the resolver unloads it.
	pub cache_ttl: Duration,
	pub policy: PrivilegePolicy,
}

impl Default for PermissionConfig {
	fn default() -> Self {
		Self {
			cache_ttl: DEFAULT_PERMISSION_TTL,
			policy: PrivilegePolicy::default(),
		}
	}
}
