use crate::permission::PermissionSet;

/// Permission count at which [`PrivilegePolicy::PermissionCount`] grants everything by default.
pub const DEFAULT_HIGH_PRIVILEGE_THRESHOLD: usize = 10;

/// Decides which grants short-circuit every check to "allow".
///
/// Counting permissions stands in for a missing administrator flag on the
/// backend. Prefer [`ExplicitFlag`](Self::ExplicitFlag) once descriptors carry
/// the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegePolicy {
	/// Roles holding at least `threshold` distinct permissions are high privilege.
	PermissionCount { threshold: usize },
	/// Only descriptors with `high_privilege: true` are high privilege.
	ExplicitFlag,
	/// No role is high privilege; every check is a membership test.
	Disabled,
}

impl Default for PrivilegePolicy {
	fn default() -> Self {
		Self::PermissionCount {
			threshold: DEFAULT_HIGH_PRIVILEGE_THRESHOLD,
		}
	}
}

impl PrivilegePolicy {
	/// Returns true if a role with `permissions` (and the descriptor flag
	/// `flagged`) grants everything.
	pub fn is_high_privilege(&self, permissions: &PermissionSet, flagged: bool) -> bool {
		match *self {
			Self::PermissionCount { threshold } => permissions.len() >= threshold,
			Self::ExplicitFlag => flagged,
			Self::Disabled => false,
		}
	}
}
