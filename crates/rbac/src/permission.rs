use std::fmt;

use convoy_primitives::RoleId;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::policy::PrivilegePolicy;

/// Set of permission names such as `companies:read`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
	names: FxHashSet<String>,
}

impl PermissionSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<String>) -> bool {
		self.names.insert(name.into())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.names.contains(name)
	}

	/// Number of distinct permission names.
	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Permission names in lexical order.
	pub fn sorted(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}

impl fmt::Debug for PermissionSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.sorted()).finish()
	}
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self {
			names: iter.into_iter().map(Into::into).collect(),
		}
	}
}

impl<S: Into<String>> Extend<S> for PermissionSet {
	fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
		self.names.extend(iter.into_iter().map(Into::into));
	}
}

/// One role grant as returned by the permission fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSetDescriptor {
	pub role_id: RoleId,
	pub permissions: Vec<String>,
	/// Explicit administrator marker, honored by [`PrivilegePolicy::ExplicitFlag`].
	#[serde(default)]
	pub high_privilege: bool,
}

/// Permissions resolved for one role, with the privilege decision already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
	pub role_id: RoleId,
	pub permissions: PermissionSet,
	/// Grants every permission regardless of `permissions`.
	pub high_privilege: bool,
}

impl Grant {
	/// Builds the grant of `role_id` from fetched descriptors.
	///
	/// Descriptors for the same role are merged. A role with no descriptor
	/// resolves to an empty grant.
	pub fn resolve(role_id: RoleId, descriptors: &[PermissionSetDescriptor], policy: PrivilegePolicy) -> Self {
		let mut permissions = PermissionSet::new();
		let mut flagged = false;
		for descriptor in descriptors.iter().filter(|d| d.role_id == role_id) {
			permissions.extend(descriptor.permissions.iter().cloned());
			flagged |= descriptor.high_privilege;
		}
		let high_privilege = policy.is_high_privilege(&permissions, flagged);
		Self {
			role_id,
			permissions,
			high_privilege,
		}
	}

	pub fn allows(&self, name: &str) -> bool {
		self.high_privilege || self.permissions.contains(name)
	}
}
