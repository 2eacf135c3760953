//! Fetch collaborators backed by JSON files in a directory.
//!
//! `<dir>/<resource>.json` holds an array of records; `<dir>/permissions.json`
//! maps user ids to their permission set descriptors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use convoy_primitives::{FetchError, FetchErrorKind, ResourceKey, UserId};
use convoy_rbac::{PermissionFetcher, PermissionSetDescriptor};
use convoy_refresh::ResourceFetcher;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const PERMISSIONS_FILE: &str = "permissions.json";

#[derive(Debug, Clone)]
pub struct FixtureStore {
	root: PathBuf,
}

impl FixtureStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// File holding the records of `key`. Keys must be plain file stems.
	pub fn resource_path(&self, key: &ResourceKey) -> Result<PathBuf, FetchError> {
		let name = key.as_str();
		if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
			return Err(FetchError::new(FetchErrorKind::Backend, format!("invalid resource name {name:?}")));
		}
		Ok(self.root.join(format!("{name}.json")))
	}

	fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, FetchError> {
		let content = std::fs::read_to_string(path).map_err(|error| FetchError::transport(format!("{}: {error}", path.display())))?;
		serde_json::from_str(&content).map_err(|error| FetchError::decode(format!("{}: {error}", path.display())))
	}
}

#[async_trait]
impl ResourceFetcher<Value> for FixtureStore {
	async fn fetch(&self, key: &ResourceKey) -> Result<Vec<Value>, FetchError> {
		let path = self.resource_path(key)?;
		self.read_json(&path)
	}
}

#[async_trait]
impl PermissionFetcher for FixtureStore {
	async fn fetch_permissions(&self, user: &UserId) -> Result<Vec<PermissionSetDescriptor>, FetchError> {
		let mut by_user: BTreeMap<UserId, Vec<PermissionSetDescriptor>> = self.read_json(&self.root.join(PERMISSIONS_FILE))?;
		Ok(by_user.remove(user).unwrap_or_default())
	}
}
