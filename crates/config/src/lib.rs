//! Configuration for the convoy workspace.
//!
//! ```toml
//! [refresh]
//! min_interval_ms = 1000
//! stale_after_secs = 30
//! poll_interval_ms = 15000
//!
//! [permissions]
//! cache_secs = 300
//! privilege_policy = "permission_count"
//! privilege_threshold = 10
//!
//! [log]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! Every key is optional. Unknown keys are errors.

mod error;
mod load;


use std::time::Duration;

use convoy_rbac::{DEFAULT_HIGH_PRIVILEGE_THRESHOLD, PermissionConfig, PrivilegePolicy};
use convoy_refresh::RefreshConfig;
use serde::{Deserialize, Serialize};

pub use error::{ConfigError, Result};
pub use load::{CONFIG_DIR, CONFIG_FILE, ConfigLoadReport, default_config_path, load_config, load_config_file};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvoyConfig {
	pub refresh: RefreshSection,
	pub permissions: PermissionSection,
	pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshSection {
	/// Throttle window between two refreshes of one resource.
	pub min_interval_ms: u64,
	/// Age after which a committed snapshot is stale.
	pub stale_after_secs: u64,
	/// Timer-driven refresh period; absent disables polling.
	pub poll_interval_ms: Option<u64>,
}

impl Default for RefreshSection {
	fn default() -> Self {
		Self {
			min_interval_ms: 1000,
			stale_after_secs: 30,
			poll_interval_ms: None,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
	#[default]
	PermissionCount,
	ExplicitFlag,
	Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionSection {
	/// Lifetime of a loaded permission grant.
	pub cache_secs: u64,
	pub privilege_policy: PolicyKind,
	/// Only read by the `permission_count` policy.
	pub privilege_threshold: usize,
}

impl Default for PermissionSection {
	fn default() -> Self {
		Self {
			cache_secs: 300,
			privilege_policy: PolicyKind::PermissionCount,
			privilege_threshold: DEFAULT_HIGH_PRIVILEGE_THRESHOLD,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Trace,
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl LogLevel {
	/// Directive understood by `tracing_subscriber::EnvFilter`.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Trace => "trace",
			Self::Debug => "debug",
			Self::Info => "info",
			Self::Warn => "warn",
			Self::Error => "error",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
	pub level: LogLevel,
	pub format: LogFormat,
}

impl ConvoyConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(content: &str) -> Result<Self> {
		let config: Self = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values that parse but cannot be used.
	pub fn validate(&self) -> Result<()> {
		if self.refresh.poll_interval_ms == Some(0) {
			return Err(ConfigError::Invalid {
				field: "refresh.poll_interval_ms",
				reason: "must be positive; omit the key to disable polling".to_string(),
			});
		}
		if self.refresh.stale_after_secs == 0 {
			return Err(ConfigError::Invalid {
				field: "refresh.stale_after_secs",
				reason: "must be positive".to_string(),
			});
		}
		if self.permissions.privilege_policy == PolicyKind::PermissionCount && self.permissions.privilege_threshold == 0 {
			return Err(ConfigError::Invalid {
				field: "permissions.privilege_threshold",
				reason: "a zero threshold would grant every role everything".to_string(),
			});
		}
		Ok(())
	}

	pub fn refresh_config(&self) -> RefreshConfig {
		RefreshConfig {
			min_interval: Duration::from_millis(self.refresh.min_interval_ms),
			stale_after: Duration::from_secs(self.refresh.stale_after_secs),
			poll_interval: self.refresh.poll_interval_ms.map(Duration::from_millis),
		}
	}

	pub fn privilege_policy(&self) -> PrivilegePolicy {
		match self.permissions.privilege_policy {
			PolicyKind::PermissionCount => PrivilegePolicy::PermissionCount {
				threshold: self.permissions.privilege_threshold,
			},
			PolicyKind::ExplicitFlag => PrivilegePolicy::ExplicitFlag,
			PolicyKind::Disabled => PrivilegePolicy::Disabled,
		}
	}

	pub fn permission_config(&self) -> PermissionConfig {
		PermissionConfig {
			cache_ttl: Duration::from_secs(self.permissions.cache_secs),
			policy: self.privilege_policy(),
		}
	}
}
