//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	/// A configuration file is not valid TOML or has unknown or mistyped keys.
	#[error("failed to parse {path}: {error}")]
	Parse { path: PathBuf, error: toml::de::Error },

	/// Inline TOML could not be parsed.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for {field}: {reason}")]
	Invalid { field: &'static str, reason: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
