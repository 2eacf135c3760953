//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use crate::ConvoyConfig;
use crate::error::{ConfigError, Result};

/// Directory under the platform config dir holding convoy settings.
pub const CONFIG_DIR: &str = "convoy";
/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Loaded configuration and where it came from.
#[derive(Debug, Default)]
pub struct ConfigLoadReport {
	pub config: ConvoyConfig,
	/// File the config was read from; `None` when defaults were used.
	pub source: Option<PathBuf>,
}

/// `$XDG_CONFIG_HOME/convoy/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Loads configuration from `explicit`, or from [`default_config_path`].
///
/// An explicit path must exist. A missing discovered file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigLoadReport> {
	let path = match explicit {
		Some(path) => path.to_path_buf(),
		None => match default_config_path() {
			Some(path) if path.exists() => path,
			_ => return Ok(ConfigLoadReport::default()),
		},
	};

	let config = load_config_file(&path)?;
	Ok(ConfigLoadReport { config, source: Some(path) })
}

/// Reads, parses and validates one config file.
pub fn load_config_file(path: &Path) -> Result<ConvoyConfig> {
	let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
		path: path.to_path_buf(),
		error,
	})?;
	let config: ConvoyConfig = toml::from_str(&content).map_err(|error| ConfigError::Parse {
		path: path.to_path_buf(),
		error,
	})?;
	config.validate()?;
	Ok(config)
}
