use convoy_config::{LogFormat, LogSection};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_tracing(log: &LogSection, verbose: u8) -> anyhow::Result<()> {
	let level = match verbose {
		0 => log.level.as_str(),
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

	let installed = match log.format {
		LogFormat::Json => builder.json().try_init(),
		LogFormat::Pretty => builder.try_init(),
	};
	installed.map_err(|error| anyhow::anyhow!(error))
}
