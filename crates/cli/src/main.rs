//! `convoy` command-line driver.

mod cli;
mod commands;
mod fixtures;
mod logging;


use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use convoy_config::load_config;
use convoy_rbac::Session;
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	let loaded = load_config(cli.config.as_deref()).context("loading configuration")?;
	logging::setup_tracing(&loaded.config.log, cli.verbose)?;
	if let Some(source) = &loaded.source {
		debug!(path = %source.display(), "configuration loaded");
	}

	let config = loaded.config;
	let mut out = std::io::stdout();
	match cli.command {
		Command::Diff { old, new, ignore, json } => commands::run_diff(&old, &new, &ignore, json, &mut out)?,
		Command::Check {
			fixtures,
			user,
			role,
			permissions,
		} => {
			let session = Session::new(user, role);
			if !commands::run_check(&fixtures, session, &permissions, config.permission_config(), &mut out).await? {
				return Ok(ExitCode::FAILURE);
			}
		}
		Command::Watch {
			fixtures,
			resource,
			cycles,
			interval_ms,
		} => {
			let interval = interval_ms.map(Duration::from_millis);
			commands::run_watch(&fixtures, &resource, cycles, interval, config.refresh_config(), &mut out).await?;
		}
	}
	Ok(ExitCode::SUCCESS)
}
