use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "convoy")]
#[command(about = "Reconcile fleet records, check permissions and watch resources")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Config file (defaults to $XDG_CONFIG_HOME/convoy/config.toml)
	#[arg(long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Increase log verbosity (-v debug, -vv trace)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Partition NEW against OLD and print the reconciliation
	Diff {
		/// JSON array holding the previous snapshot
		old: PathBuf,
		/// JSON array holding the incoming payload
		new: PathBuf,
		/// Top-level field left out of the content comparison (repeatable)
		#[arg(long = "ignore", value_name = "FIELD")]
		ignore: Vec<String>,
		/// Print the summary as JSON
		#[arg(long)]
		json: bool,
	},
	/// Resolve a user's permissions from fixtures and check names against them
	Check {
		/// Directory containing permissions.json
		#[arg(long, value_name = "DIR")]
		fixtures: PathBuf,
		/// User id to resolve
		#[arg(long)]
		user: String,
		/// Role id of the session
		#[arg(long)]
		role: i64,
		/// Permission names to check; every fleet permission when omitted
		permissions: Vec<String>,
	},
	/// Periodically refresh a fixture resource and print every change
	Watch {
		/// Directory containing RESOURCE.json
		#[arg(long, value_name = "DIR")]
		fixtures: PathBuf,
		/// Resource name, e.g. vans
		resource: String,
		/// Stop after this many snapshot changes
		#[arg(long, value_name = "N")]
		cycles: Option<usize>,
		/// Refresh period; defaults to the configured poll interval, else 2000
		#[arg(long, value_name = "MS")]
		interval_ms: Option<u64>,
	},
}
