use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use convoy_fleet::{Action, FleetResource};
use convoy_rbac::{PermissionConfig, PermissionResolver, Session};
use strum::IntoEnumIterator;

use crate::fixtures::FixtureStore;

/// Answer for every checked permission name.
#[derive(Debug)]
pub struct CheckReport {
	pub high_privilege: bool,
	pub results: Vec<(String, bool)>,
}

impl CheckReport {
	pub fn all_allowed(&self) -> bool {
		self.results.iter().all(|(_, allowed)| *allowed)
	}
}

/// Loads the session's grant from `fixtures` and checks `names` against it.
///
/// An empty `names` checks every fleet resource and action.
pub async fn check_permissions(fixtures: &Path, session: Session, names: &[String], config: PermissionConfig) -> anyhow::Result<CheckReport> {
	let resolver = PermissionResolver::new(Arc::new(FixtureStore::new(fixtures)), config);
	resolver.set_session(session);
	resolver.load().await?;

	let names: Vec<String> = if names.is_empty() {
		FleetResource::iter()
			.flat_map(|resource| Action::iter().map(move |action| resource.permission(action)))
			.collect()
	} else {
		names.to_vec()
	};

	let results = names
		.into_iter()
		.map(|name| {
			let allowed = resolver.has_permission(&name);
			(name, allowed)
		})
		.collect();
	Ok(CheckReport {
		high_privilege: resolver.is_high_privilege(),
		results,
	})
}

pub async fn run_check(fixtures: &Path, session: Session, names: &[String], config: PermissionConfig, out: &mut impl Write) -> anyhow::Result<bool> {
	let report = check_permissions(fixtures, session, names, config).await?;
	if report.high_privilege {
		writeln!(out, "role is high privilege: every permission granted")?;
	}
	for (name, allowed) in &report.results {
		writeln!(out, "{} {name}", if *allowed { "allow" } else { "deny " })?;
	}
	Ok(report.all_allowed())
}
