use convoy_primitives::ResourceKey;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Refreshable fleet collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FleetResource {
	Companies,
	Branches,
	Vans,
	Employees,
	Trips,
}

impl FleetResource {
	/// Resource key used for refresh and cache lookups.
	pub fn key(self) -> ResourceKey {
		ResourceKey::new(self.as_ref())
	}

	/// Permission name for performing `action` on this resource, e.g. `vans:update`.
	pub fn permission(self, action: Action) -> String {
		format!("{self}:{action}")
	}
}

/// Operation half of a permission name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
	Read,
	Create,
	Update,
	Delete,
}

/// Permission names checked by the fleet screens.
pub mod permissions {
	pub const COMPANIES_READ: &str = "companies:read";
	pub const COMPANIES_CREATE: &str = "companies:create";
	pub const COMPANIES_UPDATE: &str = "companies:update";
	pub const COMPANIES_DELETE: &str = "companies:delete";
	pub const BRANCHES_READ: &str = "branches:read";
	pub const VANS_READ: &str = "vans:read";
	pub const VANS_CREATE: &str = "vans:create";
	pub const VANS_UPDATE: &str = "vans:update";
	pub const VANS_DELETE: &str = "vans:delete";
	pub const EMPLOYEES_READ: &str = "employees:read";
	pub const EMPLOYEES_UPDATE: &str = "employees:update";
	pub const TRIPS_READ: &str = "trips:read";
	pub const TRIPS_CREATE: &str = "trips:create";
	pub const TRIPS_UPDATE: &str = "trips:update";
	pub const TRIPS_DELETE: &str = "trips:delete";
}
