//! Fleet domain records.
//!
//! Every record type implements [`Record`](convoy_primitives::Record) with its
//! integer `id` as identity, so collections of them reconcile like any other.

mod records;
mod resource;
mod trip;


pub use records::{Branch, Company, Employee, Van, VanStatus};
pub use resource::{Action, FleetResource, permissions};
pub use trip::{Trip, TripError, TripStatus, complete_trip, delete_trip, start_trip};
