//! Core types shared by the reconciliation, refresh and permission crates.

/// Structural equality over JSON values.
pub mod equality;
/// Fetch contract error type.
pub mod error;
/// Identifier newtypes for users, roles and resources.
pub mod ids;
/// Record identity and the [`Record`] trait.
pub mod record;

pub use equality::{structural_eq, structural_eq_ignoring};
pub use error::{FetchError, FetchErrorKind};
pub use ids::{ResourceKey, RoleId, UserId};
pub use record::{ID_FIELD, Record, RecordKey};
