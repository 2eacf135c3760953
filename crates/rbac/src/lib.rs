//! Role-based permission resolution.
//!
//! [`PermissionResolver`] answers `has_permission` synchronously from a grant
//! loaded asynchronously through a [`PermissionFetcher`]:
//!
//! ```text
//! Unloaded ─ load() ─► Loading ─ fetch ok ─► Loaded
//!    ▲                    │                    │
//!    └──── fetch error ───┘   session change, logout, invalidate, expiry
//! ```
//!
//! Every question asked outside `Loaded` is answered with `false`.

mod config;
mod error;
mod fetch;
mod permission;
mod policy;
mod resolver;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_PERMISSION_TTL, PermissionConfig};
pub use error::{RbacError, Result};
pub use fetch::PermissionFetcher;
pub use permission::{Grant, PermissionSet, PermissionSetDescriptor};
pub use policy::{DEFAULT_HIGH_PRIVILEGE_THRESHOLD, PrivilegePolicy};
pub use resolver::{LoadOutcome, PermissionPhase, PermissionResolver, Session};
