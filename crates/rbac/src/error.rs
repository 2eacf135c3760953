use convoy_primitives::{FetchError, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
	/// `load` was called before a session was set.
	#[error("no active session")]
	NoSession,
	/// The permission fetch failed; the resolver stays fail-closed.
	#[error("failed to fetch permissions for user {user}: {source}")]
	Fetch { user: UserId, source: FetchError },
	/// The fetch task panicked or was cancelled before installing a grant.
	#[error("permission fetch for user {user} aborted")]
	Aborted { user: UserId },
}

pub type Result<T> = std::result::Result<T, RbacError>;
