//! Error type for the backend fetch contract.

use thiserror::Error;

/// Broad classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
	/// Network or transport failure before a response arrived.
	Transport,
	/// The backend answered with an error.
	Backend,
	/// The caller is not authorized to read the resource.
	Unauthorized,
	/// The response could not be decoded into records.
	Decode,
}

/// Failure reported by a fetch collaborator.
///
/// Cloneable so one failure can be handed to every caller waiting on the same
/// in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} fetch failure: {message}")]
pub struct FetchError {
	/// Failure classification.
	pub kind: FetchErrorKind,
	/// Human-readable detail for display.
	pub message: String,
}

impl FetchError {
	/// Creates an error of the given kind.
	pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	/// Transport failure.
	pub fn transport(message: impl Into<String>) -> Self {
		Self::new(FetchErrorKind::Transport, message)
	}

	/// Backend-reported failure.
	pub fn backend(message: impl Into<String>) -> Self {
		Self::new(FetchErrorKind::Backend, message)
	}

	/// Decode failure.
	pub fn decode(message: impl Into<String>) -> Self {
		Self::new(FetchErrorKind::Decode, message)
	}
}
