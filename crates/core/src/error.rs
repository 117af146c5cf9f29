//! Error types for the hand-off.

use handoff_protocol::{PayloadError, TransferError};
use serde::Serialize;
use thiserror::Error;

use crate::injector::InjectionState;

/// Result type alias for hand-off operations.
pub type Result<T> = std::result::Result<T, HandoffError>;

/// Failures of a hand-off attempt.
///
/// A user closing the embedded surface is not an error; it is reported as
/// [`InjectionOutcome::ClosedByUser`](crate::InjectionOutcome::ClosedByUser).
#[derive(Debug, Error)]
pub enum HandoffError {
	/// No link was provided.
	#[error("no link provided")]
	EmptyInput,

	/// The token endpoint could not be reached at all.
	#[error("token endpoint unreachable: {0}")]
	Network(String),

	/// The token endpoint answered, but not with a usable token.
	#[error("token endpoint error: {0}")]
	Remote(String),

	/// The link is not a URL with a host.
	#[error("link is not a valid URL: {link}")]
	MalformedLink {
		link: String,
		#[source]
		source: Option<url::ParseError>,
	},

	/// The token string is not a JSON document.
	#[error("token payload is invalid: {0}")]
	InvalidPayload(#[from] PayloadError),

	/// Clearing or writing session state in the embedded surface failed.
	#[error("session injection failed: {reason}")]
	Injection {
		reason: String,
		/// States visited before the failure, ending in `Failed`.
		states: Vec<InjectionState>,
	},

	/// The hostname matches no configured destination.
	#[error("unsupported domain: {host}")]
	UnsupportedDomain { host: String },

	/// The transfer handed to the login screen lacks the domain or token.
	#[error(transparent)]
	IncompleteTransfer(#[from] TransferError),
}

/// Stable, serializable classification of [`HandoffError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	EmptyInput,
	NetworkError,
	RemoteError,
	MalformedLink,
	InvalidPayload,
	InjectionError,
	UnsupportedDomain,
	IncompleteTransfer,
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			Self::EmptyInput => "EMPTY_INPUT",
			Self::NetworkError => "NETWORK_ERROR",
			Self::RemoteError => "REMOTE_ERROR",
			Self::MalformedLink => "MALFORMED_LINK",
			Self::InvalidPayload => "INVALID_PAYLOAD",
			Self::InjectionError => "INJECTION_ERROR",
			Self::UnsupportedDomain => "UNSUPPORTED_DOMAIN",
			Self::IncompleteTransfer => "INCOMPLETE_TRANSFER",
		};
		f.write_str(code)
	}
}

impl HandoffError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::EmptyInput => ErrorKind::EmptyInput,
			Self::Network(_) => ErrorKind::NetworkError,
			Self::Remote(_) => ErrorKind::RemoteError,
			Self::MalformedLink { .. } => ErrorKind::MalformedLink,
			Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
			Self::Injection { .. } => ErrorKind::InjectionError,
			Self::UnsupportedDomain { .. } => ErrorKind::UnsupportedDomain,
			Self::IncompleteTransfer(_) => ErrorKind::IncompleteTransfer,
		}
	}

	/// Injection states visited before a failed run; empty for every other error.
	pub fn states(&self) -> &[InjectionState] {
		match self {
			Self::Injection { states, .. } => states,
			_ => &[],
		}
	}

	pub(crate) fn malformed(link: &str, source: Option<url::ParseError>) -> Self {
		Self::MalformedLink {
			link: link.to_string(),
			source,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_display_matches_serialized_code() {
		let err = HandoffError::Network("refused".into());
		assert_eq!(err.kind().to_string(), "NETWORK_ERROR");
		assert_eq!(serde_json::to_string(&err.kind()).unwrap(), r#""NETWORK_ERROR""#);
	}

	#[test]
	fn malformed_link_keeps_parse_error_as_source() {
		use std::error::Error as _;

		let err = HandoffError::malformed("nope", Some(url::ParseError::RelativeUrlWithoutBase));
		assert_eq!(err.kind(), ErrorKind::MalformedLink);
		assert!(err.source().is_some());
	}

	#[test]
	fn only_injection_failures_carry_states() {
		let err = HandoffError::Injection {
			reason: "reload: boom".into(),
			states: vec![InjectionState::Idle, InjectionState::Navigating, InjectionState::Failed],
		};
		assert_eq!(err.to_string(), "session injection failed: reload: boom");
		assert_eq!(err.states().last(), Some(&InjectionState::Failed));
		assert!(HandoffError::EmptyInput.states().is_empty());
	}
}
