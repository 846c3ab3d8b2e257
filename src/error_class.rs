//! Error classes for structured handling of session failures.
//!
//! Every [`HippoError`](crate::HippoError) maps onto exactly one class. The
//! class decides how the session reacts: log and continue, or end the session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of everything that can go wrong in a session.
///
/// Serializes as `"SCREAMING_SNAKE_CASE"` so the class can be attached to
/// structured log output or forwarded to an operator dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Unrecognized event tag or malformed payload.
    ProtocolDrift,
    /// An event named a player that has already been removed.
    StaleReference,
    /// The store's own bookkeeping contradicts itself.
    InvariantViolation,
    /// The inbound channel closed or failed.
    TransportFailure,
    /// An outbound action request failed.
    RequestFailure,
    /// A user action was refused before a request was issued.
    ActionRejected,
}

impl ErrorClass {
    /// Returns `true` if errors of this class end the session.
    ///
    /// Transport failures end the session too, but through the normal
    /// disconnect path rather than a fatal error state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation)
    }

    /// Returns a human-readable description of this class.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ProtocolDrift => {
                "The server sent a message this client does not understand. The message was ignored."
            }
            Self::StaleReference => {
                "An event referred to a player that already left the match. The event was ignored."
            }
            Self::InvariantViolation => {
                "The client's game state became inconsistent. The session has been stopped."
            }
            Self::TransportFailure => "Connection lost.",
            Self::RequestFailure => "A request to the game server failed.",
            Self::ActionRejected => "That action is not available right now.",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violations_are_fatal() {
        let fatal: Vec<_> = [
            ErrorClass::ProtocolDrift,
            ErrorClass::StaleReference,
            ErrorClass::InvariantViolation,
            ErrorClass::TransportFailure,
            ErrorClass::RequestFailure,
            ErrorClass::ActionRejected,
        ]
        .into_iter()
        .filter(ErrorClass::is_fatal)
        .collect();
        assert_eq!(fatal, vec![ErrorClass::InvariantViolation]);
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorClass::StaleReference).unwrap();
        assert_eq!(json, "\"STALE_REFERENCE\"");
    }

    #[test]
    fn display_uses_description() {
        assert_eq!(ErrorClass::TransportFailure.to_string(), "Connection lost.");
    }
}
