//! Error types for the hippo client.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::error_class::ErrorClass;
use crate::protocol::{MarbleKey, PlayerId};

/// Errors that can occur while running a hippo client session.
#[derive(Debug, Error)]
pub enum HippoError {
    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a JSON payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound message could not be decoded into a game event.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Attempted an operation that requires a running session.
    #[error("not connected to server")]
    NotConnected,

    /// An outbound action request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// A user action was refused before any request was issued.
    #[error("action rejected: {0}")]
    ActionRejected(RejectReason),

    /// An event referenced a player that is no longer present.
    #[error("stale reference to player {player_id} in {event}")]
    StaleReference {
        /// Identifier named by the event.
        player_id: PlayerId,
        /// Name of the event kind that carried the reference.
        event: &'static str,
    },

    /// The store's own bookkeeping contradicted itself.
    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HippoError {
    /// Classify this error according to the session error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::TransportReceive(_) | Self::TransportClosed | Self::Io(_) | Self::Timeout => {
                ErrorClass::TransportFailure
            }
            Self::Serialization(_) | Self::Decode(_) => ErrorClass::ProtocolDrift,
            Self::NotConnected | Self::Request(_) => ErrorClass::RequestFailure,
            Self::ActionRejected(_) => ErrorClass::ActionRejected,
            Self::StaleReference { .. } => ErrorClass::StaleReference,
            Self::Invariant(_) => ErrorClass::InvariantViolation,
        }
    }

    /// Returns `true` if this error must end the session.
    pub fn is_fatal(&self) -> bool {
        self.class().is_fatal()
    }
}

impl From<StoreError> for HippoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Stale { player_id, event } => Self::StaleReference { player_id, event },
            StoreError::Invariant(violation) => Self::Invariant(violation),
        }
    }
}

/// Why a user action was refused client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Feeding is disabled while an elimination round is running.
    #[error("an elimination round is active")]
    RoundActive,
    /// Mini-game results can only be submitted during a round.
    #[error("no elimination round is active")]
    RoundInactive,
    /// The local player has been eliminated or has not registered yet.
    #[error("the local player is not playing")]
    NotPlaying,
    /// The session is a host display and owns no player.
    #[error("host sessions cannot issue player actions")]
    HostRole,
}

/// A contradiction inside the store's own bookkeeping.
///
/// These indicate a client bug rather than a network race and end the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A registration named a player that already has a hippo.
    #[error("player {player_id} is already registered")]
    DuplicatePlayer {
        /// The duplicated identifier.
        player_id: PlayerId,
    },

    /// A score event consumed a marble the store does not know about.
    #[error("player {player_id} has no marble {key}")]
    UnknownMarble {
        /// Owner of the marble collection.
        player_id: PlayerId,
        /// The consumed key that was not found.
        key: MarbleKey,
    },

    /// A marble was added under a key that is already present.
    #[error("player {player_id} already holds marble {key}")]
    DuplicateMarble {
        /// Owner of the marble collection.
        player_id: PlayerId,
        /// The repeated key.
        key: MarbleKey,
    },

    /// The local marble collection disagrees with the server's count.
    #[error("player {player_id} holds {actual} marbles but the server reported {expected}")]
    MarbleCountMismatch {
        /// Owner of the marble collection.
        player_id: PlayerId,
        /// Count reported by the server.
        expected: usize,
        /// Count held locally after the mutation.
        actual: usize,
    },

    /// A hippo is in the lookup table but missing from its side sequence.
    #[error("hippo {player_id} is missing from its side sequence")]
    MissingFromSide {
        /// The hippo that could not be found.
        player_id: PlayerId,
    },

    /// A side sequence lists a hippo the lookup table does not place there.
    #[error("side {side} lists hippo {player_id} which is not seated there")]
    OrphanSideEntry {
        /// The listed identifier.
        player_id: PlayerId,
        /// Name of the side whose sequence holds the entry.
        side: &'static str,
    },

    /// More than one hippo carries the crown after a recompute.
    #[error("{count} hippos hold the crown")]
    MultipleCrowns {
        /// Number of crowned hippos observed.
        count: usize,
    },
}

/// Outcome of a store operation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The event referenced a player that is not in the store; it was dropped.
    #[error("stale reference to player {player_id} in {event}")]
    Stale {
        /// Identifier named by the event.
        player_id: PlayerId,
        /// Name of the event kind that carried the reference.
        event: &'static str,
    },

    /// The store detected a bug in its own bookkeeping.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl StoreError {
    /// Returns `true` for invariant violations, which end the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

/// A specialized [`Result`] type for hippo client operations.
pub type Result<T> = std::result::Result<T, HippoError>;

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
        let stale: HippoError = StoreError::Stale {
            player_id: PlayerId::new("4"),
            event: "ScoreIncreased",
        }
        .into();
        assert_eq!(stale.class(), ErrorClass::StaleReference);
        assert!(!stale.is_fatal());

        let bug: HippoError = StoreError::from(InvariantViolation::DuplicatePlayer {
            player_id: PlayerId::new("4"),
        })
        .into();
        assert_eq!(bug.class(), ErrorClass::InvariantViolation);
        assert!(bug.is_fatal());
        assert_eq!(
            bug.to_string(),
            "internal invariant violated: player 4 is already registered"
        );
    }

    #[test]
    fn wire_and_transport_errors_classify() {
        let bad_json = serde_json::from_str::<u64>("nope").unwrap_err();
        assert_eq!(
            HippoError::from(bad_json).class(),
            ErrorClass::ProtocolDrift
        );
        let drift = HippoError::from(DecodeError::UnrecognizedTag("Juggle".into()));
        assert_eq!(drift.class(), ErrorClass::ProtocolDrift);
        assert!(!drift.is_fatal());
        assert_eq!(
            drift.to_string(),
            "decode error: unrecognized event tag `Juggle`"
        );
        assert_eq!(
            HippoError::TransportClosed.class(),
            ErrorClass::TransportFailure
        );
        assert_eq!(
            HippoError::ActionRejected(RejectReason::HostRole).class(),
            ErrorClass::ActionRejected
        );
    }
}
