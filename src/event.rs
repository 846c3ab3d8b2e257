//! Typed events flowing through a hippo client session.
//!
//! [`GameEvent`] is the closed set of inbound state changes the store knows
//! how to apply. [`SessionEvent`] is what the session emits to the UI layer.

use crate::model::Side;
use crate::protocol::{Marble, MarbleKey, NoseGoesOutcome, PlayerId, PlayerInfo, ServerMessage};

/// The player who won the speed bonus at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusWinner {
    pub player_id: PlayerId,
    pub new_score: u64,
}

/// A decoded, validated inbound game event.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A new player joined the match.
    PlayerRegistered { player: PlayerInfo },
    /// A player's hippo scored by eating a marble.
    ScoreIncreased {
        player_id: PlayerId,
        new_score: u64,
        /// `None` when the server did not report a count; the pile is kept.
        new_item_count: Option<usize>,
        consumed_item_key: Option<MarbleKey>,
    },
    /// A marble was added to a player's pile.
    ItemAdded {
        player_id: PlayerId,
        item: Marble,
        new_item_count: usize,
    },
    /// An elimination round started.
    EliminationRoundBegan,
    /// An elimination round finished.
    EliminationRoundEnded {
        loser_ids: Vec<PlayerId>,
        bonus_winner: Option<BonusWinner>,
    },
    /// A player was awarded the speed bonus.
    BonusAwarded { player_id: PlayerId },
    /// The server designated a new score leader.
    LeaderChanged { player_id: PlayerId },
    /// A player lost and left the match.
    PlayerRemoved { player_id: PlayerId, final_score: u64 },
}

impl GameEvent {
    /// Short name used in log output and stale-reference reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerRegistered { .. } => "PlayerRegistered",
            Self::ScoreIncreased { .. } => "ScoreIncreased",
            Self::ItemAdded { .. } => "ItemAdded",
            Self::EliminationRoundBegan => "EliminationRoundBegan",
            Self::EliminationRoundEnded { .. } => "EliminationRoundEnded",
            Self::BonusAwarded { .. } => "BonusAwarded",
            Self::LeaderChanged { .. } => "LeaderChanged",
            Self::PlayerRemoved { .. } => "PlayerRemoved",
        }
    }
}

impl From<ServerMessage> for GameEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::PlayerRegister(player) => Self::PlayerRegistered { player },
            ServerMessage::HippoEat {
                id,
                score,
                num_marbles,
                marble,
            } => Self::ScoreIncreased {
                player_id: id,
                new_score: score,
                new_item_count: num_marbles,
                consumed_item_key: marble,
            },
            ServerMessage::AddMarble {
                id,
                marble,
                num_marbles,
            } => Self::ItemAdded {
                player_id: id,
                item: marble,
                new_item_count: num_marbles,
            },
            ServerMessage::BeginNoseGoes { .. } => Self::EliminationRoundBegan,
            ServerMessage::EndNoseGoes {
                mut losers,
                loser,
                bonus_winner,
            } => {
                if let Some(loser) = loser {
                    if !losers.contains(&loser) {
                        losers.push(loser);
                    }
                }
                Self::EliminationRoundEnded {
                    loser_ids: losers,
                    bonus_winner: bonus_winner.map(|(player_id, new_score)| BonusWinner {
                        player_id,
                        new_score,
                    }),
                }
            }
            ServerMessage::BonusWinner { id } => Self::BonusAwarded { player_id: id },
            ServerMessage::UpdateWinner { id } => Self::LeaderChanged { player_id: id },
            ServerMessage::PlayerLose { id, score } => Self::PlayerRemoved {
                player_id: id,
                final_score: score,
            },
        }
    }
}

/// Events emitted by a running [`HippoSession`](crate::HippoSession).
///
/// State itself is published through the snapshot watch channel; these
/// events carry the one-shot moments a renderer animates.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The session task started and owns a connected transport.
    Connected,
    /// The local player was registered (or rejoined) with the server.
    ///
    /// Persist `player_id` to rejoin after a reload.
    Registered { player_id: PlayerId, name: String },
    /// The roster snapshot was applied and the event stream is authoritative.
    Bootstrapped { players: usize },
    /// A hippo scored; animate a chomp toward its side of the screen.
    Chomp { player_id: PlayerId, side: Side },
    /// A hippo was marked eliminated and will leave after this frame.
    HippoEliminated {
        player_id: PlayerId,
        name: String,
        side: Side,
    },
    /// An elimination round started.
    RoundBegan,
    /// An elimination round finished.
    RoundEnded {
        losers: Vec<PlayerId>,
        bonus_winner: Option<PlayerId>,
    },
    /// The server accepted a feed request.
    FeedAccepted { score: u64 },
    /// The server judged the local player's nose-goes attempt.
    NoseGoesResult { outcome: NoseGoesOutcome },
    /// The local player lost the match.
    LocalPlayerLost { final_score: u64 },
    /// An outbound request failed; the session continues.
    RequestFailed { reason: String },
    /// The store detected an internal inconsistency; the session is ending.
    Fatal { reason: String },
    /// The session ended. Always the last event.
    Disconnected { reason: Option<String> },
}
