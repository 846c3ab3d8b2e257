//! Wire-compatible protocol types for the hippo game server.
//!
//! Inbound broadcasts use serde's externally tagged encoding: unit variants
//! arrive as a bare string (`"BeginNoseGoes"`) and struct variants as a
//! single-key object (`{"HippoEat": {"id": "3", ...}}`). The HTTP action
//! endpoints exchange the plain structs at the bottom of this module.
//!
//! Identifiers are opaque. The server sends them as strings, but numeric
//! identifiers are accepted as well and normalized to their decimal text.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

// ── Identifiers ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(u64),
}

impl From<IdRepr> for String {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(text) => text,
            IdRepr::Number(n) => n.to_string(),
        }
    }
}

/// Stable, server-issued identifier for one registered player.
///
/// The bootstrap collaborator persists it so a reloaded player client can
/// rejoin with the same identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wrap an identifier received out of band (e.g. a cached rejoin id).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IdRepr::deserialize(deserializer).map(|repr| Self(repr.into()))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique key of one marble inside a player's food pile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MarbleKey(String);

impl MarbleKey {
    /// Wrap a marble key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for MarbleKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IdRepr::deserialize(deserializer).map(|repr| Self(repr.into()))
    }
}

impl fmt::Display for MarbleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarbleKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// A consumable marble in a player's food pile.
///
/// The polar position only places the marble around the hippo's mouth; it
/// has no gameplay meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marble {
    pub key: MarbleKey,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub radius: f64,
}

/// Full description of a player, as broadcast on registration and returned
/// by the roster query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub score: u64,
    /// Number of marbles left in the pile. Defaults to `marbles.len()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_marbles: Option<usize>,
    #[serde(default)]
    pub marbles: Vec<Marble>,
    #[serde(default)]
    pub has_crown: bool,
}

// ── Messages ────────────────────────────────────────────────────────

/// Broadcasts sent from the server to player and host clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// A new player joined the match.
    PlayerRegister(PlayerInfo),
    /// A hippo ate a marble from its pile.
    HippoEat {
        id: PlayerId,
        score: u64,
        /// Marbles left afterwards. The host stream omits it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num_marbles: Option<usize>,
        /// Key of the consumed marble, when the server tracks individual marbles.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marble: Option<MarbleKey>,
    },
    /// A marble was dropped into a player's pile.
    AddMarble {
        id: PlayerId,
        marble: Marble,
        num_marbles: usize,
    },
    /// A nose-goes round started.
    BeginNoseGoes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<Duration>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        players: Vec<PlayerId>,
    },
    /// A nose-goes round finished.
    EndNoseGoes {
        #[serde(default)]
        losers: Vec<PlayerId>,
        /// Single-loser form used by older servers.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        loser: Option<PlayerId>,
        /// The fastest survivor and their updated score.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bonus_winner: Option<(PlayerId, u64)>,
    },
    /// A player won the speed bonus.
    BonusWinner { id: PlayerId },
    /// The server announced a new score leader.
    UpdateWinner { id: PlayerId },
    /// A player lost and was removed from the match.
    PlayerLose { id: PlayerId, score: u64 },
}

impl ServerMessage {
    /// Every tag this client understands.
    pub const TAGS: &'static [&'static str] = &[
        "PlayerRegister",
        "HippoEat",
        "AddMarble",
        "BeginNoseGoes",
        "EndNoseGoes",
        "BonusWinner",
        "UpdateWinner",
        "PlayerLose",
    ];

    /// The wire tag of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PlayerRegister(_) => "PlayerRegister",
            Self::HippoEat { .. } => "HippoEat",
            Self::AddMarble { .. } => "AddMarble",
            Self::BeginNoseGoes { .. } => "BeginNoseGoes",
            Self::EndNoseGoes { .. } => "EndNoseGoes",
            Self::BonusWinner { .. } => "BonusWinner",
            Self::UpdateWinner { .. } => "UpdateWinner",
            Self::PlayerLose { .. } => "PlayerLose",
        }
    }
}

// ── Action request payloads ─────────────────────────────────────────

/// Response to the register and rejoin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredPlayer {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub has_crown: bool,
}

/// Body of the feed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRequest {
    pub id: PlayerId,
}

/// Response to the feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub score: u64,
}

/// Result of submitting a nose-goes attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoseGoesOutcome {
    Survived,
    Died,
}

/// Response to the roster query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayersResponse {
    pub players: Vec<PlayerInfo>,
}
