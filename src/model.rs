//! Entity model mirrored from the server: players, their hippos, and the
//! small pieces of round state the displays need.

use serde::{Deserialize, Serialize};

use crate::protocol::{Marble, MarbleKey, PlayerId, PlayerInfo};

// ── Sides ───────────────────────────────────────────────────────────

/// The screen edge a hippo sits on. Assigned once, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// All sides in clockwise order starting at the top.
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// Lowercase name, matching the CSS offset property a renderer animates.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

/// One value per [`Side`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMap<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T> SideMap<T> {
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Top => &self.top,
            Side::Right => &self.right,
            Side::Bottom => &self.bottom,
            Side::Left => &self.left,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Top => &mut self.top,
            Side::Right => &mut self.right,
            Side::Bottom => &mut self.bottom,
            Side::Left => &mut self.left,
        }
    }

    /// Iterate `(side, value)` pairs in clockwise order.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::ALL.into_iter().map(move |side| (side, self.get(side)))
    }

    /// Build a new map by applying `f` to every side.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> SideMap<U> {
        SideMap {
            top: f(&self.top),
            right: f(&self.right),
            bottom: f(&self.bottom),
            left: f(&self.left),
        }
    }
}

// ── Players and hippos ──────────────────────────────────────────────

/// Local mirror of one server-side player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u64,
    /// Marbles left in the pile. The reference for drift checks.
    pub marble_count: usize,
    /// The marbles known by key. Never longer than `marble_count`, but may be
    /// shorter when the server only reported a count.
    pub marbles: Vec<Marble>,
}

impl Player {
    pub(crate) fn position_of(&self, key: &MarbleKey) -> Option<usize> {
        self.marbles.iter().position(|m| &m.key == key)
    }

    /// Drop the oldest listed marbles that the tracked count no longer
    /// covers, so the list never claims more marbles than the pile holds.
    pub(crate) fn settle_pile(&mut self) {
        let excess = self.marbles.len().saturating_sub(self.marble_count);
        if excess > 0 {
            self.marbles.drain(..excess);
        }
    }
}

impl From<PlayerInfo> for Player {
    fn from(info: PlayerInfo) -> Self {
        let marble_count = info.num_marbles.unwrap_or(info.marbles.len());
        Self {
            id: info.id,
            name: info.name,
            score: info.score,
            marble_count,
            marbles: info.marbles,
        }
    }
}

/// A player plus the presentation state the displays derive for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hippo {
    pub player: Player,
    pub side: Side,
    /// Derived; see [`leaderboard`](crate::leaderboard).
    pub has_crown: bool,
    /// Set while the hippo plays its death animation before removal.
    pub is_eliminated: bool,
    /// Set when the hippo won the speed bonus, until the next round starts.
    pub won_bonus: bool,
    /// Position in registration order; breaks crown ties.
    pub registration_order: u64,
}

impl Hippo {
    pub fn id(&self) -> &PlayerId {
        &self.player.id
    }
}

// ── Round and banner state ──────────────────────────────────────────

/// State of the nose-goes elimination mini-game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    #[default]
    Inactive,
    Active,
}

impl RoundState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// The "a hippo has fallen" banner on the host display.
///
/// Last write wins: a newer elimination overwrites the name, and every
/// clear timer clears whatever is currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathBanner {
    pub is_active: bool,
    pub hippo_name: Option<String>,
}

/// The player owned by a player-role session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    pub id: PlayerId,
    pub name: String,
    /// Cleared once the server reports this player lost.
    pub is_playing: bool,
    /// Score from the last action response or event, whichever is newer.
    pub score: u64,
    pub has_crown: bool,
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
    fn side_map_iterates_clockwise() {
        let map = SideMap {
            top: 1,
            right: 2,
            bottom: 3,
            left: 4,
        };
        let order: Vec<_> = map.iter().map(|(side, v)| (side, *v)).collect();
        assert_eq!(
            order,
            vec![
                (Side::Top, 1),
                (Side::Right, 2),
                (Side::Bottom, 3),
                (Side::Left, 4)
            ]
        );
    }

    #[test]
    fn player_count_defaults_to_listed_marbles() {
        let info = PlayerInfo {
            id: PlayerId::new("1"),
            name: "Zippo".into(),
            score: 3,
            num_marbles: None,
            marbles: vec![Marble {
                key: MarbleKey::new("a"),
                color: "red".into(),
                angle: 0.5,
                radius: 1.0,
            }],
            has_crown: false,
        };
        let player = Player::from(info);
        assert_eq!(player.marble_count, 1);
        assert_eq!(player.position_of(&MarbleKey::new("a")), Some(0));
    }
}
