//! Read-only projection of the store for renderers.
//!
//! A [`StoreSnapshot`] is a plain owned value: renderers can keep, clone,
//! and compare it without ever touching the store. The session publishes a
//! fresh one after every mutation.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::RejectReason;
use crate::model::{DeathBanner, Hippo, LocalPlayer, Side, SideMap};
use crate::protocol::{Marble, PlayerId};
use crate::store::GameStore;

/// Everything a renderer needs to draw one hippo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HippoView {
    pub id: PlayerId,
    pub name: String,
    pub score: u64,
    pub side: Side,
    pub marble_count: usize,
    pub marbles: Vec<Marble>,
    pub has_crown: bool,
    pub is_eliminated: bool,
    pub won_bonus: bool,
}

impl From<&Hippo> for HippoView {
    fn from(hippo: &Hippo) -> Self {
        Self {
            id: hippo.player.id.clone(),
            name: hippo.player.name.clone(),
            score: hippo.player.score,
            side: hippo.side,
            marble_count: hippo.player.marble_count,
            marbles: hippo.player.marbles.clone(),
            has_crown: hippo.has_crown,
            is_eliminated: hippo.is_eliminated,
            won_bonus: hippo.won_bonus,
        }
    }
}

/// Local-player fields shown by the player client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalView {
    pub id: PlayerId,
    pub name: String,
    pub is_playing: bool,
    pub score: u64,
    pub has_crown: bool,
}

impl From<&LocalPlayer> for LocalView {
    fn from(local: &LocalPlayer) -> Self {
        Self {
            id: local.id.clone(),
            name: local.name.clone(),
            is_playing: local.is_playing,
            score: local.score,
            has_crown: local.has_crown,
        }
    }
}

/// Point-in-time view of the whole game.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    /// Hippos per side, in seating order.
    pub sides: SideMap<Vec<HippoView>>,
    pub round_active: bool,
    pub crown_holder: Option<PlayerId>,
    pub death_banner: DeathBanner,
    pub local_player: Option<LocalView>,
    /// Store revision this snapshot was taken at.
    pub revision: u64,
}

impl StoreSnapshot {
    /// Find a hippo by id.
    pub fn hippo(&self, player_id: &PlayerId) -> Option<&HippoView> {
        self.hippos().find(|h| &h.id == player_id)
    }

    /// All hippos, side by side in clockwise order.
    pub fn hippos(&self) -> impl Iterator<Item = &HippoView> {
        self.sides.iter().flat_map(|(_, seq)| seq.iter())
    }

    /// Hippos keyed by id.
    pub fn lookup(&self) -> HashMap<&PlayerId, &HippoView> {
        self.hippos().map(|h| (&h.id, h)).collect()
    }

    pub fn len(&self) -> usize {
        self.sides.iter().map(|(_, seq)| seq.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mirrors [`GameStore::can_feed`].
    ///
    /// # Errors
    ///
    /// The reason feeding is refused.
    pub fn can_feed(&self) -> Result<&PlayerId, RejectReason> {
        let local = self.playing_local()?;
        if self.round_active {
            return Err(RejectReason::RoundActive);
        }
        Ok(&local.id)
    }

    /// Mirrors [`GameStore::can_submit_nose_goes`].
    ///
    /// # Errors
    ///
    /// The reason submitting is refused.
    pub fn can_submit_nose_goes(&self) -> Result<&PlayerId, RejectReason> {
        let local = self.playing_local()?;
        if !self.round_active {
            return Err(RejectReason::RoundInactive);
        }
        Ok(&local.id)
    }

    fn playing_local(&self) -> Result<&LocalView, RejectReason> {
        match &self.local_player {
            Some(local) if local.is_playing => Ok(local),
            _ => Err(RejectReason::NotPlaying),
        }
    }
}

impl GameStore {
    /// Project the current state for renderers.
    pub fn snapshot(&self) -> StoreSnapshot {
        let sides = self.sides().map(|seq| {
            seq.iter()
                .filter_map(|id| self.hippo(id))
                .map(HippoView::from)
                .collect()
        });
        StoreSnapshot {
            sides,
            round_active: self.round().is_active(),
            crown_holder: self.crown_holder().cloned(),
            death_banner: self.death_banner().clone(),
            local_player: self.local_player().map(LocalView::from),
            revision: self.revision(),
        }
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
    use crate::event::GameEvent;
    use crate::protocol::PlayerInfo;

    fn register(store: &mut GameStore, id: &str, score: u64) {
        store
            .apply(GameEvent::PlayerRegistered {
                player: PlayerInfo {
                    id: PlayerId::new(id),
                    name: id.to_uppercase(),
                    score,
                    num_marbles: None,
                    marbles: vec![],
                    has_crown: false,
                },
            })
            .unwrap();
    }

    #[test]
    fn empty_store_projects_empty_snapshot() {
        let snap = GameStore::new().snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap, StoreSnapshot::default());
    }

    #[test]
    fn snapshot_keeps_seating_order_and_crown() {
        let mut store = GameStore::new();
        for (id, score) in [("a", 1), ("b", 4), ("c", 2), ("d", 0)] {
            register(&mut store, id, score);
        }
        let snap = store.snapshot();

        let top: Vec<_> = snap.sides.top.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(top, vec!["a", "b", "c"]);
        assert_eq!(snap.sides.right.len(), 1);
        assert_eq!(snap.crown_holder, Some(PlayerId::new("b")));
        assert!(snap.hippo(&PlayerId::new("b")).unwrap().has_crown);
        assert_eq!(snap.lookup().len(), 4);
        assert_eq!(snap.revision, store.revision());
    }

    #[test]
    fn snapshot_is_detached_from_store() {
        let mut store = GameStore::new();
        register(&mut store, "a", 0);
        let before = store.snapshot();
        register(&mut store, "b", 0);
        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn host_snapshot_rejects_actions() {
        let snap = GameStore::new().snapshot();
        assert_eq!(snap.can_feed(), Err(RejectReason::NotPlaying));
        assert_eq!(snap.can_submit_nose_goes(), Err(RejectReason::NotPlaying));
    }
}
