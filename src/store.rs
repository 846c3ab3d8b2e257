//! The game state store: the client's mirror of the authoritative match.
//!
//! One store exists per session and is mutated only by applying
//! [`GameEvent`]s, one at a time, each as a single atomic step. Every
//! operation validates before it writes, so a failed operation leaves the
//! store untouched.
//!
//! Two error classes come out of the store:
//!
//! - [`StoreError::Stale`]: the event named a player that is gone. This is
//!   an expected race with eliminations; the event is dropped.
//! - [`StoreError::Invariant`]: the store's own bookkeeping disagrees with
//!   itself. The session must stop.
//!
//! # Removal
//!
//! Eliminated hippos leave in two phases. [`GameStore::apply`] only marks
//! the hippo (`is_eliminated`) and reports [`Effect::Eliminated`], so the
//! renderer can start a death animation. The session then calls
//! [`GameStore::complete_removal`] once the renderer had a chance to observe
//! the mark. Phase two is idempotent and a no-op for hippos already gone.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::{InvariantViolation, RejectReason, StoreError};
use crate::event::{BonusWinner, GameEvent};
use crate::layout::LayoutPolicy;
use crate::leaderboard;
use crate::model::{DeathBanner, Hippo, LocalPlayer, Player, RoundState, Side, SideMap};
use crate::protocol::{Marble, MarbleKey, PlayerId, PlayerInfo, RegisteredPlayer};

/// Follow-up work requested by an applied event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A hippo scored; the renderer animates a chomp toward `side`.
    Chomp { player_id: PlayerId, side: Side },
    /// Phase one of a removal finished; schedule phase two.
    Eliminated {
        player_id: PlayerId,
        name: String,
        side: Side,
    },
    /// The death banner was (re)shown; schedule its clear timer.
    DeathBannerShown,
    /// An elimination round started.
    RoundBegan,
    /// An elimination round finished.
    RoundEnded {
        losers: Vec<PlayerId>,
        bonus_winner: Option<PlayerId>,
    },
    /// The local player lost the match.
    LocalPlayerLost { final_score: u64 },
}

/// What applying one event did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub effects: Vec<Effect>,
    /// Identifiers inside a multi-player event that were already gone.
    pub stale: Vec<PlayerId>,
}

impl Applied {
    fn with(effect: Effect) -> Self {
        Self {
            effects: vec![effect],
            stale: Vec::new(),
        }
    }
}

/// Mirror of the match state, owned by exactly one session.
#[derive(Debug, Clone, Default)]
pub struct GameStore {
    hippos: HashMap<PlayerId, Hippo>,
    sides: SideMap<Vec<PlayerId>>,
    layout: LayoutPolicy,
    round: RoundState,
    crown: Option<PlayerId>,
    death_banner: DeathBanner,
    local: Option<LocalPlayer>,
    next_registration: u64,
    revision: u64,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state, including the layout cursor, as if freshly created.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ── Event dispatch ──────────────────────────────────────────────

    /// Apply one inbound event.
    ///
    /// # Errors
    ///
    /// [`StoreError::Stale`] when the event's player is gone (the store is
    /// unchanged), [`StoreError::Invariant`] when the store caught a bug in
    /// its own bookkeeping.
    pub fn apply(&mut self, event: GameEvent) -> Result<Applied, StoreError> {
        let name = event.name();
        let applied = match event {
            GameEvent::PlayerRegistered { player } => {
                self.register_player(player)?;
                Applied::default()
            }
            GameEvent::ScoreIncreased {
                player_id,
                new_score,
                new_item_count,
                consumed_item_key,
            } => {
                let side = self.record_score(
                    &player_id,
                    new_score,
                    new_item_count,
                    consumed_item_key.as_ref(),
                )?;
                Applied::with(Effect::Chomp { player_id, side })
            }
            GameEvent::ItemAdded {
                player_id,
                item,
                new_item_count,
            } => {
                self.add_item(&player_id, item, new_item_count)?;
                Applied::default()
            }
            GameEvent::EliminationRoundBegan => self.begin_round(),
            GameEvent::EliminationRoundEnded {
                loser_ids,
                bonus_winner,
            } => self.end_round(&loser_ids, bonus_winner)?,
            GameEvent::BonusAwarded { player_id } => {
                self.award_bonus(&player_id)?;
                Applied::default()
            }
            GameEvent::LeaderChanged { player_id } => {
                self.set_crown(&player_id)?;
                Applied::default()
            }
            GameEvent::PlayerRemoved {
                player_id,
                final_score,
            } => self.remove_player(&player_id, final_score)?,
        };
        self.audit()?;
        self.revision += 1;
        debug!(event = name, revision = self.revision, "applied event");
        Ok(applied)
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Seat a new player's hippo on the next side of the layout cycle.
    ///
    /// # Errors
    ///
    /// [`InvariantViolation::DuplicatePlayer`] if the player already has a
    /// hippo; the server never registers an identifier twice.
    pub fn register_player(&mut self, info: PlayerInfo) -> Result<Side, StoreError> {
        if self.hippos.contains_key(&info.id) {
            return Err(InvariantViolation::DuplicatePlayer { player_id: info.id }.into());
        }

        let side = self.layout.next_side();
        let player = Player::from(info);
        let id = player.id.clone();
        let hippo = Hippo {
            player,
            side,
            has_crown: false,
            is_eliminated: false,
            won_bonus: false,
            registration_order: self.next_registration,
        };
        self.next_registration += 1;

        debug!(player_id = %id, side = side.name(), "registered hippo");
        self.sides.get_mut(side).push(id.clone());
        self.hippos.insert(id, hippo);
        self.recompute_crown()?;
        Ok(side)
    }

    /// Record a score change, consuming one marble if the server names it.
    ///
    /// Returns the scoring hippo's side for the chomp animation.
    ///
    /// The store's own `marble_count` is the reference for drift checks.
    /// Without a consumed key, a reported count is adopted as is and a
    /// missing one leaves the pile alone.
    ///
    /// # Errors
    ///
    /// [`StoreError::Stale`] for an unknown player. When a consumed key is
    /// given, [`InvariantViolation::UnknownMarble`] if the key is not in the
    /// pile and [`InvariantViolation::MarbleCountMismatch`] if the reported
    /// count is not one less than the tracked count.
    pub fn record_score(
        &mut self,
        player_id: &PlayerId,
        new_score: u64,
        new_item_count: Option<usize>,
        consumed_item_key: Option<&MarbleKey>,
    ) -> Result<Side, StoreError> {
        let hippo = self.live_mut(player_id, "ScoreIncreased")?;

        let consumed = match consumed_item_key {
            Some(key) => {
                let Some(index) = hippo.player.position_of(key) else {
                    return Err(InvariantViolation::UnknownMarble {
                        player_id: player_id.clone(),
                        key: key.clone(),
                    }
                    .into());
                };
                let remaining = hippo.player.marble_count.saturating_sub(1);
                match new_item_count {
                    Some(reported) if reported != remaining => {
                        return Err(InvariantViolation::MarbleCountMismatch {
                            player_id: player_id.clone(),
                            expected: reported,
                            actual: remaining,
                        }
                        .into());
                    }
                    _ => Some((index, remaining)),
                }
            }
            None => None,
        };

        if new_score < hippo.player.score {
            warn!(
                player_id = %player_id,
                old = hippo.player.score,
                new = new_score,
                "server lowered a score"
            );
        }
        hippo.player.score = new_score;
        match (consumed, new_item_count) {
            (Some((index, remaining)), _) => {
                hippo.player.marbles.remove(index);
                hippo.player.marble_count = remaining;
            }
            (None, Some(count)) => hippo.player.marble_count = count,
            (None, None) => {}
        }
        hippo.player.settle_pile();
        let side = hippo.side;

        if let Some(local) = self.local.as_mut().filter(|l| &l.id == player_id) {
            local.score = new_score;
        }
        self.recompute_crown()?;
        Ok(side)
    }

    /// Drop a marble into a player's pile.
    ///
    /// # Errors
    ///
    /// [`StoreError::Stale`] for an unknown player,
    /// [`InvariantViolation::DuplicateMarble`] for a key already in the pile,
    /// [`InvariantViolation::MarbleCountMismatch`] if `new_item_count` is not
    /// one more than the tracked count.
    pub fn add_item(
        &mut self,
        player_id: &PlayerId,
        item: Marble,
        new_item_count: usize,
    ) -> Result<(), StoreError> {
        let hippo = self.live_mut(player_id, "ItemAdded")?;

        if hippo.player.position_of(&item.key).is_some() {
            return Err(InvariantViolation::DuplicateMarble {
                player_id: player_id.clone(),
                key: item.key,
            }
            .into());
        }
        let resulting = hippo.player.marble_count + 1;
        if resulting != new_item_count {
            return Err(InvariantViolation::MarbleCountMismatch {
                player_id: player_id.clone(),
                expected: new_item_count,
                actual: resulting,
            }
            .into());
        }

        hippo.player.marbles.push(item);
        hippo.player.marble_count = new_item_count;
        Ok(())
    }

    /// Enter the elimination round. Clears last round's bonus highlight.
    pub fn begin_round(&mut self) -> Applied {
        if self.round.is_active() {
            debug!("elimination round already active");
        }
        self.round = RoundState::Active;
        for hippo in self.hippos.values_mut() {
            hippo.won_bonus = false;
        }
        Applied::with(Effect::RoundBegan)
    }

    /// Leave the elimination round: start removing the losers and credit the
    /// bonus winner.
    ///
    /// Losers that are already gone are reported in [`Applied::stale`]
    /// rather than failing the whole event.
    ///
    /// # Errors
    ///
    /// Only invariant violations.
    pub fn end_round(
        &mut self,
        loser_ids: &[PlayerId],
        bonus_winner: Option<BonusWinner>,
    ) -> Result<Applied, StoreError> {
        if !self.round.is_active() {
            debug!("elimination round ended while inactive");
        }
        self.round = RoundState::Inactive;

        let mut applied = Applied::default();
        let mut losers = Vec::with_capacity(loser_ids.len());
        // An empty round leaves a server-set crown alone.
        let mut scores_changed = false;
        for loser in loser_ids {
            let lost_score = self
                .hippos
                .get(loser)
                .map(|h| h.player.score)
                .or_else(|| {
                    self.local
                        .as_ref()
                        .filter(|l| &l.id == loser)
                        .map(|l| l.score)
                })
                .unwrap_or_default();
            let local_lost = self.mark_local_lost(loser, lost_score);
            match self.mark_eliminated(loser) {
                Some(effects) => {
                    scores_changed = true;
                    applied.effects.extend(effects);
                    losers.push(loser.clone());
                }
                None if local_lost.is_some() => losers.push(loser.clone()),
                None => {
                    if !self.hippos.contains_key(loser) {
                        info!(player_id = %loser, "dropping stale round loser");
                        applied.stale.push(loser.clone());
                    }
                }
            }
            applied.effects.extend(local_lost);
        }

        let mut bonus_id = None;
        if let Some(BonusWinner {
            player_id,
            new_score,
        }) = bonus_winner
        {
            match self.hippos.get_mut(&player_id) {
                Some(hippo) => {
                    hippo.player.score = new_score;
                    hippo.won_bonus = true;
                    if let Some(local) = self.local.as_mut().filter(|l| l.id == player_id) {
                        local.score = new_score;
                    }
                    bonus_id = Some(player_id);
                    scores_changed = true;
                }
                None => {
                    info!(player_id = %player_id, "dropping stale bonus winner");
                    applied.stale.push(player_id);
                }
            }
        }

        if scores_changed {
            self.recompute_crown()?;
        }
        applied.effects.push(Effect::RoundEnded {
            losers,
            bonus_winner: bonus_id,
        });
        Ok(applied)
    }

    /// Highlight a player as the speed bonus winner.
    ///
    /// # Errors
    ///
    /// [`StoreError::Stale`] for an unknown player.
    pub fn award_bonus(&mut self, player_id: &PlayerId) -> Result<(), StoreError> {
        self.live_mut(player_id, "BonusAwarded")?.won_bonus = true;
        Ok(())
    }

    /// Apply the server's leader designation.
    ///
    /// The next local recompute (any score or roster change) may move the
    /// crown again.
    ///
    /// # Errors
    ///
    /// [`StoreError::Stale`] for an unknown or eliminated player.
    pub fn set_crown(&mut self, player_id: &PlayerId) -> Result<(), StoreError> {
        match self.hippos.get(player_id) {
            Some(hippo) if !hippo.is_eliminated => {}
            _ => {
                return Err(StoreError::Stale {
                    player_id: player_id.clone(),
                    event: "LeaderChanged",
                })
            }
        }
        self.install_crown(Some(player_id.clone()))?;
        Ok(())
    }

    /// Start the two-phase removal of a player who lost.
    ///
    /// # Errors
    ///
    /// [`StoreError::Stale`] if neither a hippo nor the local player matches.
    pub fn remove_player(
        &mut self,
        player_id: &PlayerId,
        final_score: u64,
    ) -> Result<Applied, StoreError> {
        let local_lost = self.mark_local_lost(player_id, final_score);

        let Some(hippo) = self.hippos.get_mut(player_id) else {
            return match local_lost {
                Some(effect) => Ok(Applied::with(effect)),
                None => Err(StoreError::Stale {
                    player_id: player_id.clone(),
                    event: "PlayerRemoved",
                }),
            };
        };
        hippo.player.score = final_score;

        let mut applied = Applied::default();
        if let Some(effects) = self.mark_eliminated(player_id) {
            applied.effects.extend(effects);
        }
        applied.effects.extend(local_lost);
        self.recompute_crown()?;
        Ok(applied)
    }

    /// Phase two of a removal: drop the hippo from the lookup table and its
    /// side sequence.
    ///
    /// Returns `Ok(false)` without touching anything if the hippo is already
    /// gone or was never marked eliminated, so running it twice is harmless.
    ///
    /// # Errors
    ///
    /// [`InvariantViolation::MissingFromSide`] if the hippo is in the lookup
    /// table but not in the side sequence it was seated on.
    pub fn complete_removal(&mut self, player_id: &PlayerId) -> Result<bool, InvariantViolation> {
        let side = match self.hippos.get(player_id) {
            None => {
                debug!(player_id = %player_id, "removal already completed");
                return Ok(false);
            }
            Some(hippo) if !hippo.is_eliminated => {
                debug!(player_id = %player_id, "removal requested for a live hippo");
                return Ok(false);
            }
            Some(hippo) => hippo.side,
        };

        let seq = self.sides.get_mut(side);
        let Some(position) = seq.iter().position(|id| id == player_id) else {
            return Err(InvariantViolation::MissingFromSide {
                player_id: player_id.clone(),
            });
        };
        seq.remove(position);
        self.hippos.remove(player_id);

        self.recompute_crown()?;
        self.audit()?;
        self.revision += 1;
        debug!(player_id = %player_id, "removed hippo");
        Ok(true)
    }

    /// Hide the death banner. Called by the banner timer; never fails.
    pub fn clear_death_banner(&mut self) {
        if self.death_banner.is_active {
            self.death_banner.is_active = false;
            self.revision += 1;
        }
    }

    /// Re-derive the crown holder from current scores.
    ///
    /// # Errors
    ///
    /// [`InvariantViolation::MultipleCrowns`] if the result is not unique.
    pub fn recompute_crown(&mut self) -> Result<(), InvariantViolation> {
        let holder = leaderboard::resolve(self.hippos.values());
        self.install_crown(holder)
    }

    // ── Local player ────────────────────────────────────────────────

    /// Record the player owned by this session, from a register or rejoin
    /// response.
    pub fn set_local_player(&mut self, registered: RegisteredPlayer) {
        self.local = Some(LocalPlayer {
            id: registered.id,
            name: registered.name,
            is_playing: true,
            score: registered.score,
            has_crown: registered.has_crown,
        });
        self.revision += 1;
    }

    /// Apply the score returned by a feed request.
    ///
    /// Responses are not ordered against the event stream, so a response
    /// only ever raises the local score. Returns `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Only invariant violations from the crown recompute.
    pub fn apply_feed_response(&mut self, score: u64) -> Result<bool, InvariantViolation> {
        let Some(local) = self.local.as_mut() else {
            return Ok(false);
        };
        if score <= local.score {
            return Ok(false);
        }
        local.score = score;
        let id = local.id.clone();
        if let Some(hippo) = self.hippos.get_mut(&id) {
            hippo.player.score = hippo.player.score.max(score);
        }
        self.recompute_crown()?;
        self.revision += 1;
        Ok(true)
    }

    /// Whether the local player may feed right now.
    ///
    /// # Errors
    ///
    /// The reason feeding is refused.
    pub fn can_feed(&self) -> Result<&PlayerId, RejectReason> {
        let local = self.playing_local()?;
        if self.round.is_active() {
            return Err(RejectReason::RoundActive);
        }
        Ok(&local.id)
    }

    /// Whether the local player may submit a nose-goes attempt right now.
    ///
    /// # Errors
    ///
    /// The reason submitting is refused.
    pub fn can_submit_nose_goes(&self) -> Result<&PlayerId, RejectReason> {
        let local = self.playing_local()?;
        if !self.round.is_active() {
            return Err(RejectReason::RoundInactive);
        }
        Ok(&local.id)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn hippo(&self, player_id: &PlayerId) -> Option<&Hippo> {
        self.hippos.get(player_id)
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.hippos.contains_key(player_id)
    }

    pub fn hippos(&self) -> impl Iterator<Item = &Hippo> {
        self.hippos.values()
    }

    /// Identifiers seated on `side`, in clockwise order.
    pub fn side(&self, side: Side) -> &[PlayerId] {
        self.sides.get(side)
    }

    pub fn sides(&self) -> &SideMap<Vec<PlayerId>> {
        &self.sides
    }

    pub fn len(&self) -> usize {
        self.hippos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hippos.is_empty()
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    pub fn crown_holder(&self) -> Option<&PlayerId> {
        self.crown.as_ref()
    }

    pub fn death_banner(&self) -> &DeathBanner {
        &self.death_banner
    }

    pub fn layout(&self) -> LayoutPolicy {
        self.layout
    }

    pub fn local_player(&self) -> Option<&LocalPlayer> {
        self.local.as_ref()
    }

    /// Increments on every mutation; lets observers skip unchanged states.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn live_mut(
        &mut self,
        player_id: &PlayerId,
        event: &'static str,
    ) -> Result<&mut Hippo, StoreError> {
        self.hippos.get_mut(player_id).ok_or_else(|| StoreError::Stale {
            player_id: player_id.clone(),
            event,
        })
    }

    fn playing_local(&self) -> Result<&LocalPlayer, RejectReason> {
        match &self.local {
            Some(local) if local.is_playing => Ok(local),
            _ => Err(RejectReason::NotPlaying),
        }
    }

    /// Phase one of a removal. Returns `None` if the hippo is missing or
    /// already marked.
    fn mark_eliminated(&mut self, player_id: &PlayerId) -> Option<Vec<Effect>> {
        let hippo = self.hippos.get_mut(player_id)?;
        if hippo.is_eliminated {
            debug!(player_id = %player_id, "hippo already eliminated");
            return None;
        }
        hippo.is_eliminated = true;
        hippo.has_crown = false;
        let name = hippo.player.name.clone();
        let side = hippo.side;

        self.death_banner = DeathBanner {
            is_active: true,
            hippo_name: Some(name.clone()),
        };
        Some(vec![
            Effect::Eliminated {
                player_id: player_id.clone(),
                name,
                side,
            },
            Effect::DeathBannerShown,
        ])
    }

    fn mark_local_lost(&mut self, player_id: &PlayerId, final_score: u64) -> Option<Effect> {
        let local = self.local.as_mut().filter(|l| &l.id == player_id)?;
        if !local.is_playing {
            return None;
        }
        local.is_playing = false;
        local.has_crown = false;
        local.score = final_score;
        Some(Effect::LocalPlayerLost { final_score })
    }

    fn install_crown(&mut self, holder: Option<PlayerId>) -> Result<(), InvariantViolation> {
        let crowned = leaderboard::apply(&mut self.hippos, holder.as_ref());
        if crowned > 1 {
            return Err(InvariantViolation::MultipleCrowns { count: crowned });
        }
        if let Some(local) = self.local.as_mut() {
            local.has_crown = local.is_playing && holder.as_ref() == Some(&local.id);
        }
        self.crown = holder;
        Ok(())
    }

    /// Check that the lookup table and side sequences agree.
    fn audit(&self) -> Result<(), InvariantViolation> {
        let mut seated = HashSet::with_capacity(self.hippos.len());
        for (side, seq) in self.sides.iter() {
            for id in seq {
                let placed = self.hippos.get(id).is_some_and(|h| h.side == side);
                if !placed || !seated.insert(id) {
                    return Err(InvariantViolation::OrphanSideEntry {
                        player_id: id.clone(),
                        side: side.name(),
                    });
                }
            }
        }
        if let Some(id) = self.hippos.keys().find(|id| !seated.contains(id)) {
            return Err(InvariantViolation::MissingFromSide {
                player_id: id.clone(),
            });
        }
        let crowned = self.hippos.values().filter(|h| h.has_crown).count();
        if crowned > 1 {
            return Err(InvariantViolation::MultipleCrowns { count: crowned });
        }
        Ok(())
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

    fn info(id: &str) -> PlayerInfo {
        PlayerInfo {
            id: PlayerId::new(id),
            name: format!("Hippo {id}"),
            score: 0,
            num_marbles: None,
            marbles: vec![],
            has_crown: false,
        }
    }

    fn marble(key: &str) -> Marble {
        Marble {
            key: MarbleKey::new(key),
            color: "blue".into(),
            angle: 0.0,
            radius: 0.0,
        }
    }

    fn id(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    #[test]
    fn duplicate_registration_is_an_invariant_violation() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        let err = store.register_player(info("a")).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(store.len(), 1);
        assert_eq!(store.layout().cursor(), 1);
    }

    #[test]
    fn score_for_unknown_player_is_stale_and_changes_nothing() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        let before = store.revision();
        let err = store
            .apply(GameEvent::ScoreIncreased {
                player_id: id("ghost"),
                new_score: 3,
                new_item_count: Some(0),
                consumed_item_key: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Stale { .. }));
        assert!(!err.is_fatal());
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn consuming_an_unknown_marble_is_fatal_and_leaves_score_alone() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.add_item(&id("a"), marble("m1"), 1).unwrap();

        let err = store
            .record_score(&id("a"), 9, Some(0), Some(&MarbleKey::new("nope")))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invariant(InvariantViolation::UnknownMarble { .. })
        ));
        assert_eq!(store.hippo(&id("a")).unwrap().player.score, 0);
        assert_eq!(store.hippo(&id("a")).unwrap().player.marbles.len(), 1);
    }

    #[test]
    fn consuming_a_marble_checks_the_resulting_count() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.add_item(&id("a"), marble("m1"), 1).unwrap();
        store.add_item(&id("a"), marble("m2"), 2).unwrap();

        let err = store
            .record_score(&id("a"), 1, Some(0), Some(&MarbleKey::new("m1")))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invariant(InvariantViolation::MarbleCountMismatch {
                expected: 0,
                actual: 1,
                ..
            })
        ));

        let side = store
            .record_score(&id("a"), 1, Some(1), Some(&MarbleKey::new("m1")))
            .unwrap();
        assert_eq!(side, Side::Top);
        let hippo = store.hippo(&id("a")).unwrap();
        assert_eq!(hippo.player.marbles, vec![marble("m2")]);
        assert_eq!(hippo.player.marble_count, 1);
    }

    #[test]
    fn adding_a_duplicate_marble_is_fatal() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.add_item(&id("a"), marble("m1"), 1).unwrap();
        let err = store.add_item(&id("a"), marble("m1"), 2).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Invariant(InvariantViolation::DuplicateMarble { .. })
        ));
    }

    #[test]
    fn removal_is_two_phase() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();

        let applied = store.remove_player(&id("a"), 4).unwrap();
        assert!(applied.effects.contains(&Effect::DeathBannerShown));
        let hippo = store.hippo(&id("a")).unwrap();
        assert!(hippo.is_eliminated);
        assert_eq!(hippo.player.score, 4);
        assert_eq!(store.side(Side::Top), &[id("a")]);
        assert!(store.death_banner().is_active);
        assert_eq!(store.crown_holder(), None);

        assert!(store.complete_removal(&id("a")).unwrap());
        assert!(store.is_empty());
        assert!(store.side(Side::Top).is_empty());

        // Phase two again, and the banner timer afterwards, are no-ops.
        assert!(!store.complete_removal(&id("a")).unwrap());
        store.clear_death_banner();
        store.clear_death_banner();
        assert!(!store.death_banner().is_active);
    }

    #[test]
    fn complete_removal_ignores_live_hippos() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        assert!(!store.complete_removal(&id("a")).unwrap());
        assert!(store.contains(&id("a")));
    }

    #[test]
    fn repeated_loss_reports_do_not_reschedule_removal() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.register_player(info("b")).unwrap();

        let first = store.end_round(&[id("a")], None).unwrap();
        assert!(first
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Eliminated { .. })));

        let second = store.remove_player(&id("a"), 0).unwrap();
        assert!(second.effects.is_empty());
    }

    #[test]
    fn begin_round_clears_bonus_highlight() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.begin_round();
        store
            .end_round(
                &[],
                Some(BonusWinner {
                    player_id: id("a"),
                    new_score: 15,
                }),
            )
            .unwrap();
        let hippo = store.hippo(&id("a")).unwrap();
        assert!(hippo.won_bonus);
        assert_eq!(hippo.player.score, 15);

        store.begin_round();
        assert!(!store.hippo(&id("a")).unwrap().won_bonus);
    }

    #[test]
    fn stale_losers_do_not_fail_the_round() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.begin_round();
        let applied = store.end_round(&[id("gone"), id("a")], None).unwrap();
        assert_eq!(applied.stale, vec![id("gone")]);
        assert!(store.hippo(&id("a")).unwrap().is_eliminated);
        assert_eq!(store.round(), RoundState::Inactive);
    }

    #[test]
    fn server_leader_designation_moves_crown() {
        let mut store = GameStore::new();
        store.register_player(info("a")).unwrap();
        store.register_player(info("b")).unwrap();
        assert_eq!(store.crown_holder(), Some(&id("a")));

        store.set_crown(&id("b")).unwrap();
        assert_eq!(store.crown_holder(), Some(&id("b")));
        assert!(!store.hippo(&id("a")).unwrap().has_crown);

        assert!(matches!(
            store.set_crown(&id("ghost")),
            Err(StoreError::Stale { .. })
        ));
    }

    #[test]
    fn local_player_gates_actions() {
        let mut store = GameStore::new();
        assert_eq!(store.can_feed(), Err(RejectReason::NotPlaying));

        store.set_local_player(RegisteredPlayer {
            id: id("me"),
            name: "Steve".into(),
            score: 0,
            has_crown: false,
        });
        assert_eq!(store.can_feed(), Ok(&id("me")));
        assert_eq!(
            store.can_submit_nose_goes(),
            Err(RejectReason::RoundInactive)
        );

        store.begin_round();
        assert_eq!(store.can_feed(), Err(RejectReason::RoundActive));
        assert_eq!(store.can_submit_nose_goes(), Ok(&id("me")));
    }

    #[test]
    fn local_loss_without_hippo_is_not_stale() {
        let mut store = GameStore::new();
        store.set_local_player(RegisteredPlayer {
            id: id("me"),
            name: "Steve".into(),
            score: 2,
            has_crown: false,
        });
        let applied = store.remove_player(&id("me"), 11).unwrap();
        assert_eq!(
            applied.effects,
            vec![Effect::LocalPlayerLost { final_score: 11 }]
        );
        let local = store.local_player().unwrap();
        assert!(!local.is_playing);
        assert_eq!(local.score, 11);
        assert_eq!(store.can_feed(), Err(RejectReason::NotPlaying));
    }

    #[test]
    fn round_loss_score_comes_from_the_loser_only() {
        let mut store = GameStore::new();
        store.set_local_player(RegisteredPlayer {
            id: id("me"),
            name: "Steve".into(),
            score: 9,
            has_crown: false,
        });
        store.begin_round();
        let applied = store.end_round(&[id("ghost"), id("me")], None).unwrap();

        assert_eq!(applied.stale, vec![id("ghost")]);
        assert_eq!(
            applied.effects,
            vec![
                Effect::LocalPlayerLost { final_score: 9 },
                Effect::RoundEnded {
                    losers: vec![id("me")],
                    bonus_winner: None,
                },
            ]
        );
        assert_eq!(store.local_player().unwrap().score, 9);
    }

    #[test]
    fn feed_response_only_raises_score() {
        let mut store = GameStore::new();
        store.register_player(info("me")).unwrap();
        store.set_local_player(RegisteredPlayer {
            id: id("me"),
            name: "Steve".into(),
            score: 5,
            has_crown: false,
        });
        assert!(store.apply_feed_response(7).unwrap());
        assert!(!store.apply_feed_response(6).unwrap());
        assert_eq!(store.local_player().unwrap().score, 7);
        assert_eq!(store.hippo(&id("me")).unwrap().player.score, 7);
    }

    #[test]
    fn reset_restarts_layout_cycle() {
        let mut store = GameStore::new();
        for n in 0..3 {
            store.register_player(info(&n.to_string())).unwrap();
        }
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.layout().cursor(), 0);
        assert_eq!(store.register_player(info("x")).unwrap(), Side::Top);
    }
}
