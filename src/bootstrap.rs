//! Session bootstrap: reconcile the one-off roster query with the event
//! stream that kept flowing while the query was in flight.
//!
//! The stream is connected before the roster is fetched, so nothing is
//! missed, but anything that happened between the two may show up in both.
//! Buffered events are replayed on top of the roster and the ones the roster
//! already reflects are skipped:
//!
//! - registrations of players already in the roster,
//! - marbles whose key is already in the pile,
//! - score events that do not move the roster score forward.
//!
//! Everything else goes through the store as usual, so a stale reference
//! during replay is dropped exactly as it would be live.

use tracing::{debug, info};

use crate::error::StoreError;
use crate::event::GameEvent;
use crate::protocol::PlayerInfo;
use crate::store::{Effect, GameStore};

/// Events received before the roster arrived.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<GameEvent>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        debug!(event = event.name(), "buffering event until roster is applied");
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// What reconciliation did.
#[derive(Debug, Default, PartialEq)]
pub struct BootstrapReport {
    /// Players seated from the roster.
    pub roster: usize,
    /// Buffered events applied on top of it.
    pub replayed: usize,
    /// Buffered events the roster already reflected.
    pub skipped: usize,
    /// Buffered events dropped as stale references.
    pub stale: usize,
    /// Effects produced by replayed events, in order.
    pub effects: Vec<Effect>,
}

/// Seat `roster` into `store`, then replay `buffer` on top of it.
///
/// # Errors
///
/// Only invariant violations; stale references are counted and dropped.
pub fn reconcile(
    store: &mut GameStore,
    roster: Vec<PlayerInfo>,
    buffer: EventBuffer,
) -> Result<BootstrapReport, StoreError> {
    let mut report = BootstrapReport::default();

    for player in roster {
        if store.contains(&player.id) {
            debug!(player_id = %player.id, "roster lists a player twice");
            continue;
        }
        store.apply(GameEvent::PlayerRegistered { player })?;
        report.roster += 1;
    }

    for event in buffer.events {
        if already_reflected(store, &event) {
            debug!(event = event.name(), "skipping event already in roster");
            report.skipped += 1;
            continue;
        }
        match store.apply(event) {
            Ok(applied) => {
                report.replayed += 1;
                report.stale += applied.stale.len();
                report.effects.extend(applied.effects);
            }
            Err(StoreError::Stale { player_id, event }) => {
                info!(player_id = %player_id, event, "dropping stale buffered event");
                report.stale += 1;
            }
            Err(err) => return Err(err),
        }
    }

    debug!(
        roster = report.roster,
        replayed = report.replayed,
        skipped = report.skipped,
        "bootstrap reconciled"
    );
    Ok(report)
}

fn already_reflected(store: &GameStore, event: &GameEvent) -> bool {
    match event {
        GameEvent::PlayerRegistered { player } => store.contains(&player.id),
        GameEvent::ItemAdded {
            player_id, item, ..
        } => store
            .hippo(player_id)
            .is_some_and(|h| h.player.position_of(&item.key).is_some()),
        GameEvent::ScoreIncreased {
            player_id,
            new_score,
            consumed_item_key,
            ..
        } => store.hippo(player_id).is_some_and(|h| {
            let consumed = consumed_item_key
                .as_ref()
                .is_some_and(|key| h.player.position_of(key).is_none());
            h.player.score >= *new_score && (consumed_item_key.is_none() || consumed)
        }),
        _ => false,
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
    use crate::protocol::{Marble, MarbleKey, PlayerId};

    fn marble(key: &str) -> Marble {
        Marble {
            key: MarbleKey::new(key),
            color: "green".into(),
            angle: 0.0,
            radius: 0.0,
        }
    }

    fn player(id: &str, score: u64, marbles: &[&str]) -> PlayerInfo {
        PlayerInfo {
            id: PlayerId::new(id),
            name: id.into(),
            score,
            num_marbles: None,
            marbles: marbles.iter().map(|k| marble(k)).collect(),
            has_crown: false,
        }
    }

    #[test]
    fn duplicate_registration_from_stream_is_skipped() {
        let mut store = GameStore::new();
        let mut buffer = EventBuffer::new();
        buffer.push(GameEvent::PlayerRegistered {
            player: player("a", 0, &[]),
        });
        buffer.push(GameEvent::PlayerRegistered {
            player: player("b", 0, &[]),
        });

        let report = reconcile(&mut store, vec![player("a", 0, &[])], buffer).unwrap();
        assert_eq!(report.roster, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.replayed, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn reflected_marbles_and_scores_are_skipped() {
        let mut store = GameStore::new();
        let mut buffer = EventBuffer::new();
        buffer.push(GameEvent::ItemAdded {
            player_id: PlayerId::new("a"),
            item: marble("m1"),
            new_item_count: 1,
        });
        buffer.push(GameEvent::ScoreIncreased {
            player_id: PlayerId::new("a"),
            new_score: 2,
            new_item_count: Some(0),
            consumed_item_key: Some(MarbleKey::new("m0")),
        });
        buffer.push(GameEvent::ScoreIncreased {
            player_id: PlayerId::new("a"),
            new_score: 3,
            new_item_count: Some(0),
            consumed_item_key: Some(MarbleKey::new("m1")),
        });

        let report = reconcile(&mut store, vec![player("a", 2, &["m1"])], buffer).unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.replayed, 1);
        let hippo = store.hippo(&PlayerId::new("a")).unwrap();
        assert_eq!(hippo.player.score, 3);
        assert!(hippo.player.marbles.is_empty());
        assert!(matches!(report.effects[0], Effect::Chomp { .. }));
    }

    #[test]
    fn stale_buffered_events_are_counted_not_fatal() {
        let mut store = GameStore::new();
        let mut buffer = EventBuffer::new();
        buffer.push(GameEvent::PlayerRemoved {
            player_id: PlayerId::new("gone"),
            final_score: 1,
        });
        let report = reconcile(&mut store, vec![], buffer).unwrap();
        assert_eq!(report.stale, 1);
        assert!(store.is_empty());
    }
}
