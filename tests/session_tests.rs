#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end session tests over the mock transport and mock API.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{
    add_marble_json, begin_json, eat_json, end_json, lose_json, player, register_json, wait_for,
    winner_json, MockApi, MockTransport,
};
use hippo_client::error::RejectReason;
use hippo_client::protocol::{NoseGoesOutcome, PlayerId};
use hippo_client::{HippoError, HippoSession, SessionConfig, SessionEvent, Side, StoreSnapshot};
use tokio::sync::watch;

fn id(s: &str) -> PlayerId {
    PlayerId::new(s)
}

/// Wait until the published snapshot satisfies `pred`, then return a copy.
async fn settle(
    rx: &mut watch::Receiver<StoreSnapshot>,
    pred: impl FnMut(&StoreSnapshot) -> bool,
) -> StoreSnapshot {
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("session dropped the snapshot sender")
        .clone()
}

fn is_bootstrapped(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Bootstrapped { .. })
}

// ════════════════════════════════════════════════════════════════════
// Bootstrap
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn host_bootstrap_replays_events_buffered_during_roster_fetch() {
    let api = MockApi::with_roster(vec![player("1", 0)]);
    *api.roster_delay.lock().unwrap() = Duration::from_millis(50);
    let (transport, tx, _closed) = MockTransport::live();
    let (session, mut events) = HippoSession::start(transport, api.clone(), SessionConfig::host());
    let mut snapshots = session.subscribe();

    // Both arrive while the roster request is still in flight.
    tx.send(register_json("2", 0)).unwrap();
    tx.send(eat_json("1", 3, 0, None)).unwrap();
    // Already part of the roster; must not be seated twice.
    tx.send(register_json("1", 0)).unwrap();

    assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
    assert_eq!(
        wait_for(&mut events, is_bootstrapped).await,
        SessionEvent::Bootstrapped { players: 2 }
    );

    let snapshot = settle(&mut snapshots, |s| s.len() == 2).await;
    assert_eq!(snapshot.hippo(&id("1")).unwrap().score, 3);
    assert_eq!(snapshot.crown_holder, Some(id("1")));
    assert_eq!(snapshot.sides.top.len(), 2);
    assert!(snapshot.local_player.is_none());
    assert_eq!(api.calls(), vec!["players"]);
}

#[tokio::test]
async fn roster_failure_ends_the_session() {
    let api = MockApi::default();
    api.fail_roster.store(true, Ordering::Relaxed);
    let (transport, _tx, closed) = MockTransport::live();
    let (_session, mut events) = HippoSession::start(transport, api, SessionConfig::host());

    assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::RequestFailed { reason } if reason.contains("connection refused")
    ));
    let SessionEvent::Disconnected { reason } = events.recv().await.unwrap() else {
        panic!("expected Disconnected");
    };
    assert!(reason.unwrap().starts_with("bootstrap failed"));
    assert!(closed.load(Ordering::Relaxed));
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn player_rejoins_with_cached_id() {
    let api = MockApi::default();
    api.known.lock().unwrap().push(id("7"));
    let (transport, _tx, _closed) = MockTransport::live();
    let (mut session, mut events) =
        HippoSession::start(transport, api.clone(), SessionConfig::player(Some(id("7"))));

    let registered = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Registered { .. })
    })
    .await;
    assert_eq!(
        registered,
        SessionEvent::Registered {
            player_id: id("7"),
            name: "Returning Hippo".into(),
        }
    );
    wait_for(&mut events, is_bootstrapped).await;
    assert_eq!(api.calls(), vec!["rejoin 7", "players"]);

    let mut snapshots = session.subscribe();
    settle(&mut snapshots, |s| s.local_player.is_some()).await;
    assert_eq!(session.local_player_id(), Some(id("7")));
    session.shutdown().await;
}

#[tokio::test]
async fn player_registers_fresh_when_cached_id_is_unknown() {
    let api = MockApi::default();
    let (transport, _tx, _closed) = MockTransport::live();
    let (_session, mut events) =
        HippoSession::start(transport, api.clone(), SessionConfig::player(Some(id("9"))));

    let registered = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Registered { .. })
    })
    .await;
    assert!(matches!(
        registered,
        SessionEvent::Registered { player_id, .. } if player_id == id("100")
    ));
    wait_for(&mut events, is_bootstrapped).await;
    assert_eq!(api.calls(), vec!["rejoin 9", "register", "players"]);
}

// ════════════════════════════════════════════════════════════════════
// Event stream
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scoring_emits_chomp_and_moves_crown() {
    let api = MockApi::with_roster(vec![player("1", 2), player("2", 0), player("3", 0)]);
    let (transport, tx, _closed) = MockTransport::live();
    let (session, mut events) = HippoSession::start(transport, api, SessionConfig::host());
    let mut snapshots = session.subscribe();
    wait_for(&mut events, is_bootstrapped).await;

    tx.send(add_marble_json("2", "m1", 1)).unwrap();
    tx.send(eat_json("2", 5, 0, Some("m1"))).unwrap();

    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::Chomp { .. })).await,
        SessionEvent::Chomp {
            player_id: id("2"),
            side: Side::Top,
        }
    );
    let snapshot = settle(&mut snapshots, |s| s.crown_holder == Some(id("2"))).await;
    let hippo = snapshot.hippo(&id("2")).unwrap();
    assert_eq!(hippo.score, 5);
    assert_eq!(hippo.marble_count, 0);
    assert!(hippo.has_crown);
    assert!(!snapshot.hippo(&id("1")).unwrap().has_crown);

    // Server designation overrides until the next recompute.
    tx.send(winner_json("3")).unwrap();
    settle(&mut snapshots, |s| s.crown_holder == Some(id("3"))).await;
}

#[tokio::test]
async fn unusable_and_stale_messages_are_dropped() {
    let api = MockApi::with_roster(vec![player("1", 0)]);
    let (transport, tx, _closed) = MockTransport::live();
    let (session, mut events) = HippoSession::start(transport, api, SessionConfig::host());
    let mut snapshots = session.subscribe();
    wait_for(&mut events, is_bootstrapped).await;

    tx.send(r#"{"HippoDance":{"id":"1"}}"#.into()).unwrap();
    tx.send("garbage".into()).unwrap();
    tx.send(eat_json("404", 9, 0, None)).unwrap();
    tx.send(eat_json("1", 1, 0, None)).unwrap();

    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::Chomp { .. })).await,
        SessionEvent::Chomp {
            player_id: id("1"),
            side: Side::Top,
        }
    );
    let snapshot = settle(&mut snapshots, |s| {
        s.hippo(&id("1")).is_some_and(|h| h.score == 1)
    })
    .await;
    assert_eq!(snapshot.len(), 1);
    assert!(session.is_connected());
}

#[tokio::test]
async fn elimination_removes_hippo_after_it_was_marked() {
    let api = MockApi::with_roster(vec![player("1", 4), player("2", 0)]);
    let (transport, tx, _closed) = MockTransport::live();
    let config = SessionConfig::host().with_death_banner_duration(Duration::from_millis(30));
    let (session, mut events) = HippoSession::start(transport, api, config);
    let mut snapshots = session.subscribe();
    wait_for(&mut events, is_bootstrapped).await;

    tx.send(lose_json("1", 4)).unwrap();

    assert_eq!(
        wait_for(&mut events, |e| matches!(
            e,
            SessionEvent::HippoEliminated { .. }
        ))
        .await,
        SessionEvent::HippoEliminated {
            player_id: id("1"),
            name: "Hippo 1".into(),
            side: Side::Top,
        }
    );

    let snapshot = settle(&mut snapshots, |s| s.len() == 1).await;
    assert!(snapshot.hippo(&id("1")).is_none());
    assert_eq!(snapshot.crown_holder, Some(id("2")));

    let snapshot = settle(&mut snapshots, |s| !s.death_banner.is_active).await;
    assert_eq!(snapshot.death_banner.hippo_name.as_deref(), Some("Hippo 1"));
}

#[tokio::test]
async fn round_ends_with_losers_and_bonus_winner() {
    let api = MockApi::with_roster(vec![player("1", 0), player("2", 0), player("3", 0)]);
    let (transport, tx, _closed) = MockTransport::live();
    let (session, mut events) = HippoSession::start(transport, api, SessionConfig::host());
    let mut snapshots = session.subscribe();
    wait_for(&mut events, is_bootstrapped).await;

    tx.send(begin_json()).unwrap();
    wait_for(&mut events, |e| *e == SessionEvent::RoundBegan).await;
    settle(&mut snapshots, |s| s.round_active).await;

    tx.send(end_json(&["3"], Some(("2", 8)))).unwrap();
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::RoundEnded { .. })).await,
        SessionEvent::RoundEnded {
            losers: vec![id("3")],
            bonus_winner: Some(id("2")),
        }
    );

    let snapshot = settle(&mut snapshots, |s| !s.round_active && s.len() == 2).await;
    let winner = snapshot.hippo(&id("2")).unwrap();
    assert!(winner.won_bonus);
    assert_eq!(winner.score, 8);
    assert_eq!(snapshot.crown_holder, Some(id("2")));
}

// ════════════════════════════════════════════════════════════════════
// Player actions
// ════════════════════════════════════════════════════════════════════

async fn player_session(
    api: MockApi,
) -> (
    HippoSession,
    tokio::sync::mpsc::Receiver<SessionEvent>,
    tokio::sync::mpsc::UnboundedSender<String>,
    watch::Receiver<StoreSnapshot>,
) {
    let (transport, tx, _closed) = MockTransport::live();
    let (session, mut events) = HippoSession::start(transport, api, SessionConfig::player(None));
    let mut snapshots = session.subscribe();
    wait_for(&mut events, is_bootstrapped).await;
    settle(&mut snapshots, |s| s.local_player.is_some()).await;
    (session, events, tx, snapshots)
}

#[tokio::test]
async fn feed_updates_local_score() {
    let api = MockApi::with_roster(vec![player("100", 0)]);
    api.feed_score.store(4, Ordering::Relaxed);
    let (session, mut events, _tx, mut snapshots) = player_session(api.clone()).await;

    tokio_test::assert_ok!(session.feed());
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::FeedAccepted { .. })).await,
        SessionEvent::FeedAccepted { score: 4 }
    );
    let snapshot = settle(&mut snapshots, |s| {
        s.local_player.as_ref().is_some_and(|l| l.score == 4)
    })
    .await;
    assert_eq!(snapshot.hippo(&id("100")).unwrap().score, 4);
    assert!(api.calls().contains(&"feed 100".to_string()));
}

#[tokio::test]
async fn actions_are_gated_by_round_state() {
    let api = MockApi::with_roster(vec![player("100", 0)]);
    *api.nose_goes.lock().unwrap() = Some(NoseGoesOutcome::Died);
    let (session, mut events, tx, mut snapshots) = player_session(api).await;

    assert!(matches!(
        session.submit_nose_goes(),
        Err(HippoError::ActionRejected(RejectReason::RoundInactive))
    ));

    tx.send(begin_json()).unwrap();
    settle(&mut snapshots, |s| s.round_active).await;

    assert!(matches!(
        session.feed(),
        Err(HippoError::ActionRejected(RejectReason::RoundActive))
    ));
    tokio_test::assert_ok!(session.submit_nose_goes());
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::NoseGoesResult { .. })).await,
        SessionEvent::NoseGoesResult {
            outcome: NoseGoesOutcome::Died,
        }
    );
}

#[tokio::test]
async fn failed_action_request_keeps_session_alive() {
    let api = MockApi::with_roster(vec![player("100", 0)]);
    let (session, mut events, tx, mut snapshots) = player_session(api).await;

    tx.send(begin_json()).unwrap();
    settle(&mut snapshots, |s| s.round_active).await;
    tokio_test::assert_ok!(session.submit_nose_goes());

    let failed = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::RequestFailed { .. })
    })
    .await;
    assert!(matches!(
        failed,
        SessionEvent::RequestFailed { reason } if reason.contains("500")
    ));
    assert!(session.is_connected());
}

#[tokio::test]
async fn local_loss_disables_actions() {
    let api = MockApi::with_roster(vec![player("100", 3), player("5", 0)]);
    let (session, mut events, tx, mut snapshots) = player_session(api).await;

    tx.send(lose_json("100", 3)).unwrap();
    assert_eq!(
        wait_for(&mut events, |e| matches!(
            e,
            SessionEvent::LocalPlayerLost { .. }
        ))
        .await,
        SessionEvent::LocalPlayerLost { final_score: 3 }
    );
    settle(&mut snapshots, |s| {
        s.local_player.as_ref().is_some_and(|l| !l.is_playing)
    })
    .await;
    assert!(matches!(
        session.feed(),
        Err(HippoError::ActionRejected(RejectReason::NotPlaying))
    ));
}

// ════════════════════════════════════════════════════════════════════
// Termination
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn duplicate_registration_is_fatal() {
    let api = MockApi::with_roster(vec![player("1", 0)]);
    let (transport, tx, closed) = MockTransport::live();
    let (session, mut events) = HippoSession::start(transport, api, SessionConfig::host());
    wait_for(&mut events, is_bootstrapped).await;

    tx.send(register_json("1", 0)).unwrap();

    let SessionEvent::Fatal { reason } = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Fatal { .. })
    })
    .await
    else {
        unreachable!();
    };
    assert!(reason.contains("player 1 is already registered"), "{reason}");
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Disconnected { reason: Some(_) }
    ));
    assert!(events.recv().await.is_none());
    assert!(closed.load(Ordering::Relaxed));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn transport_error_disconnects_with_reason() {
    let (transport, _tx, _closed) = MockTransport::new(vec![Some(Err(
        HippoError::TransportReceive("connection reset".into()),
    ))]);
    let (session, mut events) =
        HippoSession::start(transport, MockApi::default(), SessionConfig::host());

    let SessionEvent::Disconnected { reason } = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::Disconnected { .. })
    })
    .await
    else {
        unreachable!();
    };
    assert!(reason.unwrap().contains("connection reset"));
    assert!(!session.is_connected());
    assert!(matches!(session.feed(), Err(HippoError::ActionRejected(_))));
}

#[tokio::test]
async fn server_close_disconnects_without_reason() {
    let (transport, tx, _closed) = MockTransport::live();
    let (_session, mut events) =
        HippoSession::start(transport, MockApi::default(), SessionConfig::host());
    wait_for(&mut events, is_bootstrapped).await;

    drop(tx);
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await,
        SessionEvent::Disconnected { reason: None }
    );
}
