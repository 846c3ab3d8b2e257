#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for hippo client integration tests.
//!
//! Provides a channel-fed [`MockTransport`], a scripted [`MockApi`], and
//! helpers that build server message JSON.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use hippo_client::protocol::{
    Marble, MarbleKey, NoseGoesOutcome, PlayerId, PlayerInfo, RegisteredPlayer, ServerMessage,
};
use hippo_client::{GameApi, HippoError, SessionEvent, Transport};
use tokio::sync::mpsc;

// ── MockTransport ───────────────────────────────────────────────────

/// A mock transport fed from a channel.
///
/// Scripted messages are delivered first, then whatever the test pushes
/// through the returned sender. Dropping the sender closes the stream.
pub struct MockTransport {
    scripted: VecDeque<Option<Result<String, HippoError>>>,
    live: mpsc::UnboundedReceiver<String>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(
        scripted: Vec<Option<Result<String, HippoError>>>,
    ) -> (Self, mpsc::UnboundedSender<String>, Arc<AtomicBool>) {
        let (tx, live) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            scripted: VecDeque::from(scripted),
            live,
            closed: Arc::clone(&closed),
        };
        (transport, tx, closed)
    }

    /// A transport that only delivers what the test pushes.
    pub fn live() -> (Self, mpsc::UnboundedSender<String>, Arc<AtomicBool>) {
        Self::new(vec![])
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<Result<String, HippoError>> {
        if let Some(item) = self.scripted.pop_front() {
            return item;
        }
        self.live.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), HippoError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockApi ─────────────────────────────────────────────────────────

/// A scripted game server API.
#[derive(Clone, Default)]
pub struct MockApi {
    pub roster: Arc<StdMutex<Vec<PlayerInfo>>>,
    /// Ids `rejoin` recognizes.
    pub known: Arc<StdMutex<Vec<PlayerId>>>,
    /// Score returned by the next `feed`.
    pub feed_score: Arc<AtomicU64>,
    pub nose_goes: Arc<StdMutex<Option<NoseGoesOutcome>>>,
    pub fail_roster: Arc<AtomicBool>,
    pub calls: Arc<StdMutex<Vec<String>>>,
    /// Delay before `list_players` answers.
    pub roster_delay: Arc<StdMutex<Duration>>,
}

impl MockApi {
    pub fn with_roster(players: Vec<PlayerInfo>) -> Self {
        let api = Self::default();
        *api.roster.lock().unwrap() = players;
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl GameApi for MockApi {
    async fn register_player(&self) -> Result<RegisteredPlayer, HippoError> {
        self.record("register");
        Ok(RegisteredPlayer {
            id: PlayerId::new("100"),
            name: "Fresh Hippo".into(),
            score: 0,
            has_crown: false,
        })
    }

    async fn rejoin(&self, player_id: &PlayerId) -> Result<RegisteredPlayer, HippoError> {
        self.record(format!("rejoin {player_id}"));
        if self.known.lock().unwrap().contains(player_id) {
            Ok(RegisteredPlayer {
                id: player_id.clone(),
                name: "Returning Hippo".into(),
                score: 0,
                has_crown: false,
            })
        } else {
            Err(HippoError::Request("404 Not Found".into()))
        }
    }

    async fn feed(&self, player_id: &PlayerId) -> Result<u64, HippoError> {
        self.record(format!("feed {player_id}"));
        Ok(self.feed_score.load(Ordering::Relaxed))
    }

    async fn submit_nose_goes(&self, player_id: &PlayerId) -> Result<NoseGoesOutcome, HippoError> {
        self.record(format!("nose-goes {player_id}"));
        self.nose_goes
            .lock()
            .unwrap()
            .ok_or_else(|| HippoError::Request("500 Internal Server Error".into()))
    }

    async fn list_players(&self) -> Result<Vec<PlayerInfo>, HippoError> {
        self.record("players");
        let delay = *self.roster_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_roster.load(Ordering::Relaxed) {
            return Err(HippoError::Request("connection refused".into()));
        }
        Ok(self.roster.lock().unwrap().clone())
    }
}

// ── Builders ────────────────────────────────────────────────────────

pub fn player(id: &str, score: u64) -> PlayerInfo {
    PlayerInfo {
        id: PlayerId::new(id),
        name: format!("Hippo {id}"),
        score,
        num_marbles: None,
        marbles: vec![],
        has_crown: false,
    }
}

pub fn marble(key: &str) -> Marble {
    Marble {
        key: MarbleKey::new(key),
        color: "red".into(),
        angle: 1.5,
        radius: 0.8,
    }
}

// ── JSON helper functions ───────────────────────────────────────────

fn to_json(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("server message serialization")
}

pub fn register_json(id: &str, score: u64) -> String {
    to_json(&ServerMessage::PlayerRegister(player(id, score)))
}

pub fn eat_json(id: &str, score: u64, num_marbles: usize, marble: Option<&str>) -> String {
    to_json(&ServerMessage::HippoEat {
        id: PlayerId::new(id),
        score,
        num_marbles: Some(num_marbles),
        marble: marble.map(MarbleKey::new),
    })
}

pub fn add_marble_json(id: &str, key: &str, num_marbles: usize) -> String {
    to_json(&ServerMessage::AddMarble {
        id: PlayerId::new(id),
        marble: marble(key),
        num_marbles,
    })
}

pub fn begin_json() -> String {
    r#""BeginNoseGoes""#.to_string()
}

pub fn end_json(losers: &[&str], bonus_winner: Option<(&str, u64)>) -> String {
    to_json(&ServerMessage::EndNoseGoes {
        losers: losers.iter().map(|id| PlayerId::new(*id)).collect(),
        loser: None,
        bonus_winner: bonus_winner.map(|(id, score)| (PlayerId::new(id), score)),
    })
}

pub fn lose_json(id: &str, score: u64) -> String {
    to_json(&ServerMessage::PlayerLose {
        id: PlayerId::new(id),
        score,
    })
}

pub fn winner_json(id: &str) -> String {
    to_json(&ServerMessage::UpdateWinner {
        id: PlayerId::new(id),
    })
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive events until one matches `pred`, failing after a second.
pub async fn wait_for(
    events: &mut mpsc::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
