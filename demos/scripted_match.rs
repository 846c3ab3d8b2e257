//! # Scripted Match Example
//!
//! Plays a short match against an in-process fake server, from the point of
//! view of one player's phone:
//!
//! - a loopback [`Transport`] stands in for the player event stream
//! - a [`GameApi`] implementation answers register, roster, feed, and
//!   nose-goes requests
//!
//! Useful as a template for testing a renderer without a real server.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example scripted_match
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hippo_client::protocol::{NoseGoesOutcome, PlayerId, PlayerInfo, RegisteredPlayer};
use hippo_client::{GameApi, HippoError, HippoSession, SessionConfig, SessionEvent, Transport};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: The fake server
// ─────────────────────────────────────────────────────────────────────

/// Receive half of the loopback; the demo keeps the sender.
struct LoopbackTransport {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn recv(&mut self) -> Option<Result<String, HippoError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), HippoError> {
        self.rx.close();
        Ok(())
    }
}

/// Answers the action endpoints for player `"2"`.
#[derive(Default)]
struct FakeServer {
    score: AtomicU64,
}

fn info(id: &str, name: &str, score: u64) -> PlayerInfo {
    PlayerInfo {
        id: PlayerId::new(id),
        name: name.to_string(),
        score,
        num_marbles: None,
        marbles: vec![],
        has_crown: false,
    }
}

#[async_trait]
impl GameApi for FakeServer {
    async fn register_player(&self) -> Result<RegisteredPlayer, HippoError> {
        Ok(RegisteredPlayer {
            id: PlayerId::new("2"),
            name: "Lady Gulps".into(),
            score: 0,
            has_crown: false,
        })
    }

    async fn rejoin(&self, player_id: &PlayerId) -> Result<RegisteredPlayer, HippoError> {
        Err(HippoError::Request(format!("404 Not Found: {player_id}")))
    }

    async fn feed(&self, _: &PlayerId) -> Result<u64, HippoError> {
        Ok(self.score.fetch_add(1, Ordering::Relaxed) + 1)
    }

    async fn submit_nose_goes(&self, _: &PlayerId) -> Result<NoseGoesOutcome, HippoError> {
        Ok(NoseGoesOutcome::Survived)
    }

    async fn list_players(&self) -> Result<Vec<PlayerInfo>, HippoError> {
        Ok(vec![
            info("1", "Big Bertha", 3),
            info("2", "Lady Gulps", 0),
            info("3", "Tiny Tim", 1),
        ])
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: Drive the match
// ─────────────────────────────────────────────────────────────────────

/// What the server broadcasts, in order, once the player is seated.
const SCRIPT: &[&str] = &[
    r#"{"HippoEat":{"id":"1","score":4,"num_marbles":0}}"#,
    r#""BeginNoseGoes""#,
    r#"{"EndNoseGoes":{"losers":["3"],"bonus_winner":["2",6]}}"#,
    r#"{"UpdateWinner":{"id":"2"}}"#,
    r#"{"PlayerLose":{"id":"1","score":4}}"#,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (server_tx, rx) = mpsc::unbounded_channel();
    let config = SessionConfig::player(None).with_death_banner_duration(Duration::from_millis(200));
    let (mut session, mut event_rx) =
        HippoSession::start(LoopbackTransport { rx }, FakeServer::default(), config);
    let mut snapshots = session.subscribe();

    let mut script = SCRIPT.iter();
    while let Some(event) = event_rx.recv().await {
        match &event {
            SessionEvent::Registered { player_id, name } => {
                tracing::info!("Playing as {name} ({player_id})");
            }
            SessionEvent::Bootstrapped { players } => {
                tracing::info!("Seated with {players} hippo(s)");
                snapshots
                    .wait_for(|s| s.can_feed().is_ok())
                    .await
                    .map_err(|e| format!("session ended early: {e}"))?;
                session.feed()?;
            }
            SessionEvent::FeedAccepted { score } => {
                tracing::info!("Fed! Score is now {score}");
            }
            SessionEvent::RoundBegan => {
                snapshots
                    .wait_for(|s| s.round_active)
                    .await
                    .map_err(|e| format!("session ended early: {e}"))?;
                session.submit_nose_goes()?;
            }
            SessionEvent::NoseGoesResult { outcome } => {
                tracing::info!("Nose goes: {outcome:?}");
            }
            SessionEvent::Disconnected { reason } => {
                tracing::info!("Disconnected: {}", reason.as_deref().unwrap_or("clean"));
                break;
            }
            other => tracing::info!("Event: {other:?}"),
        }

        // Feed the next broadcast after every event until the script runs out.
        match script.next() {
            Some(msg) => server_tx.send((*msg).to_string())?,
            None => break,
        }
    }

    let snapshot = session.snapshot();
    for hippo in snapshot.hippos() {
        tracing::info!(
            "{} on {}: {} point(s){}{}",
            hippo.name,
            hippo.side.name(),
            hippo.score,
            if hippo.has_crown { ", crowned" } else { "" },
            if hippo.won_bonus { ", bonus" } else { "" },
        );
    }

    session.shutdown().await;
    Ok(())
}
