//! # Host Display Example
//!
//! Mirrors a running hungry-hippo match the way the shared host screen does:
//!
//! 1. Connect to the host event stream via WebSocket
//! 2. Bootstrap from the server's roster over HTTP
//! 3. Print chomps, eliminations, and round changes as they happen
//! 4. Redraw a text scoreboard whenever the snapshot changes
//! 5. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start the game server (HTTP on :8000, host stream on :6769), then:
//! cargo run --example host_display --features http-api
//!
//! # Override the endpoints:
//! HIPPO_WS_URL=ws://arcade:6769 HIPPO_HTTP_URL=http://arcade:8000 \
//!     cargo run --example host_display --features http-api
//! ```

use hippo_client::{
    HippoSession, HttpGameApi, SessionConfig, SessionEvent, Side, StoreSnapshot,
    WebSocketTransport,
};

const DEFAULT_WS_URL: &str = "ws://localhost:6769";
const DEFAULT_HTTP_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=hippo_client=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let ws_url = std::env::var("HIPPO_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
    let http_url =
        std::env::var("HIPPO_HTTP_URL").unwrap_or_else(|_| DEFAULT_HTTP_URL.to_string());
    tracing::info!("Connecting to {ws_url} (API at {http_url})");

    // ── Connect ─────────────────────────────────────────────────────
    let transport = WebSocketTransport::connect(&ws_url).await?;
    let api = HttpGameApi::new(http_url)?;
    let (mut session, mut event_rx) = HippoSession::start(transport, api, SessionConfig::host());
    let mut snapshots = session.subscribe();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    SessionEvent::Bootstrapped { players } => {
                        tracing::info!("Mirroring {players} hippo(s)");
                    }
                    SessionEvent::Chomp { player_id, side } => {
                        tracing::info!("CHOMP! {player_id} ({})", side.name());
                    }
                    SessionEvent::HippoEliminated { name, side, .. } => {
                        tracing::warn!("A hippo has fallen: {name} on the {} side", side.name());
                    }
                    SessionEvent::RoundBegan => tracing::info!("Nose goes!"),
                    SessionEvent::RoundEnded { losers, bonus_winner } => {
                        tracing::info!(
                            "Round over: {} loser(s), bonus to {}",
                            losers.len(),
                            bonus_winner.map_or_else(|| "nobody".to_string(), |id| id.to_string())
                        );
                    }
                    SessionEvent::Fatal { reason } => {
                        tracing::error!("Display state is corrupt: {reason}");
                    }
                    SessionEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("server closed"));
                        break;
                    }
                    other => tracing::debug!("Event: {other:?}"),
                }
            }

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_scoreboard(&snapshot);
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    session.shutdown().await;
    tracing::info!("Host display shut down. Goodbye!");
    Ok(())
}

fn print_scoreboard(snapshot: &StoreSnapshot) {
    println!("── revision {} ──", snapshot.revision);
    for side in Side::ALL {
        let row: Vec<String> = snapshot
            .sides
            .get(side)
            .iter()
            .map(|h| {
                let crown = if h.has_crown { "👑" } else { "" };
                let dead = if h.is_eliminated { " ✝" } else { "" };
                format!("{crown}{} {}{dead}", h.name, h.score)
            })
            .collect();
        println!("{:>6}: {}", side.name(), row.join(", "));
    }
    if snapshot.death_banner.is_active {
        if let Some(name) = &snapshot.death_banner.hippo_name {
            println!("   >>> {name} has fallen <<<");
        }
    }
    if snapshot.round_active {
        println!("   >>> NOSE GOES <<<");
    }
}
