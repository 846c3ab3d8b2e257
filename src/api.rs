//! Outbound action requests and the bootstrap roster query.
//!
//! The game server exposes a small HTTP API next to its event streams. The
//! session only talks to it through [`GameApi`], so tests and alternative
//! backends can supply their own implementation. Responses update the local
//! player directly; they are never treated as part of the ordered event
//! stream.

use async_trait::async_trait;

use crate::error::HippoError;
use crate::protocol::{NoseGoesOutcome, PlayerId, PlayerInfo, RegisteredPlayer};

/// The game server's request/response endpoints.
///
/// Every method maps one-to-one onto a server route; see
/// [`HttpGameApi`](crate::apis::HttpGameApi) for the paths.
#[async_trait]
pub trait GameApi: Send + Sync + 'static {
    /// Register a new player and receive its identity.
    ///
    /// # Errors
    ///
    /// [`HippoError::Request`] if the server could not be reached or refused.
    async fn register_player(&self) -> Result<RegisteredPlayer, HippoError>;

    /// Resume a previously registered player.
    ///
    /// # Errors
    ///
    /// [`HippoError::Request`] if the identifier is unknown to the server.
    async fn rejoin(&self, player_id: &PlayerId) -> Result<RegisteredPlayer, HippoError>;

    /// Feed the player's hippo once. Returns the updated score.
    ///
    /// # Errors
    ///
    /// [`HippoError::Request`] on any request failure.
    async fn feed(&self, player_id: &PlayerId) -> Result<u64, HippoError>;

    /// Report that the player touched the poison marble.
    ///
    /// # Errors
    ///
    /// [`HippoError::Request`] on any request failure.
    async fn submit_nose_goes(&self, player_id: &PlayerId) -> Result<NoseGoesOutcome, HippoError>;

    /// Fetch the full current roster.
    ///
    /// # Errors
    ///
    /// [`HippoError::Request`] on any request failure.
    async fn list_players(&self) -> Result<Vec<PlayerInfo>, HippoError>;
}

/// Rejoin with `cached_id` if given, falling back to a fresh registration
/// when the server no longer knows it.
///
/// # Errors
///
/// Only if the fallback registration fails too.
pub async fn join<A: GameApi + ?Sized>(
    api: &A,
    cached_id: Option<&PlayerId>,
) -> Result<RegisteredPlayer, HippoError> {
    if let Some(id) = cached_id {
        match api.rejoin(id).await {
            Ok(player) => return Ok(player),
            Err(e) => {
                tracing::info!(player_id = %id, "rejoin failed, registering a new player: {e}");
            }
        }
    }
    api.register_player().await
}

#[async_trait]
impl<T: GameApi + ?Sized> GameApi for std::sync::Arc<T> {
    async fn register_player(&self) -> Result<RegisteredPlayer, HippoError> {
        (**self).register_player().await
    }

    async fn rejoin(&self, player_id: &PlayerId) -> Result<RegisteredPlayer, HippoError> {
        (**self).rejoin(player_id).await
    }

    async fn feed(&self, player_id: &PlayerId) -> Result<u64, HippoError> {
        (**self).feed(player_id).await
    }

    async fn submit_nose_goes(&self, player_id: &PlayerId) -> Result<NoseGoesOutcome, HippoError> {
        (**self).submit_nose_goes(player_id).await
    }

    async fn list_players(&self) -> Result<Vec<PlayerInfo>, HippoError> {
        (**self).list_players().await
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
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        known: Option<PlayerId>,
        calls: Mutex<Vec<&'static str>>,
    }

    fn registered(id: &str) -> RegisteredPlayer {
        RegisteredPlayer {
            id: PlayerId::new(id),
            name: "Gumbo".into(),
            score: 0,
            has_crown: false,
        }
    }

    #[async_trait]
    impl GameApi for Recorder {
        async fn register_player(&self) -> Result<RegisteredPlayer, HippoError> {
            self.calls.lock().unwrap().push("register");
            Ok(registered("new"))
        }

        async fn rejoin(&self, player_id: &PlayerId) -> Result<RegisteredPlayer, HippoError> {
            self.calls.lock().unwrap().push("rejoin");
            match &self.known {
                Some(known) if known == player_id => Ok(registered(known.as_str())),
                _ => Err(HippoError::Request("404 Not Found".into())),
            }
        }

        async fn feed(&self, _: &PlayerId) -> Result<u64, HippoError> {
            unimplemented!()
        }

        async fn submit_nose_goes(&self, _: &PlayerId) -> Result<NoseGoesOutcome, HippoError> {
            unimplemented!()
        }

        async fn list_players(&self) -> Result<Vec<PlayerInfo>, HippoError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn join_without_cache_registers() {
        let api = Recorder::default();
        let player = join(&api, None).await.unwrap();
        assert_eq!(player.id, PlayerId::new("new"));
        assert_eq!(*api.calls.lock().unwrap(), vec!["register"]);
    }

    #[tokio::test]
    async fn join_rejoins_known_player() {
        let api = Recorder {
            known: Some(PlayerId::new("7")),
            ..Default::default()
        };
        let player = join(&api, Some(&PlayerId::new("7"))).await.unwrap();
        assert_eq!(player.id, PlayerId::new("7"));
        assert_eq!(*api.calls.lock().unwrap(), vec!["rejoin"]);
    }

    #[tokio::test]
    async fn join_falls_back_when_rejoin_fails() {
        let api = Recorder::default();
        let player = join(&api, Some(&PlayerId::new("stale"))).await.unwrap();
        assert_eq!(player.id, PlayerId::new("new"));
        assert_eq!(*api.calls.lock().unwrap(), vec!["rejoin", "register"]);
    }
}
