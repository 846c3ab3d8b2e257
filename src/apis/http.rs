//! [`GameApi`] over the game server's JSON HTTP endpoints, using `reqwest`.
//!
//! | Method                 | Route                        |
//! |------------------------|------------------------------|
//! | `register_player`      | `GET  /api/register-player`  |
//! | `rejoin`               | `GET  /api/player/{id}`      |
//! | `feed`                 | `POST /api/feed-me`          |
//! | `submit_nose_goes`     | `POST /api/nose-goes/{id}`   |
//! | `list_players`         | `GET  /api/players`          |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::GameApi;
use crate::error::HippoError;
use crate::protocol::{
    FeedRequest, FeedResponse, NoseGoesOutcome, PlayerId, PlayerInfo, PlayersResponse,
    RegisteredPlayer,
};

/// HTTP client for the game server's action endpoints.
#[derive(Debug, Clone)]
pub struct HttpGameApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGameApi {
    /// Target the server at `base_url` (e.g. `http://localhost:8000`).
    ///
    /// # Errors
    ///
    /// [`HippoError::Request`] if the HTTP client cannot be built.
    ///
    /// Every route fails with [`HippoError::Request`] on a transport error or
    /// a non-success status, and with [`HippoError::Serialization`] when the
    /// body does not match the expected shape.
    pub fn new(base_url: impl Into<String>) -> Result<Self, HippoError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| HippoError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(base_url, http))
    }

    /// Reuse an existing `reqwest` client (timeouts, proxies, TLS).
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(
        route: &str,
        res: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, HippoError> {
        let res = res.map_err(|e| HippoError::Request(format!("{route}: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(HippoError::Request(format!(
                "{route}: server responded with {status}: {body}"
            )));
        }
        let body = res
            .text()
            .await
            .map_err(|e| HippoError::Request(format!("{route}: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn register_player(&self) -> Result<RegisteredPlayer, HippoError> {
        debug!("registering player");
        let res = self.http.get(self.url("register-player")).send().await;
        Self::read("register-player", res).await
    }

    async fn rejoin(&self, player_id: &PlayerId) -> Result<RegisteredPlayer, HippoError> {
        debug!(player_id = %player_id, "rejoining");
        let res = self
            .http
            .get(self.url(&format!("player/{player_id}")))
            .send()
            .await;
        Self::read("player", res).await
    }

    async fn feed(&self, player_id: &PlayerId) -> Result<u64, HippoError> {
        let res = self
            .http
            .post(self.url("feed-me"))
            .json(&FeedRequest {
                id: player_id.clone(),
            })
            .send()
            .await;
        let body: FeedResponse = Self::read("feed-me", res).await?;
        Ok(body.score)
    }

    async fn submit_nose_goes(&self, player_id: &PlayerId) -> Result<NoseGoesOutcome, HippoError> {
        let res = self
            .http
            .post(self.url(&format!("nose-goes/{player_id}")))
            .json(&serde_json::json!({}))
            .send()
            .await;
        Self::read("nose-goes", res).await
    }

    async fn list_players(&self) -> Result<Vec<PlayerInfo>, HippoError> {
        let res = self.http.get(self.url("players")).send().await;
        let body: PlayersResponse = Self::read("players", res).await?;
        debug!(players = body.players.len(), "fetched roster");
        Ok(body.players)
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

    #[test]
    fn base_url_is_normalized() {
        let api = HttpGameApi::new("http://localhost:8000/").unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url("players"), "http://localhost:8000/api/players");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_failure() {
        let api = HttpGameApi::new("http://127.0.0.1:1").unwrap();
        let err = api.list_players().await.unwrap_err();
        assert!(matches!(err, HippoError::Request(_)));
        assert!(!err.is_fatal());
    }
}
