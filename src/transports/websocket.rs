//! WebSocket transport for the game event stream, using `tokio-tungstenite`.
//!
//! The game server broadcasts player events and host events on separate
//! WebSocket ports; connect one [`WebSocketTransport`] to whichever stream the
//! session's role consumes. Both `ws://` and `wss://` URLs are supported.
//!
//! # Feature gate
//!
//! Only available with the `transport-websocket` feature (enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), hippo_client::HippoError> {
//! use hippo_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:6769").await?;
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("received: {msg}");
//! }
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::error::HippoError;
use crate::transport::Transport;

/// The underlying WebSocket stream, for [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Text frames are yielded as messages. Ping and pong frames are handled by
/// tungstenite and skipped, as are binary frames, which the game server never
/// sends.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: dropping its future before it
/// completes does not lose a frame.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Connect to the event stream at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`HippoError::Io`] if the URL is invalid or the connection
    /// cannot be established. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind); anything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, HippoError> {
        tracing::debug!(url = %url, "connecting to event stream");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                WsError::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            HippoError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "event stream connected");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established stream (custom TLS, proxies, headers).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// [`connect`](Self::connect), failing with [`HippoError::Timeout`] if
    /// the connection is not up within `timeout`.
    ///
    /// # Errors
    ///
    /// [`HippoError::Timeout`] on deadline, or anything `connect` returns.
    pub async fn connect_with_timeout(
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, HippoError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| HippoError::Timeout)?
    }

    /// Whether [`close`](Transport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Option<Result<String, HippoError>> {
        if self.closed {
            return None;
        }
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(HippoError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), HippoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.close(None).await.map_err(|e| match e {
            // The peer hung up first.
            WsError::ConnectionClosed | WsError::AlreadyClosed => HippoError::TransportClosed,
            other => HippoError::TransportReceive(other.to_string()),
        })
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
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
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn websocket_transport_is_debug() {
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let result = WebSocketTransport::connect("not-a-valid-url").await;
        let err = result.unwrap_err();
        assert!(matches!(err, HippoError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let result = WebSocketTransport::connect("ws://127.0.0.1:1").await;
        let err = result.unwrap_err();
        assert!(matches!(err, HippoError::Io(_)));
    }

    // ── Mock-stream helpers ──────────────────────────────────────────────

    use tokio::net::TcpListener;

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    // ── Mock-stream tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let result = transport.recv().await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, "after_binary");
    }

    #[tokio::test]
    async fn recv_after_close_returns_none() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_yields_game_messages_in_order() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#""BeginNoseGoes""#.into()))
                .await
                .unwrap();
            ws.send(Message::Ping(vec![1].into())).await.unwrap();
            ws.send(Message::Text(r#"{"PlayerLose":{"id":"4","score":9}}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let first = transport.recv().await.unwrap().unwrap();
        let second = transport.recv().await.unwrap().unwrap();
        assert_eq!(first, r#""BeginNoseGoes""#);
        assert!(second.contains("PlayerLose"));
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // TEST-NET-1 is never routed.
        let result = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            std::time::Duration::from_millis(50),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, HippoError::Timeout));
    }

    #[tokio::test]
    async fn from_stream_constructor_works() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"UpdateWinner":{"id":"2"}}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut transport = WebSocketTransport::from_stream(ws_stream);

        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"UpdateWinner":{"id":"2"}}"#);
    }
}
