//! Transport abstraction for the inbound game event stream.
//!
//! The [`Transport`] trait is a one-way text message channel from the game
//! server to this client. Outbound actions do not travel on it; they go
//! through [`GameApi`](crate::api::GameApi) instead.
//!
//! # Connection Setup
//!
//! Connection setup is not part of this trait. Construct a connected
//! transport externally, then pass it to `HippoSession::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use hippo_client::error::HippoError;
//! use hippo_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn recv(&mut self) -> Option<Result<String, HippoError>> {
//!         // Receive the next JSON text message
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), HippoError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::HippoError;

/// An ordered, reliable stream of JSON text messages from the game server.
///
/// Each call to [`recv`](Transport::recv) returns one complete message.
///
/// # Object Safety
///
/// This trait is object-safe, so `Box<dyn Transport>` works for dynamic
/// dispatch.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the session uses
/// it inside `tokio::select!`. If `recv` is cancelled before completion,
/// calling it again must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred (e.g. [`HippoError::TransportReceive`])
    /// - `None`: the connection was closed cleanly by the server
    async fn recv(&mut self) -> Option<Result<String, HippoError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources in that case.
    async fn close(&mut self) -> Result<(), HippoError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn recv(&mut self) -> Option<Result<String, HippoError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), HippoError> {
        (**self).close().await
    }
}
