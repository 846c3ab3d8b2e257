//! # Hippo Client
//!
//! Client-side state sync for the hungry-hippo party game: a mirror of the
//! server's match state driven by its event stream, shared by the host
//! display and the player phones.
//!
//! ## Layers
//!
//! - **Protocol and codec**: [`protocol`] holds the wire types and
//!   [`codec::decode`] turns one inbound message into a typed [`GameEvent`].
//! - **Store**: [`GameStore`] applies events one at a time, seats hippos
//!   with the [`layout`] cycle, keeps the [`leaderboard`] crown current, and
//!   runs the two-phase removal of eliminated hippos.
//! - **Session**: [`HippoSession`] owns a store, feeds it from a
//!   [`Transport`], bootstraps from the roster, issues player actions through
//!   a [`GameApi`], and publishes [`StoreSnapshot`]s for renderers.
//!
//! ## Features
//!
//! - `transport-websocket` (default): [`WebSocketTransport`]
//! - `http-api`: [`HttpGameApi`](apis::HttpGameApi)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hippo_client::{HippoSession, HttpGameApi, SessionConfig, SessionEvent, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect("ws://localhost:6769").await?;
//! let api = HttpGameApi::new("http://localhost:8000")?;
//! let (session, mut events) = HippoSession::start(transport, api, SessionConfig::host());
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::Disconnected { reason } = event {
//!         eprintln!("connection lost: {reason:?}");
//!         break;
//!     }
//! }
//! ```

pub mod api;
pub mod apis;
pub mod bootstrap;
pub mod codec;
pub mod error;
pub mod error_class;
pub mod event;
pub mod layout;
pub mod leaderboard;
pub mod model;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use api::GameApi;
pub use codec::DecodeError;
pub use error::{HippoError, InvariantViolation, RejectReason, StoreError};
pub use error_class::ErrorClass;
pub use event::{GameEvent, SessionEvent};
pub use model::{Hippo, Player, RoundState, Side};
pub use protocol::{PlayerId, ServerMessage};
pub use session::{HippoSession, Role, SessionConfig};
pub use snapshot::StoreSnapshot;
pub use store::GameStore;
pub use transport::Transport;

#[cfg(feature = "http-api")]
pub use apis::HttpGameApi;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
