//! Async session runtime for one hippo client.
//!
//! [`HippoSession`] is a thin handle to a background task that owns the
//! session's [`GameStore`] outright. The task multiplexes the inbound event
//! stream, user actions from the handle, completions of scheduled work, and
//! the shutdown signal with `tokio::select!`, so the store is only ever
//! touched from one place and needs no locks.
//!
//! Renderers get two feeds:
//!
//! - a bounded channel of [`SessionEvent`]s for one-shot moments (chomps,
//!   eliminations, round changes), returned from [`HippoSession::start`];
//! - a `watch` channel holding the latest [`StoreSnapshot`], published after
//!   every mutation ([`HippoSession::subscribe`]).
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:6769").await?;
//! let api = HttpGameApi::new("http://localhost:8000")?;
//! let (mut session, mut events) = HippoSession::start(transport, api, SessionConfig::host());
//! let mut snapshots = session.subscribe();
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::Chomp { side, .. } => { /* animate */ }
//!         SessionEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::api::{self, GameApi};
use crate::bootstrap::{self, EventBuffer};
use crate::codec::{self, DecodeError};
use crate::error::{HippoError, InvariantViolation, RejectReason, Result, StoreError};
use crate::event::{GameEvent, SessionEvent};
use crate::protocol::{NoseGoesOutcome, PlayerId, PlayerInfo, RegisteredPlayer};
use crate::snapshot::StoreSnapshot;
use crate::store::{Effect, GameStore};
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default time the death banner stays up.
const DEFAULT_DEATH_BANNER_DURATION: Duration = Duration::from_secs(5);

// ── Configuration ───────────────────────────────────────────────────

/// Which display this session drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// The shared screen showing every hippo. Issues no player actions.
    Host,
    /// One player's phone. Registers (or rejoins) before bootstrapping.
    Player {
        /// Identifier persisted from an earlier session, if any.
        cached_id: Option<PlayerId>,
    },
}

impl Role {
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }
}

/// Configuration for a [`HippoSession`].
///
/// # Example
///
/// ```
/// use hippo_client::session::{Role, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::player(None)
///     .with_event_channel_capacity(64)
///     .with_death_banner_duration(Duration::from_secs(3));
/// assert!(!config.role.is_host());
/// assert_eq!(config.event_channel_capacity, 64);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub role: Role,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning so
    /// the session loop never blocks. `Fatal` and `Disconnected` are always
    /// delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`HippoSession::shutdown`] waits for the loop before aborting.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// How long the death banner stays up after an elimination.
    ///
    /// Defaults to **5 seconds**.
    pub death_banner_duration: Duration,
}

impl SessionConfig {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            death_banner_duration: DEFAULT_DEATH_BANNER_DURATION,
        }
    }

    /// Configuration for the host display.
    pub fn host() -> Self {
        Self::new(Role::Host)
    }

    /// Configuration for a player, rejoining as `cached_id` when given.
    pub fn player(cached_id: Option<PlayerId>) -> Self {
        Self::new(Role::Player { cached_id })
    }

    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// A zero timeout aborts the loop without waiting.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_death_banner_duration(mut self, duration: Duration) -> Self {
        self.death_banner_duration = duration;
        self
    }
}

/// Random identifier attached to a session's log spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Commands and scheduled work ─────────────────────────────────────

/// User actions queued from the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Feed,
    SubmitNoseGoes,
}

/// Work that completes later and re-enters the loop.
#[derive(Debug)]
enum Scheduled {
    /// Phase two of a hippo removal.
    CompleteRemoval(PlayerId),
    /// The death banner timer fired.
    ClearDeathBanner,
    FeedResponse(std::result::Result<u64, HippoError>),
    NoseGoesResponse(std::result::Result<NoseGoesOutcome, HippoError>),
}

// ── Session handle ──────────────────────────────────────────────────

/// Handle to a running hippo client session.
///
/// Created via [`HippoSession::start`]. Action methods validate against the
/// latest snapshot and return as soon as the action is queued; results come
/// back as [`SessionEvent`]s.
pub struct HippoSession {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<StoreSnapshot>,
    connected: Arc<AtomicBool>,
    role: Role,
    id: SessionId,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl HippoSession {
    /// Spawn the session loop and return a handle plus the event receiver.
    ///
    /// The loop emits [`SessionEvent::Connected`] first, then registers the
    /// local player (player role), fetches the roster, and from then on
    /// mirrors the event stream.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<T, A>(
        transport: T,
        api: A,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>)
    where
        T: Transport,
        A: GameApi,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(StoreSnapshot::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(true));
        let id = SessionId::new();

        let runtime = Runtime::new(
            Arc::new(api),
            event_tx,
            snapshot_tx,
            Arc::clone(&connected),
            config.death_banner_duration,
        );
        let span = tracing::info_span!("hippo_session", session_id = %id);
        let task = tokio::spawn(
            session_loop(transport, runtime, config.role.clone(), cmd_rx, shutdown_rx)
                .instrument(span),
        );

        let session = Self {
            cmd_tx,
            snapshot_rx,
            connected,
            role: config.role,
            id,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (session, event_rx)
    }

    // ── User actions ────────────────────────────────────────────────

    /// Ask the server to feed the local player's hippo.
    ///
    /// # Errors
    ///
    /// [`HippoError::ActionRejected`] on a host session, while a round is
    /// active, or once the local player is out. [`HippoError::NotConnected`]
    /// after the session ended.
    pub fn feed(&self) -> Result<()> {
        self.check(StoreSnapshot::can_feed)?;
        self.send(Command::Feed)
    }

    /// Report that the local player touched the poison marble.
    ///
    /// # Errors
    ///
    /// [`HippoError::ActionRejected`] on a host session, outside a round, or
    /// once the local player is out. [`HippoError::NotConnected`] after the
    /// session ended.
    pub fn submit_nose_goes(&self) -> Result<()> {
        self.check(StoreSnapshot::can_submit_nose_goes)?;
        self.send(Command::SubmitNoseGoes)
    }

    /// Stop the session, closing the transport.
    ///
    /// The event receiver yields `Disconnected` and then `None` once the loop
    /// exits.
    pub async fn shutdown(&mut self) {
        debug!("HippoSession: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver notified after every store mutation.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    /// The local player's id, once registered.
    pub fn local_player_id(&self) -> Option<PlayerId> {
        self.snapshot_rx
            .borrow()
            .local_player
            .as_ref()
            .map(|l| l.id.clone())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn check(
        &self,
        allowed: impl Fn(&StoreSnapshot) -> std::result::Result<&PlayerId, RejectReason>,
    ) -> Result<()> {
        if self.role.is_host() {
            return Err(HippoError::ActionRejected(RejectReason::HostRole));
        }
        let snapshot = self.snapshot_rx.borrow();
        allowed(&*snapshot).map_err(HippoError::ActionRejected)?;
        Ok(())
    }

    fn send(&self, cmd: Command) -> Result<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(HippoError::NotConnected);
        }
        self.cmd_tx.send(cmd).map_err(|_| HippoError::NotConnected)
    }
}

impl fmt::Debug for HippoSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HippoSession")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for HippoSession {
    fn drop(&mut self) {
        // No executor to drive a graceful close from `Drop`; abort instead.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Why the loop stopped early.
enum Exit {
    Shutdown,
    Closed(Option<String>),
    Fatal(String),
}

async fn session_loop<T: Transport, A: GameApi>(
    mut transport: T,
    mut rt: Runtime<A>,
    role: Role,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("session loop started");
    rt.emit(SessionEvent::Connected);

    let exit = match bootstrap_phase(&mut transport, &mut rt, &role, &mut shutdown_rx).await {
        Ok(()) => main_phase(&mut transport, &mut rt, &mut cmd_rx, &mut shutdown_rx).await,
        Err(exit) => exit,
    };

    let reason = match exit {
        Exit::Shutdown => {
            let _ = transport.close().await;
            Some("session shut down".to_string())
        }
        Exit::Closed(reason) => reason,
        Exit::Fatal(reason) => {
            rt.emit_blocking(SessionEvent::Fatal {
                reason: reason.clone(),
            })
            .await;
            let _ = transport.close().await;
            Some(reason)
        }
    };
    rt.connected.store(false, Ordering::Release);
    rt.emit_blocking(SessionEvent::Disconnected { reason }).await;
    debug!("session loop exited");
}

/// Register (player role) and fetch the roster while buffering the stream.
async fn bootstrap_phase<T: Transport, A: GameApi>(
    transport: &mut T,
    rt: &mut Runtime<A>,
    role: &Role,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> std::result::Result<(), Exit> {
    let api = Arc::clone(&rt.api);
    let startup = startup(api.as_ref(), role);
    tokio::pin!(startup);
    let mut buffer = EventBuffer::new();

    let (local, roster) = loop {
        tokio::select! {
            biased;

            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received during bootstrap");
                return Err(Exit::Shutdown);
            }

            result = &mut startup => match result {
                Ok(ready) => break ready,
                Err(e) => {
                    error!("session bootstrap failed: {e}");
                    rt.emit(SessionEvent::RequestFailed { reason: e.to_string() });
                    let _ = transport.close().await;
                    return Err(Exit::Closed(Some(format!("bootstrap failed: {e}"))));
                }
            },

            incoming = transport.recv() => {
                let text = receive(incoming)?;
                if let Some(event) = decode(&text) {
                    buffer.push(event);
                }
            }
        }
    };

    if let Some(local) = local {
        rt.emit(SessionEvent::Registered {
            player_id: local.id.clone(),
            name: local.name.clone(),
        });
        rt.store.set_local_player(local);
    }

    let report = bootstrap::reconcile(&mut rt.store, roster, buffer).map_err(fatal)?;
    rt.emit(SessionEvent::Bootstrapped {
        players: rt.store.len(),
    });
    rt.dispatch(report.effects);
    rt.publish();
    Ok(())
}

async fn startup<A: GameApi + ?Sized>(
    api: &A,
    role: &Role,
) -> Result<(Option<RegisteredPlayer>, Vec<PlayerInfo>)> {
    let local = match role {
        Role::Host => None,
        Role::Player { cached_id } => Some(api::join(api, cached_id.as_ref()).await?),
    };
    let roster = api.list_players().await?;
    Ok((local, roster))
}

async fn main_phase<T: Transport, A: GameApi>(
    transport: &mut T,
    rt: &mut Runtime<A>,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Exit {
    loop {
        // Scheduled work drains before new input.
        let step = tokio::select! {
            biased;

            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                return Exit::Shutdown;
            }

            Some(task) = rt.sched_rx.recv() => rt.handle_scheduled(task),

            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => {
                    rt.handle_command(cmd);
                    Ok(())
                }
                None => {
                    debug!("command channel closed, shutting down session loop");
                    return Exit::Shutdown;
                }
            },

            incoming = transport.recv() => match receive(incoming) {
                Ok(text) => match decode(&text) {
                    Some(event) => rt.handle_event(event),
                    None => Ok(()),
                },
                Err(exit) => return exit,
            },
        };

        if let Err(violation) = step {
            error!("store invariant violated: {violation}");
            return fatal(violation.into());
        }
        rt.publish();
    }
}

fn receive(incoming: Option<Result<String>>) -> std::result::Result<String, Exit> {
    match incoming {
        Some(Ok(text)) => Ok(text),
        Some(Err(e)) => {
            error!("transport receive error: {e}");
            Err(Exit::Closed(Some(format!("transport receive error: {e}"))))
        }
        None => {
            debug!("transport closed by server");
            Err(Exit::Closed(None))
        }
    }
}

/// Decode one message, logging and dropping anything unusable.
fn decode(text: &str) -> Option<GameEvent> {
    match codec::decode(text) {
        Ok(event) => Some(event),
        Err(e) => {
            let unrecognized = matches!(e, DecodeError::UnrecognizedTag(_));
            let err = HippoError::from(e);
            if unrecognized {
                warn!(class = ?err.class(), "ignoring message: {err}");
            } else {
                warn!(class = ?err.class(), "dropping malformed message: {err} (raw: {text})");
            }
            None
        }
    }
}

fn fatal(err: StoreError) -> Exit {
    Exit::Fatal(HippoError::from(err).to_string())
}

// ── Runtime state ───────────────────────────────────────────────────

/// Everything the loop owns besides the transport.
struct Runtime<A> {
    store: GameStore,
    api: Arc<A>,
    event_tx: mpsc::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<StoreSnapshot>,
    sched_tx: mpsc::UnboundedSender<Scheduled>,
    sched_rx: mpsc::UnboundedReceiver<Scheduled>,
    connected: Arc<AtomicBool>,
    death_banner_duration: Duration,
    published: Option<u64>,
}

impl<A: GameApi> Runtime<A> {
    fn new(
        api: Arc<A>,
        event_tx: mpsc::Sender<SessionEvent>,
        snapshot_tx: watch::Sender<StoreSnapshot>,
        connected: Arc<AtomicBool>,
        death_banner_duration: Duration,
    ) -> Self {
        let (sched_tx, sched_rx) = mpsc::unbounded_channel();
        Self {
            store: GameStore::new(),
            api,
            event_tx,
            snapshot_tx,
            sched_tx,
            sched_rx,
            connected,
            death_banner_duration,
            published: None,
        }
    }

    fn handle_event(&mut self, event: GameEvent) -> std::result::Result<(), InvariantViolation> {
        match self.store.apply(event) {
            Ok(applied) => {
                for id in &applied.stale {
                    info!(player_id = %id, "event named a player that already left");
                }
                self.dispatch(applied.effects);
                Ok(())
            }
            Err(StoreError::Stale { player_id, event }) => {
                info!(player_id = %player_id, event, "dropping event for unknown player");
                Ok(())
            }
            Err(StoreError::Invariant(violation)) => Err(violation),
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        let allowed = match cmd {
            Command::Feed => self.store.can_feed(),
            Command::SubmitNoseGoes => self.store.can_submit_nose_goes(),
        };
        let player_id = match allowed {
            Ok(id) => id.clone(),
            Err(reason) => {
                debug!(?cmd, "action no longer allowed: {reason}");
                self.emit(SessionEvent::RequestFailed {
                    reason: reason.to_string(),
                });
                return;
            }
        };

        let api = Arc::clone(&self.api);
        let tx = self.sched_tx.clone();
        tokio::spawn(async move {
            let done = match cmd {
                Command::Feed => Scheduled::FeedResponse(api.feed(&player_id).await),
                Command::SubmitNoseGoes => {
                    Scheduled::NoseGoesResponse(api.submit_nose_goes(&player_id).await)
                }
            };
            let _ = tx.send(done);
        });
    }

    fn handle_scheduled(&mut self, task: Scheduled) -> std::result::Result<(), InvariantViolation> {
        match task {
            Scheduled::CompleteRemoval(id) => {
                self.store.complete_removal(&id)?;
            }
            Scheduled::ClearDeathBanner => self.store.clear_death_banner(),
            Scheduled::FeedResponse(Ok(score)) => {
                self.store.apply_feed_response(score)?;
                self.emit(SessionEvent::FeedAccepted { score });
            }
            Scheduled::NoseGoesResponse(Ok(outcome)) => {
                debug!(?outcome, "nose-goes attempt judged");
                self.emit(SessionEvent::NoseGoesResult { outcome });
            }
            Scheduled::FeedResponse(Err(e)) | Scheduled::NoseGoesResponse(Err(e)) => {
                warn!("action request failed: {e}");
                self.emit(SessionEvent::RequestFailed {
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Turn store effects into UI events and scheduled tasks.
    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Chomp { player_id, side } => {
                    self.emit(SessionEvent::Chomp { player_id, side });
                }
                Effect::Eliminated {
                    player_id,
                    name,
                    side,
                } => {
                    self.schedule_removal(player_id.clone());
                    self.emit(SessionEvent::HippoEliminated {
                        player_id,
                        name,
                        side,
                    });
                }
                Effect::DeathBannerShown => self.schedule_banner_clear(),
                Effect::RoundBegan => self.emit(SessionEvent::RoundBegan),
                Effect::RoundEnded {
                    losers,
                    bonus_winner,
                } => self.emit(SessionEvent::RoundEnded {
                    losers,
                    bonus_winner,
                }),
                Effect::LocalPlayerLost { final_score } => {
                    self.emit(SessionEvent::LocalPlayerLost { final_score });
                }
            }
        }
    }

    /// Phase two runs once the current snapshot has been published and the
    /// scheduler has given renderers a turn.
    fn schedule_removal(&self, player_id: PlayerId) {
        let tx = self.sched_tx.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = tx.send(Scheduled::CompleteRemoval(player_id));
        });
    }

    fn schedule_banner_clear(&self) {
        let tx = self.sched_tx.clone();
        let delay = self.death_banner_duration;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Scheduled::ClearDeathBanner);
        });
    }

    /// Push a fresh snapshot if the store changed since the last one.
    fn publish(&mut self) {
        let revision = self.store.revision();
        if self.published == Some(revision) {
            return;
        }
        self.published = Some(revision);
        self.snapshot_tx.send_replace(self.store.snapshot());
    }

    /// Emit an event. If the channel is full, log a warning and drop it so
    /// the loop never blocks on a slow consumer.
    fn emit(&self, event: SessionEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("event channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }

    /// Emit a terminal event, waiting for channel space.
    async fn emit_blocking(&self, event: SessionEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("event channel closed, receiver dropped");
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        incoming: VecDeque<Option<Result<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn recv(&mut self) -> Option<Result<String>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    struct EmptyServer;

    #[async_trait]
    impl GameApi for EmptyServer {
        async fn register_player(&self) -> Result<RegisteredPlayer> {
            Ok(RegisteredPlayer {
                id: PlayerId::new("1"),
                name: "Pebbles".into(),
                score: 0,
                has_crown: false,
            })
        }

        async fn rejoin(&self, _: &PlayerId) -> Result<RegisteredPlayer> {
            Err(HippoError::Request("404".into()))
        }

        async fn feed(&self, _: &PlayerId) -> Result<u64> {
            Ok(1)
        }

        async fn submit_nose_goes(&self, _: &PlayerId) -> Result<NoseGoesOutcome> {
            Ok(NoseGoesOutcome::Survived)
        }

        async fn list_players(&self) -> Result<Vec<PlayerInfo>> {
            Ok(vec![])
        }
    }

    fn transport(messages: Vec<Option<Result<String>>>) -> (ScriptedTransport, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let transport = ScriptedTransport {
            incoming: messages.into(),
            closed: Arc::clone(&closed),
        };
        (transport, closed)
    }

    #[test]
    fn config_defaults() {
        let config = SessionConfig::host();
        assert!(config.role.is_host());
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.death_banner_duration, Duration::from_secs(5));
        assert_eq!(
            SessionConfig::host()
                .with_event_channel_capacity(0)
                .event_channel_capacity,
            1
        );
    }

    #[tokio::test]
    async fn host_session_bootstraps_then_disconnects_on_close() {
        let (transport, _closed) = transport(vec![None]);
        let (_session, mut events) =
            HippoSession::start(transport, EmptyServer, SessionConfig::host());

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Bootstrapped { players: 0 }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Disconnected { reason: None }
        );
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn host_cannot_feed() {
        let (transport, _closed) = transport(vec![]);
        let (mut session, _events) =
            HippoSession::start(transport, EmptyServer, SessionConfig::host());
        let err = session.feed().unwrap_err();
        assert!(matches!(
            err,
            HippoError::ActionRejected(RejectReason::HostRole)
        ));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_transport_and_reports_reason() {
        let (transport, closed) = transport(vec![]);
        let (mut session, mut events) =
            HippoSession::start(transport, EmptyServer, SessionConfig::player(None));

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Registered { .. }
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Bootstrapped { players: 0 }
        );

        session.shutdown().await;
        assert!(closed.load(Ordering::Relaxed));
        assert!(!session.is_connected());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Disconnected {
                reason: Some("session shut down".into())
            }
        );
        assert!(matches!(session.feed(), Err(HippoError::NotConnected)));
    }
}
