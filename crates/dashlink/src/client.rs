//! `GameClient` builder and the consumer-facing client.
//!
//! This is the entry point for joining a game. It ties together all the
//! layers: transport → protocol → session, plus the two background tasks.
//!
//! The consumer (a frame loop) talks to the client synchronously: it polls
//! fields or drains a frame update, and calls [`GameClient::send`] once per
//! frame. Only [`GameClientBuilder::connect`] is async, because it may wait
//! for discovery.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dashlink_protocol::{Codec, Message, ObstacleState, PlayerId, PlayerState, TextCodec};
use dashlink_session::{
    Callbacks, EventQueue, SessionEvent, SessionPhase, SessionSnapshot, SharedSession,
    StatsSnapshot,
};
use dashlink_transport::{DatagramTransport, UdpTransport};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::resolve_fixed;
use crate::join::run_join_loop;
use crate::receiver::run_receiver;
use crate::{discover, ClientConfig, ClientError, DiscoveryConfig, RetryPolicy, ServerLocator};

/// State shared by the client handle and its background tasks.
///
/// Wrapped in `Arc` so each task holds its own reference.
pub(crate) struct ClientInner<T: DatagramTransport, C: Codec> {
    pub(crate) transport: T,
    pub(crate) codec: C,
    pub(crate) session: SharedSession,
    pub(crate) callbacks: Callbacks,
}

impl<T: DatagramTransport, C: Codec> ClientInner<T, C> {
    /// One direct, non-blocking write to the server. No retry, no queue.
    fn send_now(&self, message: &Message) -> Result<(), ClientError> {
        let bytes = self.codec.encode(message)?;
        let stats = self.session.stats();
        match self.transport.try_send_to(&bytes, self.session.server_addr()) {
            Ok(()) => {
                stats.record_sent();
                Ok(())
            }
            Err(e) => {
                stats.record_send_failure();
                tracing::debug!(command = message.command(), error = %e, "send failed");
                self.session.emit(SessionEvent::SendFailed {
                    command: message.command(),
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and connecting a [`GameClient`].
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), dashlink::ClientError> {
/// use dashlink::GameClient;
///
/// // Broadcast discovery on the default port.
/// let client = GameClient::builder().connect().await?;
///
/// // Or skip discovery.
/// let client = GameClient::builder()
///     .server("192.168.1.20:4321")
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GameClientBuilder {
    config: ClientConfig,
}

impl GameClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Uses a fixed server instead of broadcast discovery.
    pub fn server(mut self, host: impl Into<String>) -> Self {
        self.config.locator = ServerLocator::Fixed { host: host.into() };
        self
    }

    /// Uses broadcast discovery (the default).
    pub fn broadcast(mut self) -> Self {
        self.config.locator = ServerLocator::Broadcast;
        self
    }

    /// Sets the local bind address.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Sets the discovery probe settings.
    pub fn discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.config.discovery = discovery;
        self
    }

    /// Sets how long one receive waits before looping.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.config.recv_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the `JOIN` resend policy.
    pub fn join_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.join_retry = policy;
        self
    }

    /// Binds a UDP socket, locates the server, and starts the client.
    ///
    /// # Errors
    /// - [`ClientError::DiscoveryFailed`]: broadcast discovery found nobody
    /// - [`ClientError::Resolve`]: the fixed server could not be resolved
    /// - [`ClientError::Transport`]: the socket could not be bound
    pub async fn connect(self) -> Result<GameClient, ClientError> {
        let transport = UdpTransport::bind(&self.config.bind_addr).await?;
        GameClient::connect_with(transport, TextCodec, self.config).await
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Everything that changed since the previous frame.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    /// The session as of the end of this drain. Consistent across fields.
    pub snapshot: SessionSnapshot,
    /// Events in arrival order.
    pub events: Vec<SessionEvent>,
}

impl FrameUpdate {
    /// Obstacles spawned since the previous frame.
    pub fn obstacles(&self) -> impl Iterator<Item = ObstacleState> + '_ {
        self.events.iter().filter_map(|event| match event {
            SessionEvent::Obstacle(obstacle) => Some(*obstacle),
            _ => None,
        })
    }

    /// Whether `START` arrived since the previous frame.
    pub fn game_started(&self) -> bool {
        self.events.contains(&SessionEvent::GameStarted)
    }
}

/// A connected multiplayer client.
///
/// Owns the transport and two background tasks (receiver and join-retry).
/// Closing or dropping the client stops both.
pub struct GameClient<T: DatagramTransport = UdpTransport, C: Codec = TextCodec> {
    inner: Arc<ClientInner<T, C>>,
    events: EventQueue,
    snapshot: SessionSnapshot,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl GameClient {
    /// Creates a new builder.
    pub fn builder() -> GameClientBuilder {
        GameClientBuilder::new()
    }

    /// Connects over UDP with the given configuration.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        GameClientBuilder::new().config(config).connect().await
    }
}

impl<T, C> GameClient<T, C>
where
    T: DatagramTransport,
    C: Codec,
{
    /// Locates the server over `transport` (discovery or fixed address)
    /// and starts the client on it.
    pub async fn connect_with(
        transport: T,
        codec: C,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let server_addr = match &config.locator {
            ServerLocator::Broadcast => {
                discover(&transport, config.port, &config.discovery).await?
            }
            ServerLocator::Fixed { host } => resolve_fixed(host, config.port).await?,
        };
        Ok(Self::start(transport, codec, server_addr, &config))
    }

    /// Starts the client against a known server address, skipping
    /// discovery.
    ///
    /// Must be called from within a Tokio runtime: the receiver and
    /// join-retry tasks are spawned here.
    pub fn start(transport: T, codec: C, server_addr: SocketAddr, config: &ClientConfig) -> Self {
        let (session, events) = SharedSession::new(server_addr, config.event_capacity);
        let inner = Arc::new(ClientInner {
            transport,
            codec,
            session,
            callbacks: Callbacks::default(),
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        let receiver = tokio::spawn(run_receiver(
            Arc::clone(&inner),
            shutdown_rx.clone(),
            config.recv_timeout(),
        ));
        let joiner = tokio::spawn(run_join_loop(
            Arc::clone(&inner),
            shutdown_rx,
            config.join_retry.clone().validated(),
        ));

        tracing::info!(%server_addr, "client started");

        Self {
            inner,
            events,
            snapshot: SessionSnapshot::default(),
            shutdown,
            tasks: vec![receiver, joiner],
        }
    }

    // -----------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------

    /// Tells the server we are ready. Only the first successful call sends
    /// anything; after a failed send the next call tries again.
    pub fn send_ready(&self) -> Result<(), ClientError> {
        let session = &self.inner.session;
        if !session.mark_ready() {
            return Ok(());
        }
        let result = self.inner.send_now(&Message::Ready);
        session.finish_ready(result.is_ok());
        result
    }

    /// Sends our state for this frame. Fire-and-forget: a failed send is
    /// not retried; next frame's send is the recovery.
    pub fn send(&self, state: &PlayerState) -> Result<(), ClientError> {
        self.inner.send_now(&Message::State(*state))
    }

    // -----------------------------------------------------------------
    // Polling (live fields)
    // -----------------------------------------------------------------

    pub fn my_id(&self) -> PlayerId {
        self.inner.session.my_id()
    }

    pub fn player_count(&self) -> u32 {
        self.inner.session.player_count()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.session.is_ready()
    }

    /// Peeks at the start flag without consuming it.
    pub fn start_game(&self) -> bool {
        self.inner.session.start_game()
    }

    /// Consumes the start flag, whether it was seen live or through
    /// [`poll_frame`](Self::poll_frame).
    pub fn take_start_game(&mut self) -> bool {
        let live = self.inner.session.take_start_game();
        let framed = std::mem::take(&mut self.snapshot.start_game);
        live || framed
    }

    /// The latest snapshot of the other player.
    pub fn other_player(&self) -> Option<PlayerState> {
        self.inner.session.other_player()
    }

    /// Notified on every new peer snapshot.
    pub fn subscribe_other_player(&self) -> watch::Receiver<Option<PlayerState>> {
        self.inner.session.subscribe_other_player()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.session.phase()
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.inner.session.server_addr()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.inner.transport.local_addr()?)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.session.stats().snapshot()
    }

    // -----------------------------------------------------------------
    // Frame view
    // -----------------------------------------------------------------

    /// Drains everything that happened since the last call and folds it
    /// into one consistent snapshot. Call once per frame.
    pub fn poll_frame(&mut self) -> FrameUpdate {
        let events = self.events.drain();
        for event in &events {
            self.snapshot.apply(event);
        }
        FrameUpdate {
            snapshot: self.snapshot,
            events,
        }
    }

    /// The event queue, for consumers that would rather `await` events.
    pub fn events(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    // -----------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------

    /// Called on the receiver task for every obstacle. Re-post to your
    /// own loop before touching engine state.
    pub fn on_obstacle(&self, callback: impl Fn(ObstacleState) + Send + Sync + 'static) {
        self.inner.callbacks.set_obstacle(callback);
    }

    /// Called on the receiver task when the server starts the game.
    pub fn on_game_start(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.callbacks.set_game_start(callback);
    }

    pub fn clear_callbacks(&self) {
        self.inner.callbacks.clear();
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Leaves the game locally (back to a menu). Keeps the id; the server
    /// is not told.
    pub fn reset_local(&mut self) {
        self.inner.session.reset_local();
        self.snapshot.ready = false;
        self.snapshot.start_game = false;
        self.snapshot.game_started = false;
    }

    /// Signals both background tasks to stop and closes the transport.
    /// Idempotent.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
        self.inner.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.transport.is_closed()
    }

    /// Closes the client and waits for both background tasks to finish.
    pub async fn shutdown(mut self) {
        self.close();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "background task ended abnormally");
            }
        }
    }
}

impl<T: DatagramTransport, C: Codec> Drop for GameClient<T, C> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_saturates_huge_recv_timeout() {
        let builder = GameClientBuilder::new().recv_timeout(Duration::MAX);
        assert_eq!(builder.config.recv_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_builder_fixed_server_sets_locator() {
        let builder = GameClientBuilder::new().port(5000).server("10.0.0.1");
        assert_eq!(builder.config.port, 5000);
        assert_eq!(
            builder.config.locator,
            ServerLocator::Fixed {
                host: "10.0.0.1".into()
            }
        );
    }
}
