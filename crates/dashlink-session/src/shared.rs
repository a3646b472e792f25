//! The live session record shared by the background tasks and the consumer.
//!
//! # Concurrency note
//!
//! There is no lock around the record as a whole. Each scalar is its own
//! atomic, so each is consistent on its own, but two reads can straddle an
//! update (a frame may see `start_game == true` next to a `my_id` from just
//! before or after). The peer snapshot lives in a `watch` channel, which
//! swaps whole `PlayerState` values: a reader never sees `x` from one
//! datagram and `ducking` from another. Consumers that need cross-field
//! consistency drain the event queue into a
//! [`SessionSnapshot`](crate::SessionSnapshot) instead.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use dashlink_protocol::{Message, ObstacleState, PlayerId, PlayerState};
use tokio::sync::{mpsc, watch};

use crate::{EventQueue, SessionError, SessionEvent, SessionPhase, SessionStats};

/// What applying one inbound message changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    Assigned(PlayerId),
    PlayerCount(u32),
    GameStarted,
    PeerState(PlayerState),
    Obstacle(ObstacleState),
    /// A repeat of something already applied (e.g. a resent `ASSIGN`).
    Unchanged,
}

/// The client's session record.
pub struct SharedSession {
    server_addr: SocketAddr,
    my_id: AtomicU8,
    player_count: AtomicU32,
    ready: AtomicBool,
    start_game: AtomicBool,
    game_started: AtomicBool,
    other_player: watch::Sender<Option<PlayerState>>,
    events: mpsc::Sender<SessionEvent>,
    stats: SessionStats,
}

impl SharedSession {
    /// Creates a fresh, unjoined session talking to `server_addr`, and
    /// the queue its events are delivered to.
    pub fn new(server_addr: SocketAddr, event_capacity: usize) -> (Self, EventQueue) {
        let (events, queue) = EventQueue::channel(event_capacity);
        let (other_player, _) = watch::channel(None);
        let session = Self {
            server_addr,
            my_id: AtomicU8::new(PlayerId::UNASSIGNED.0),
            player_count: AtomicU32::new(0),
            ready: AtomicBool::new(false),
            start_game: AtomicBool::new(false),
            game_started: AtomicBool::new(false),
            other_player,
            events,
            stats: SessionStats::default(),
        };
        (session, queue)
    }

    // -----------------------------------------------------------------
    // Receive side
    // -----------------------------------------------------------------

    /// Applies one decoded inbound message.
    ///
    /// Each message touches exactly one thing: the id, the player count,
    /// the start flag, or the peer snapshot. Obstacles change nothing
    /// here; they only pass through to the event queue and callbacks.
    pub fn apply(&self, message: Message) -> Result<Applied, SessionError> {
        let applied = match message {
            Message::Assign { id } => {
                match self.my_id.compare_exchange(
                    PlayerId::UNASSIGNED.0,
                    id.0,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        // A STATE that arrived before our id may have been ours.
                        self.other_player.send_if_modified(|peer| {
                            if peer.is_some_and(|p| p.player_id == id) {
                                *peer = None;
                                true
                            } else {
                                false
                            }
                        });
                        tracing::info!(my_id = %id, "player id assigned");
                        Applied::Assigned(id)
                    }
                    Err(current) if current == id.0 => Applied::Unchanged,
                    Err(current) => {
                        return Err(SessionError::AlreadyAssigned {
                            current: PlayerId(current),
                            offered: id,
                        });
                    }
                }
            }
            Message::Count { players } => {
                self.player_count.store(players, Ordering::Release);
                Applied::PlayerCount(players)
            }
            Message::Start => {
                // Resends coalesce until the consumer takes the flag.
                if self.start_game.swap(true, Ordering::AcqRel) {
                    Applied::Unchanged
                } else {
                    self.game_started.store(true, Ordering::Release);
                    tracing::info!("game started by server");
                    Applied::GameStarted
                }
            }
            Message::State(state) => {
                let me = self.my_id();
                if me.is_assigned() && state.player_id == me {
                    return Err(SessionError::OwnState(me));
                }
                self.other_player.send_replace(Some(state));
                Applied::PeerState(state)
            }
            Message::Obstacle(obstacle) => Applied::Obstacle(obstacle),
            Message::Join | Message::Ready => {
                return Err(SessionError::UnexpectedInbound(message.command()));
            }
        };

        if let Some(event) = applied_event(&applied) {
            self.emit(event);
        }
        Ok(applied)
    }

    /// Queues an event for the consumer. A full queue drops the event
    /// (and counts it) rather than blocking the receiver.
    pub fn emit(&self, event: SessionEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.events.try_send(event) {
            self.stats.record_event_overflow();
        }
    }

    // -----------------------------------------------------------------
    // Consumer side
    // -----------------------------------------------------------------

    /// Claims the local `ready` flag. Returns `true` only for the call
    /// that actually flipped it, so `READY` goes out once. The claim must
    /// be settled with [`finish_ready`](Self::finish_ready).
    pub fn mark_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }

    /// Settles a claim from [`mark_ready`](Self::mark_ready). A `READY`
    /// that never left releases the flag so the next call retries.
    pub fn finish_ready(&self, sent: bool) {
        if sent {
            self.emit(SessionEvent::ReadySent);
        } else {
            self.ready.store(false, Ordering::Release);
        }
    }

    /// Consumes the edge-triggered start flag. The next `START` from the
    /// server raises it again.
    pub fn take_start_game(&self) -> bool {
        self.start_game.swap(false, Ordering::AcqRel)
    }

    /// Forgets local lobby progress (ready, start) after the consumer
    /// leaves a game. The assigned id is kept and the server is not told.
    pub fn reset_local(&self) {
        self.ready.store(false, Ordering::Release);
        self.start_game.store(false, Ordering::Release);
        self.game_started.store(false, Ordering::Release);
        self.emit(SessionEvent::LocalReset);
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn my_id(&self) -> PlayerId {
        PlayerId(self.my_id.load(Ordering::Acquire))
    }

    pub fn player_count(&self) -> u32 {
        self.player_count.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Peeks at the start flag without consuming it.
    pub fn start_game(&self) -> bool {
        self.start_game.load(Ordering::Acquire)
    }

    /// The latest snapshot of the other player, if any arrived yet.
    pub fn other_player(&self) -> Option<PlayerState> {
        *self.other_player.borrow()
    }

    /// A receiver that is notified on every new peer snapshot.
    pub fn subscribe_other_player(&self) -> watch::Receiver<Option<PlayerState>> {
        self.other_player.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::derive(
            self.my_id(),
            self.is_ready(),
            self.game_started.load(Ordering::Acquire),
        )
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

fn applied_event(applied: &Applied) -> Option<SessionEvent> {
    match *applied {
        Applied::Assigned(id) => Some(SessionEvent::Assigned(id)),
        Applied::PlayerCount(count) => Some(SessionEvent::PlayerCount(count)),
        Applied::GameStarted => Some(SessionEvent::GameStarted),
        Applied::PeerState(state) => Some(SessionEvent::PeerState(state)),
        Applied::Obstacle(obstacle) => Some(SessionEvent::Obstacle(obstacle)),
        Applied::Unchanged => None,
    }
}
