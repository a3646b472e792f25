//! Session types: where the client is in the lobby flow, and the
//! consumer-owned snapshot of everything the server has told it.

use dashlink_protocol::{PlayerId, PlayerState};

use crate::SessionEvent;

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the client is in the join/ready/start flow.
///
/// ```text
///   Unjoined ──(ASSIGN)──→ Joined ──(send_ready)──→ ReadyWait ──(START)──→ InGame
/// ```
///
/// There is no way back on the wire: leaving a game is local and the
/// server is never told. "Ended" is the consumer's business and has no
/// phase here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Waiting for the server to assign a player id. `JOIN` is being resent.
    Unjoined,
    /// We have an id but have not said we are ready.
    Joined,
    /// `READY` sent, waiting for `START`.
    ReadyWait,
    /// The server started the game.
    InGame,
}

impl SessionPhase {
    /// Derives the phase from the three facts that drive it.
    ///
    /// `started` wins over everything else: a `START` that overtakes the
    /// `ASSIGN` on the wire still puts the client in the game.
    pub fn derive(my_id: PlayerId, ready: bool, started: bool) -> Self {
        if started {
            Self::InGame
        } else if !my_id.is_assigned() {
            Self::Unjoined
        } else if ready {
            Self::ReadyWait
        } else {
            Self::Joined
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A consistent, consumer-owned view of the session.
///
/// Unlike the live fields on [`SharedSession`](crate::SharedSession),
/// which the receiver may change between two reads, a snapshot only
/// changes when the consumer applies events to it, typically once per
/// frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSnapshot {
    pub my_id: PlayerId,
    pub player_count: u32,
    pub ready: bool,
    /// Raised by `START`; the consumer clears it when it acts on it.
    pub start_game: bool,
    /// Latched by `START`, cleared only by a local reset.
    pub game_started: bool,
    pub other_player: Option<PlayerState>,
}

impl SessionSnapshot {
    /// Folds one event into the snapshot.
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Assigned(id) => {
                if !self.my_id.is_assigned() {
                    self.my_id = *id;
                }
            }
            SessionEvent::PlayerCount(count) => self.player_count = *count,
            SessionEvent::GameStarted => {
                self.start_game = true;
                self.game_started = true;
            }
            SessionEvent::PeerState(state) => self.other_player = Some(*state),
            SessionEvent::ReadySent => self.ready = true,
            SessionEvent::LocalReset => {
                self.ready = false;
                self.start_game = false;
                self.game_started = false;
            }
            SessionEvent::Obstacle(_)
            | SessionEvent::MessageDropped(_)
            | SessionEvent::SendFailed { .. }
            | SessionEvent::JoinAbandoned { .. } => {}
        }
    }

    /// The phase this snapshot is in.
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::derive(self.my_id, self.ready, self.game_started)
    }
}
