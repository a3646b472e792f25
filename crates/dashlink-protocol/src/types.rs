//! Core protocol types for Dashlink's wire format.
//!
//! These are the values that travel between the client and the server:
//! who a player is, where they are, and which obstacle just spawned.
//! All of them are small `Copy` values. A `PlayerState` is never
//! patched field by field: it is built whole and then replaced whole,
//! so anyone holding one sees a single consistent datagram's worth of
//! data.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A player slot assigned by the server.
///
/// A newtype over `u8`: `0` means "not assigned yet", and a two-player
/// server hands out `1` and `2`. Wrapping the raw number keeps it from
/// being confused with a player count or a coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The id a client holds before the server answers its `JOIN`.
    pub const UNASSIGNED: PlayerId = PlayerId(0);

    /// The highest id the server hands out (two peers at most).
    pub const MAX: u8 = 2;

    /// Whether the server has assigned this id.
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// One player's replicated state: position and crouch.
///
/// Sent by each client every frame (`STATE`) and relayed by the server
/// to the other peer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Whose state this is.
    pub player_id: PlayerId,
    /// Horizontal position in world units.
    pub x: f32,
    /// Vertical position in world units.
    pub y: f32,
    /// Whether the player is crouching.
    pub ducking: bool,
}

impl PlayerState {
    /// Builds a complete state value.
    pub fn new(player_id: PlayerId, x: f32, y: f32, ducking: bool) -> Self {
        Self {
            player_id,
            x,
            y,
            ducking,
        }
    }
}

// ---------------------------------------------------------------------------
// Obstacles
// ---------------------------------------------------------------------------

/// What kind of obstacle the server spawned.
///
/// On the wire this is the `t` field: `0` or `1`. Any other number makes
/// the whole `OBST` message invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Ground obstacle, `t=0`.
    Cactus,
    /// Flying obstacle, `t=1`.
    Pterodactyl,
}

impl ObstacleKind {
    /// The numeric tag used on the wire.
    pub fn wire_tag(self) -> u8 {
        match self {
            Self::Cactus => 0,
            Self::Pterodactyl => 1,
        }
    }

    /// Maps a wire tag back to a kind, or `None` if out of range.
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Cactus),
            1 => Some(Self::Pterodactyl),
            _ => None,
        }
    }
}

/// An obstacle spawned by the server.
///
/// Built from one `OBST` message, handed to the consumer once, and not
/// kept by the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleState {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: ObstacleKind,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Every message the protocol defines, in both directions.
///
/// ```text
/// client → server:  JOIN, READY, STATE
/// server → client:  ASSIGN, COUNT, START, STATE, OBST
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    /// Client → Server: "Give me a player slot." Resent until answered.
    Join,

    /// Client → Server: "I'm ready to start."
    Ready,

    /// Server → Client: "Your slot is `id`."
    Assign { id: PlayerId },

    /// Server → Client: "There are `players` players connected."
    Count { players: u32 },

    /// Server → Client: "Everyone is ready, the game starts now."
    Start,

    /// Either direction: one player's latest state.
    State(PlayerState),

    /// Server → Client: a new obstacle to spawn.
    Obstacle(ObstacleState),
}

impl Message {
    /// The command token that starts this message on the wire.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Join => "JOIN",
            Self::Ready => "READY",
            Self::Assign { .. } => "ASSIGN",
            Self::Count { .. } => "COUNT",
            Self::Start => "START",
            Self::State(_) => "STATE",
            Self::Obstacle(_) => "OBST",
        }
    }
}
