//! Client session state for Dashlink.
//!
//! This crate holds everything the client knows about its game session:
//!
//! 1. **Live record** ([`SharedSession`]): assigned id, player count,
//!    ready/start flags and the latest peer snapshot, written by the
//!    receiver and polled by the consumer without a lock
//! 2. **Lobby flow** ([`SessionPhase`]): `Unjoined → Joined → ReadyWait → InGame`
//! 3. **Frame view** ([`EventQueue`] + [`SessionSnapshot`]): events drained
//!    once per frame into one consistent snapshot
//! 4. **Callbacks** ([`Callbacks`]): obstacle and game-start hooks fired
//!    from the receiver task
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← runs discovery, the receiver and join loops
//!     ↕
//! Session Layer (this crate)  ← what the client knows, no I/O
//!     ↕
//! Protocol Layer (below)  ← provides Message, PlayerState, ObstacleState
//! ```

mod callbacks;
mod error;
mod events;
mod session;
mod shared;
mod stats;

pub use callbacks::Callbacks;
pub use error::SessionError;
pub use events::{EventQueue, SessionEvent, DEFAULT_EVENT_CAPACITY};
pub use session::{SessionPhase, SessionSnapshot};
pub use shared::{Applied, SharedSession};
pub use stats::{SessionStats, StatsSnapshot};
