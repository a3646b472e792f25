//! # Dashlink
//!
//! LAN multiplayer client for a two-player runner game.
//!
//! Dashlink finds a server by UDP broadcast (or uses a fixed address),
//! asks for a player slot until one is assigned, and then replicates
//! player and obstacle state best-effort. Nothing is retransmitted or
//! ordered: the latest datagram wins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashlink::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let mut client = GameClient::builder().connect().await?;
//! client.on_obstacle(|o| println!("obstacle at {}", o.x));
//!
//! // Once per frame:
//! let frame = client.poll_frame();
//! if frame.snapshot.my_id.is_assigned() {
//!     client.send(&PlayerState::new(frame.snapshot.my_id, 10.0, 0.0, false))?;
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod discovery;
mod error;
mod join;
mod receiver;

pub use client::{FrameUpdate, GameClient, GameClientBuilder};
pub use config::{ClientConfig, ServerLocator};
pub use discovery::{discover, DiscoveryConfig};
pub use error::ClientError;
pub use join::RetryPolicy;

/// Convenience re-exports: `use dashlink::prelude::*` brings in everything
/// a frame loop needs.
pub mod prelude {
    pub use crate::{
        discover, ClientConfig, ClientError, DiscoveryConfig, FrameUpdate, GameClient,
        GameClientBuilder, RetryPolicy, ServerLocator,
    };
    pub use dashlink_protocol::{
        Codec, Message, ObstacleKind, ObstacleState, PlayerId, PlayerState, TextCodec,
        DEFAULT_PORT,
    };
    pub use dashlink_session::{SessionEvent, SessionPhase, SessionSnapshot, StatsSnapshot};
    pub use dashlink_transport::{DatagramTransport, MemoryTransport, TransportError, UdpTransport};
}
