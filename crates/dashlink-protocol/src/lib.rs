//! Wire protocol for Dashlink.
//!
//! This crate defines the "language" that the client and the server speak:
//!
//! - **Types** ([`Message`], [`PlayerState`], [`ObstacleState`], ...):
//!   the values that travel in datagrams.
//! - **Codec** ([`Codec`] trait, [`TextCodec`]): how those values are
//!   turned into `COMMAND;key=value` text and back.
//! - **Errors** ([`ProtocolError`]): why a datagram was rejected.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw datagrams) and session
//! (what the client knows about the game). It does no I/O.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Session (shared state)
//! ```

mod codec;
mod error;
mod types;
mod wire;

pub use codec::{Codec, TextCodec};
pub use error::ProtocolError;
pub use types::{Message, ObstacleKind, ObstacleState, PlayerId, PlayerState};

/// The UDP port the game server listens on.
pub const DEFAULT_PORT: u16 = 4321;

/// Payload a client broadcasts to find a server on the local network.
pub const DISCOVERY_REQUEST: &str = "BUSCAR_SERVIDOR";

/// The only payload accepted as a reply to [`DISCOVERY_REQUEST`].
pub const DISCOVERY_RESPONSE: &str = "SERVIDOR_AQUI";
