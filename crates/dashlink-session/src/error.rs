//! Error types for the session layer.

use dashlink_protocol::PlayerId;

/// Reasons an otherwise well-formed inbound message was not applied.
///
/// None of these reach the consumer as errors: the receiver logs them
/// and moves on to the next datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server offered a different id after one was already assigned.
    /// An assigned id never changes for the life of a session.
    #[error("already assigned {current}, ignoring offer of {offered}")]
    AlreadyAssigned { current: PlayerId, offered: PlayerId },

    /// A `STATE` carrying our own id, e.g. the server echoing us back.
    /// The peer snapshot only ever holds the other player.
    #[error("state for own id {0} is not a peer snapshot")]
    OwnState(PlayerId),

    /// A client-to-server command arrived at the client.
    #[error("{0} is not a server-to-client command")]
    UnexpectedInbound(&'static str),
}
