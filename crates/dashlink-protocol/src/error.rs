//! Error types for the protocol layer.
//!
//! Each crate in Dashlink defines its own error enum. A `ProtocolError`
//! always means "this datagram is not a valid message" or "this message
//! cannot be put on the wire", never a network problem.

/// Errors that can occur while encoding or decoding a wire message.
///
/// On the receive side every variant leads to the same outcome: the
/// whole datagram is dropped. The variants exist so the drop can be
/// logged and counted with a useful reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The datagram was empty (or only whitespace).
    #[error("empty message")]
    Empty,

    /// The datagram is not valid UTF-8 text.
    #[error("message is not valid UTF-8")]
    NotUtf8,

    /// The command token is not one this protocol defines.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A key the command requires is absent.
    ///
    /// `&'static str` works here because both the command and key names
    /// come from our own tables, never from the network.
    #[error("{command}: missing field {key:?}")]
    MissingField {
        command: &'static str,
        key: &'static str,
    },

    /// A required key is present but its value does not parse as the
    /// expected type, or is outside the allowed range.
    #[error("{command}: invalid value {value:?} for field {key:?}")]
    InvalidField {
        command: &'static str,
        key: &'static str,
        value: String,
    },

    /// The encoded message would not fit in one datagram.
    #[error("encoded message is {len} bytes, limit is {max}")]
    TooLarge { len: usize, max: usize },
}
