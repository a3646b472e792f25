/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the local socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Setting a socket option (e.g. broadcast) failed.
    #[error("socket option failed: {0}")]
    SocketOption(#[source] std::io::Error),

    /// Sending a datagram failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a datagram failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A non-blocking send could not complete right now.
    #[error("send would block")]
    WouldBlock,

    /// The transport was closed. Pending and future receives end here.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether this error ends the transport's life, as opposed to a
    /// transient fault the caller can ride out.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
