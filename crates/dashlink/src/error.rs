//! Unified error type for the Dashlink client.

use dashlink_protocol::ProtocolError;
use dashlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Only a handful of these ever reach the consumer: construction
/// failures (no server found, bad config, bind error) and the optional
/// results of `send`/`send_ready`. Faults inside the background tasks
/// are logged and queued as events instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Nobody answered the discovery broadcast. The presentation layer
    /// should show a "server not found" state.
    #[error("no server answered discovery after {attempts} attempts")]
    DiscoveryFailed { attempts: u32 },

    /// A fixed server address could not be resolved.
    #[error("cannot resolve server address {host:?}: {reason}")]
    Resolve { host: String, reason: String },

    /// The configuration document is malformed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    ConfigIo(#[source] std::io::Error),

    /// A transport-level error (bind, send, closed).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (message cannot be encoded).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Whether this is the "no server found" outcome of discovery.
    pub fn is_discovery_failure(&self) -> bool {
        matches!(self, Self::DiscoveryFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: ClientError = TransportError::Closed.into();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.to_string(), "transport closed");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ClientError = ProtocolError::Empty.into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_discovery_failure_is_recognizable() {
        let err = ClientError::DiscoveryFailed { attempts: 8 };
        assert!(err.is_discovery_failure());
        assert_eq!(
            err.to_string(),
            "no server answered discovery after 8 attempts"
        );
    }
}
