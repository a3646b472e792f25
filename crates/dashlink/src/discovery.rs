//! Broadcast discovery: find the server before any session exists.
//!
//! The client broadcasts a fixed probe and takes the source address of the
//! first exact acknowledgement as the server. Each attempt is one send
//! followed by one bounded wait; after the last attempt discovery fails
//! with a typed error instead of leaving the client half-built.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use dashlink_protocol::{DISCOVERY_REQUEST, DISCOVERY_RESPONSE};
use dashlink_transport::DatagramTransport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::ClientError;

/// Discovery probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Where the probe is sent. The limited-broadcast address by default.
    pub broadcast_ip: IpAddr,
    /// How many send-and-wait rounds before giving up.
    pub attempts: u32,
    /// How long each round waits for a reply.
    pub attempt_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            broadcast_ip: IpAddr::V4(Ipv4Addr::BROADCAST),
            attempts: 8,
            attempt_timeout_ms: 300,
        }
    }
}

impl DiscoveryConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Whether a datagram is the server's acknowledgement. Surrounding
/// whitespace is tolerated, nothing else.
pub(crate) fn is_discovery_reply(payload: &[u8]) -> bool {
    std::str::from_utf8(payload).is_ok_and(|text| text.trim() == DISCOVERY_RESPONSE)
}

/// Broadcasts the discovery probe and returns the address that answered.
///
/// Blocks its caller for at most `attempts × attempt_timeout`.
///
/// # Errors
/// - [`ClientError::DiscoveryFailed`]: no exact acknowledgement arrived
/// - [`ClientError::Transport`]: the transport was closed mid-discovery
pub async fn discover<T: DatagramTransport>(
    transport: &T,
    port: u16,
    config: &DiscoveryConfig,
) -> Result<SocketAddr, ClientError> {
    let target = SocketAddr::new(config.broadcast_ip, port);
    let wait = config.attempt_timeout();
    let mut buf = [0u8; 256];

    for attempt in 1..=config.attempts {
        if let Err(e) = transport.send_to(DISCOVERY_REQUEST.as_bytes(), target).await {
            if e.is_closed() {
                return Err(e.into());
            }
            debug!(attempt, %target, error = %e, "discovery probe not sent");
            // Still spend the attempt's time so a failing send cannot spin.
            tokio::time::sleep(wait).await;
            continue;
        }

        match tokio::time::timeout(wait, transport.recv_from(&mut buf)).await {
            Ok(Ok((len, source))) => {
                if is_discovery_reply(&buf[..len]) {
                    info!(%source, attempt, "server discovered");
                    return Ok(source);
                }
                debug!(attempt, %source, len, "ignoring non-matching discovery reply");
            }
            Ok(Err(e)) if e.is_closed() => return Err(e.into()),
            Ok(Err(e)) => debug!(attempt, error = %e, "discovery receive failed"),
            Err(_) => trace!(attempt, "discovery attempt timed out"),
        }
    }

    warn!(attempts = config.attempts, port, "no server answered discovery");
    Err(ClientError::DiscoveryFailed {
        attempts: config.attempts,
    })
}
