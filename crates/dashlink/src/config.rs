//! Client configuration.
//!
//! Every field has a default matching the reference LAN setup (port
//! 4321, broadcast discovery, 500 ms join cadence), so a config file only
//! needs the fields it changes:
//!
//! ```json
//! { "locator": { "mode": "fixed", "host": "192.168.1.20:4321" } }
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use dashlink_protocol::DEFAULT_PORT;
use dashlink_session::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::{ClientError, DiscoveryConfig, RetryPolicy};

/// How the client finds its server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ServerLocator {
    /// Broadcast a probe on the local network and take whoever answers.
    #[default]
    Broadcast,
    /// A known server: `"host:port"`, `"host"` (uses the configured port),
    /// or an IP literal.
    Fixed { host: String },
}

/// Full configuration for a [`GameClient`](crate::GameClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server port, for discovery and for a fixed host without a port.
    pub port: u16,
    /// Local address to bind. `0.0.0.0:0` lets the OS choose.
    pub bind_addr: String,
    /// Broadcast discovery or a fixed server.
    pub locator: ServerLocator,
    /// Discovery probe settings. Unused with a fixed server.
    pub discovery: DiscoveryConfig,
    /// How long one receive waits before the receiver loops again.
    pub recv_timeout_ms: u64,
    /// Cadence (and optional limit) of `JOIN` resends.
    pub join_retry: RetryPolicy,
    /// Undrained events kept for [`poll_frame`](crate::GameClient::poll_frame).
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: "0.0.0.0:0".to_string(),
            locator: ServerLocator::default(),
            discovery: DiscoveryConfig::default(),
            recv_timeout_ms: 300,
            join_retry: RetryPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON configuration document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let text = std::fs::read_to_string(path).map_err(ClientError::ConfigIo)?;
        Self::from_json_str(&text)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms.max(1))
    }
}

/// Resolves a fixed server description to one socket address.
pub(crate) async fn resolve_fixed(host: &str, default_port: u16) -> Result<SocketAddr, ClientError> {
    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    let lookup = if has_port {
        tokio::net::lookup_host(host.to_string()).await
    } else {
        tokio::net::lookup_host(format!("{host}:{default_port}")).await
    };

    let resolve_err = |reason: String| ClientError::Resolve {
        host: host.to_string(),
        reason,
    };
    let all: Vec<SocketAddr> = lookup.map_err(|e| resolve_err(e.to_string()))?.collect();
    // The transport binds IPv4 by default; prefer a matching address.
    all.iter()
        .find(|a| a.is_ipv4())
        .or_else(|| all.first())
        .copied()
        .ok_or_else(|| resolve_err("no addresses found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.port, 4321);
        assert_eq!(cfg.locator, ServerLocator::Broadcast);
        assert_eq!(cfg.discovery.attempts, 8);
        assert_eq!(cfg.join_retry.initial_interval_ms, 500);
        assert_eq!(cfg.join_retry.max_attempts, None);
        assert_eq!(cfg.recv_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let cfg = ClientConfig::from_json_str(
            r#"{ "locator": { "mode": "fixed", "host": "10.0.0.5:4321" }, "recv_timeout_ms": 100 }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.locator,
            ServerLocator::Fixed {
                host: "10.0.0.5:4321".into()
            }
        );
        assert_eq!(cfg.recv_timeout_ms, 100);
        assert_eq!(cfg.port, 4321);
        assert_eq!(cfg.discovery.attempts, 8);
    }

    #[test]
    fn test_empty_json_is_default() {
        let cfg = ClientConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.locator, ServerLocator::Broadcast);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = ClientConfig::from_json_str("{ port: }").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ClientConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ClientError::ConfigIo(_)));
    }

    #[tokio::test]
    async fn test_resolve_socket_addr_literal() {
        let addr = resolve_fixed("192.168.1.20:5000", 4321).await.unwrap();
        assert_eq!(addr, "192.168.1.20:5000".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_ip_uses_default_port() {
        let addr = resolve_fixed("10.1.2.3", 4321).await.unwrap();
        assert_eq!(addr, "10.1.2.3:4321".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_localhost_name() {
        let addr = resolve_fixed("localhost", 4321).await.unwrap();
        assert_eq!(addr.port(), 4321);
        assert!(addr.ip().is_loopback());
    }
}
