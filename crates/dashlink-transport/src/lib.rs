//! Transport abstraction layer for Dashlink.
//!
//! Provides the [`DatagramTransport`] trait: one unreliable, connectionless
//! socket that can send (to any address, including broadcast), receive with
//! the source address, and be closed from another task.
//!
//! # Feature Flags
//!
//! - `udp` (default): real UDP sockets via `tokio::net::UdpSocket`
//! - `memory` (default): in-process loopback pairs over tokio channels

mod error;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "udp")]
mod udp;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::MemoryTransport;
#[cfg(feature = "udp")]
pub use udp::UdpTransport;

use std::future::Future;
use std::net::SocketAddr;

/// Size of the receive buffer. Every encoded message must fit in one
/// datagram of this size.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// A single unreliable datagram endpoint.
///
/// Delivery and ordering are not guaranteed. Implementations must allow
/// one task to be parked in [`recv_from`](Self::recv_from) while other
/// tasks send through the same endpoint, without an external lock.
pub trait DatagramTransport: Send + Sync + 'static {
    /// Sends one datagram to `target`.
    fn send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends one datagram without waiting.
    ///
    /// This is what a frame-driven caller uses: it never suspends, and a
    /// full socket buffer shows up as [`TransportError::WouldBlock`].
    fn try_send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> Result<(), TransportError>;

    /// Receives the next datagram into `buf`, returning its length and
    /// source address.
    ///
    /// Resolves to [`TransportError::Closed`] once [`close`](Self::close)
    /// has been called, including when the call was already pending.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, SocketAddr), TransportError>> + Send;

    /// Closes the endpoint and wakes any pending receive.
    fn close(&self);

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;

    /// The local address this endpoint is bound to.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}
