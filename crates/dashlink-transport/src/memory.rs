//! In-process datagram transport over tokio channels.
//!
//! A [`MemoryTransport`] pair behaves like two UDP sockets on a private
//! link: datagrams addressed to the peer (or to a broadcast address) are
//! delivered, anything else vanishes, and a closed or dropped peer just
//! stops answering. Nothing touches the OS network stack, so tests can
//! run under tokio's paused clock.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, Mutex, Notify};

use crate::{DatagramTransport, TransportError};

type Datagram = (SocketAddr, Vec<u8>);

/// One end of an in-memory datagram link. See [`MemoryTransport::pair`].
pub struct MemoryTransport {
    addr: SocketAddr,
    peer_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Datagram>,
    inbound: Mutex<mpsc::UnboundedReceiver<Datagram>>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl MemoryTransport {
    /// Creates two linked endpoints with the given (synthetic) addresses.
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::new(a, b, a_tx, a_rx), Self::new(b, a, b_tx, b_rx))
    }

    fn new(
        addr: SocketAddr,
        peer_addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Datagram>,
        inbound: mpsc::UnboundedReceiver<Datagram>,
    ) -> Self {
        Self {
            addr,
            peer_addr,
            outbound,
            inbound: Mutex::new(inbound),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }

    /// The address of the other end of the link.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn reaches_peer(&self, target: SocketAddr) -> bool {
        if target.port() != self.peer_addr.port() {
            return false;
        }
        if target.ip() == self.peer_addr.ip() {
            return true;
        }
        matches!(target.ip(), IpAddr::V4(ip) if ip.is_broadcast())
    }

    fn deliver(&self, data: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if !self.reaches_peer(target) {
            tracing::trace!(%target, "memory transport: no route, datagram dropped");
            return Ok(());
        }
        // A gone peer is indistinguishable from a lost datagram.
        let _ = self.outbound.send((self.addr, data.to_vec()));
        Ok(())
    }
}

impl DatagramTransport for MemoryTransport {
    async fn send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> Result<(), TransportError> {
        self.deliver(data, target)
    }

    fn try_send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> Result<(), TransportError> {
        self.deliver(data, target)
    }

    async fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> Result<(usize, SocketAddr), TransportError> {
        let closed = self.close_signal.notified();
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut inbound = tokio::select! {
            _ = closed => return Err(TransportError::Closed),
            guard = self.inbound.lock() => guard,
        };

        let closed = self.close_signal.notified();
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let received = tokio::select! {
            _ = closed => return Err(TransportError::Closed),
            received = inbound.recv() => received,
        };

        match received {
            Some((source, data)) => {
                // Same truncation rule as a real datagram socket.
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok((len, source))
            }
            // The peer endpoint was dropped; nothing will ever arrive, so
            // the only way out is our own close().
            None => {
                let closed = self.close_signal.notified();
                if !self.is_closed() {
                    closed.await;
                }
                Err(TransportError::Closed)
            }
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_signal.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.addr)
    }
}
