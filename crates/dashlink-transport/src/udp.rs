//! UDP transport implementation using `tokio::net::UdpSocket`.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::UdpSocket;
use tokio::sync::Notify;

use crate::{DatagramTransport, TransportError};

/// A UDP-backed [`DatagramTransport`] with broadcast enabled.
///
/// The socket is shared between the receiving task and senders; tokio's
/// `UdpSocket` supports concurrent `send_to`/`recv_from` through `&self`,
/// so no lock is held around either direction.
///
/// The synchronous path writes through a second handle to the same
/// socket. Tokio's own `try_send_to` only succeeds once the reactor has
/// seen the socket become writable, which a socket that only ever sent
/// from the frame thread never is.
pub struct UdpTransport {
    socket: UdpSocket,
    sync_sender: std::net::UdpSocket,
    closed: AtomicBool,
    close_signal: Notify,
}

impl UdpTransport {
    /// Binds a new UDP endpoint to `addr` and enables broadcast.
    ///
    /// Use `"0.0.0.0:0"` to let the OS pick the port.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).await.map_err(TransportError::Bind)?;
        socket
            .set_broadcast(true)
            .map_err(TransportError::SocketOption)?;

        // Both handles share one non-blocking file description.
        let std_socket = socket.into_std().map_err(TransportError::Bind)?;
        let sync_sender = std_socket.try_clone().map_err(TransportError::Bind)?;
        let socket = UdpSocket::from_std(std_socket).map_err(TransportError::Bind)?;

        let local = socket.local_addr().map_err(TransportError::Bind)?;
        tracing::debug!(%local, "UDP transport bound");

        Ok(Self {
            socket,
            sync_sender,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        })
    }
}

impl DatagramTransport for UdpTransport {
    async fn send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.socket
            .send_to(data, target)
            .await
            .map(|_| ())
            .map_err(TransportError::SendFailed)
    }

    fn try_send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        match self.sync_sender.send_to(data, target) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Err(TransportError::WouldBlock)
            }
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    async fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> Result<(usize, SocketAddr), TransportError> {
        // Register for the close notification before checking the flag so
        // a close() racing with this call cannot be missed.
        let closed = self.close_signal.notified();
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        tokio::select! {
            _ = closed => Err(TransportError::Closed),
            result = self.socket.recv_from(buf) => {
                result.map_err(TransportError::ReceiveFailed)
            }
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("UDP transport closed");
        }
        self.close_signal.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::Bind)
    }
}
