//! Receiver loop: the one task that reads the socket.
//!
//! The flow per datagram is:
//!   1. Receive (bounded by the receive timeout, so shutdown is noticed)
//!   2. Drop anything not from the server's host
//!   3. Decode → apply to the session → fire the matching callback
//!
//! Nothing here ever fails outward. Timeouts and transient faults loop
//! again; only a closed transport or the shutdown signal ends the task.

use std::sync::Arc;
use std::time::Duration;

use dashlink_protocol::Codec;
use dashlink_session::SessionEvent;
use dashlink_transport::{DatagramTransport, MAX_DATAGRAM_SIZE};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::client::ClientInner;
use crate::discovery::is_discovery_reply;

/// Runs until the transport closes or shutdown is signalled.
pub(crate) async fn run_receiver<T, C>(
    inner: Arc<ClientInner<T, C>>,
    mut shutdown: watch::Receiver<bool>,
    recv_timeout: Duration,
) where
    T: DatagramTransport,
    C: Codec,
{
    let server = inner.session.server_addr();
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    debug!(%server, "receiver started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let received = tokio::select! {
            _ = shutdown.changed() => break,
            received = tokio::time::timeout(recv_timeout, inner.transport.recv_from(&mut buf)) => received,
        };

        let (len, source) = match received {
            Err(_elapsed) => continue,
            Ok(Ok(datagram)) => datagram,
            Ok(Err(e)) if e.is_closed() => break,
            Ok(Err(e)) => {
                debug!(error = %e, "receive fault ignored");
                continue;
            }
        };

        if source.ip() != server.ip() {
            trace!(%source, "ignoring datagram from a host other than the server");
            continue;
        }

        handle_datagram(&inner, &buf[..len]);
    }

    debug!("receiver stopped");
}

/// Decodes and applies one datagram from the server.
pub(crate) fn handle_datagram<T, C>(inner: &ClientInner<T, C>, payload: &[u8])
where
    T: DatagramTransport,
    C: Codec,
{
    let session = &inner.session;

    // Late answers to our own discovery broadcast are expected noise.
    if is_discovery_reply(payload) {
        trace!("ignoring repeated discovery reply");
        return;
    }

    let message = match inner.codec.decode(payload) {
        Ok(message) => message,
        Err(e) => {
            session.stats().record_dropped();
            debug!(error = %e, len = payload.len(), "dropping malformed datagram");
            session.emit(SessionEvent::MessageDropped(e));
            return;
        }
    };

    session.stats().record_received();
    trace!(command = message.command(), "message received");

    match session.apply(message) {
        Ok(applied) => inner.callbacks.dispatch(&applied),
        Err(e) => {
            session.stats().record_dropped();
            debug!(error = %e, "inbound message not applied");
        }
    }
}
