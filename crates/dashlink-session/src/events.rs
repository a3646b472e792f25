//! The per-frame event queue.
//!
//! Background tasks push [`SessionEvent`]s; the consumer drains them once
//! per frame. Folding the drained events into a
//! [`SessionSnapshot`](crate::SessionSnapshot) gives one view of the
//! session that does not change halfway through a frame.

use dashlink_protocol::{ObstacleState, PlayerId, PlayerState, ProtocolError};
use tokio::sync::mpsc;

/// Default number of undrained events kept before new ones are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Something that happened to the session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The server assigned our player id.
    Assigned(PlayerId),
    /// The server reported how many players are connected.
    PlayerCount(u32),
    /// The server started the game.
    GameStarted,
    /// A new snapshot of the other player.
    PeerState(PlayerState),
    /// The server spawned an obstacle.
    Obstacle(ObstacleState),
    /// We told the server we are ready.
    ReadySent,
    /// The consumer left the game locally (e.g. back to the menu).
    LocalReset,
    /// An inbound datagram was dropped as malformed.
    MessageDropped(ProtocolError),
    /// An outbound datagram could not be handed to the transport.
    SendFailed {
        command: &'static str,
        reason: String,
    },
    /// The join loop hit its attempt limit without being assigned an id.
    JoinAbandoned { attempts: u64 },
}

/// Consumer side of the event queue.
pub struct EventQueue {
    receiver: mpsc::Receiver<SessionEvent>,
}

impl EventQueue {
    pub(crate) fn channel(capacity: usize) -> (mpsc::Sender<SessionEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self { receiver })
    }

    /// Takes every event queued so far without waiting.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Waits for the next event. Returns `None` once the session is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_events_in_order() {
        let (tx, mut queue) = EventQueue::channel(8);
        tx.try_send(SessionEvent::Assigned(PlayerId(1))).unwrap();
        tx.try_send(SessionEvent::PlayerCount(2)).unwrap();

        assert_eq!(
            queue.drain(),
            vec![
                SessionEvent::Assigned(PlayerId(1)),
                SessionEvent::PlayerCount(2)
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_capacity_is_never_zero() {
        let (tx, _queue) = EventQueue::channel(0);
        assert!(tx.try_send(SessionEvent::GameStarted).is_ok());
    }
}
