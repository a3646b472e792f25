//! Counters for what the background tasks did.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by the receiver, the join loop and senders.
#[derive(Debug, Default)]
pub struct SessionStats {
    received: AtomicU64,
    dropped: AtomicU64,
    sent: AtomicU64,
    send_failures: AtomicU64,
    join_attempts: AtomicU64,
    events_overflowed: AtomicU64,
}

/// A point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams that decoded into a message.
    pub received: u64,
    /// Datagrams dropped as malformed or not applicable.
    pub dropped: u64,
    /// Datagrams handed to the transport.
    pub sent: u64,
    /// Sends the transport refused.
    pub send_failures: u64,
    /// `JOIN` requests sent.
    pub join_attempts: u64,
    /// Events discarded because the consumer's queue was full.
    pub events_overflowed: u64,
}

impl SessionStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one `JOIN` and returns how many have been sent so far.
    pub fn record_join_attempt(&self) -> u64 {
        self.join_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_event_overflow(&self) {
        self.events_overflowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            join_attempts: self.join_attempts.load(Ordering::Relaxed),
            events_overflowed: self.events_overflowed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = SessionStats::default();
        stats.record_received();
        stats.record_received();
        stats.record_dropped();
        assert_eq!(stats.record_join_attempt(), 1);
        assert_eq!(stats.record_join_attempt(), 2);

        let snap = stats.snapshot();
        assert_eq!(snap.received, 2);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.join_attempts, 2);
        assert_eq!(snap.send_failures, 0);
    }
}
