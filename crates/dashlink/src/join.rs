//! Join-retry loop: resend `JOIN` until the server assigns us an id.
//!
//! UDP may lose the request or the answer, so the client keeps asking.
//! The loop ends when the receiver records an assigned id, when the
//! client shuts down, or when an optional attempt limit runs out.

use std::sync::Arc;
use std::time::Duration;

use dashlink_protocol::{Codec, Message};
use dashlink_session::SessionEvent;
use dashlink_transport::DatagramTransport;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::client::ClientInner;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How often `JOIN` is resent.
///
/// The default is a fixed 500 ms cadence with no limit. Setting
/// `multiplier > 1.0` turns it into exponential backoff capped at
/// `max_interval_ms`; `max_attempts` bounds the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay after the first attempt.
    pub initial_interval_ms: u64,
    /// Upper bound on the delay between attempts.
    pub max_interval_ms: u64,
    /// Growth factor per attempt. 1.0 = fixed cadence.
    pub multiplier: f64,
    /// Random extra delay (0–max ms) added to every wait.
    pub max_jitter_ms: u64,
    /// Give up after this many `JOIN`s. `None` = keep trying forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_ms: 500,
            multiplier: 1.0,
            max_jitter_ms: 0,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// A fixed cadence with no limit.
    pub fn fixed(interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            initial_interval_ms: ms,
            max_interval_ms: ms,
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the policy is safe to use.
    ///
    /// Rules:
    /// - `initial_interval_ms` at least 1 (no busy loop).
    /// - `max_interval_ms` at least `initial_interval_ms`.
    /// - `multiplier` finite and at least 1.0.
    pub fn validated(mut self) -> Self {
        if self.initial_interval_ms == 0 {
            warn!("join retry interval of 0 ms, clamping to 1 ms");
            self.initial_interval_ms = 1;
        }
        if self.max_interval_ms < self.initial_interval_ms {
            self.max_interval_ms = self.initial_interval_ms;
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            self.multiplier = 1.0;
        }
        self
    }

    /// The wait after attempt number `attempt` (1-based), jitter excluded.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let ms = self.initial_interval_ms as f64 * self.multiplier.powi(exponent);
        let capped = ms.min(self.max_interval_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// The wait after attempt number `attempt`, with jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=self.max_jitter_ms))
        } else {
            Duration::ZERO
        };
        self.base_delay(attempt) + jitter
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Runs until joined, shut down, or out of attempts.
pub(crate) async fn run_join_loop<T, C>(
    inner: Arc<ClientInner<T, C>>,
    mut shutdown: watch::Receiver<bool>,
    policy: RetryPolicy,
) where
    T: DatagramTransport,
    C: Codec,
{
    let session = &inner.session;
    let server = session.server_addr();

    let join = match inner.codec.encode(&Message::Join) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "cannot encode JOIN, join loop not started");
            return;
        }
    };

    let mut attempt: u32 = 0;
    loop {
        if session.my_id().is_assigned() {
            debug!(my_id = %session.my_id(), attempts = attempt, "joined, join loop done");
            return;
        }
        if *shutdown.borrow() {
            return;
        }
        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            warn!(attempts = attempt, %server, "no id assigned, giving up on JOIN");
            session.emit(SessionEvent::JoinAbandoned {
                attempts: u64::from(attempt),
            });
            return;
        }

        attempt += 1;
        session.stats().record_join_attempt();
        match inner.transport.send_to(&join, server).await {
            Ok(()) => {
                session.stats().record_sent();
                trace!(attempt, %server, "JOIN sent");
            }
            Err(e) if e.is_closed() => return,
            Err(e) => {
                session.stats().record_send_failure();
                debug!(attempt, error = %e, "JOIN not sent");
                session.emit(SessionEvent::SendFailed {
                    command: "JOIN",
                    reason: e.to_string(),
                });
            }
        }

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(policy.delay(attempt)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fixed_500ms_forever() {
        let policy = RetryPolicy::default();
        for attempt in 1..10 {
            assert_eq!(policy.delay(attempt), Duration::from_millis(500));
        }
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            initial_interval_ms: 100,
            max_interval_ms: 1_000,
            multiplier: 2.0,
            ..Default::default()
        }
        .validated();
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(4), Duration::from_millis(800));
        assert_eq!(policy.base_delay(5), Duration::from_millis(1_000));
        assert_eq!(policy.base_delay(500), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy {
            max_jitter_ms: 50,
            ..Default::default()
        };
        for _ in 0..100 {
            let d = policy.delay(1);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(550));
        }
    }

    #[test]
    fn test_validated_fixes_bad_values() {
        let policy = RetryPolicy {
            initial_interval_ms: 0,
            max_interval_ms: 0,
            multiplier: f64::NAN,
            ..Default::default()
        }
        .validated();
        assert_eq!(policy.initial_interval_ms, 1);
        assert_eq!(policy.max_interval_ms, 1);
        assert_eq!(policy.multiplier, 1.0);
    }

    #[test]
    fn test_fixed_constructor() {
        let policy = RetryPolicy::fixed(Duration::from_millis(250));
        assert_eq!(policy.base_delay(3), Duration::from_millis(250));
    }

    #[test]
    fn test_fixed_saturates_huge_interval() {
        let policy = RetryPolicy::fixed(Duration::MAX);
        assert_eq!(policy.initial_interval_ms, u64::MAX);
        assert_eq!(policy.max_interval_ms, u64::MAX);
    }
}
