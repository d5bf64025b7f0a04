//! Per-client request throttling.
//!
//! Fixed window per identity: the first request opens a window, every
//! request inside it counts, and the counter starts over once the window
//! has elapsed. Requests past the ceiling are rejected until then.

use crate::types::ResolveError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default ceiling per window
pub const DEFAULT_MAX_REQUESTS: u32 = 100;
/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct ThrottleCounter {
    count: u32,
    window_start: Instant,
}

/// Remaining allowance after an accepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_after: Duration,
}

#[derive(Debug)]
pub struct ThrottleGate {
    counters: Mutex<HashMap<String, ThrottleCounter>>,
    max_requests: u32,
    window: Duration,
}

impl ThrottleGate {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `identity`.
    ///
    /// # Errors
    /// `ResolveError::RateLimited` once the identity exceeds the ceiling
    /// inside its current window.
    pub fn check(&self, identity: &str) -> Result<Quota, ResolveError> {
        self.check_at(identity, Instant::now())
    }

    pub fn check_at(&self, identity: &str, now: Instant) -> Result<Quota, ResolveError> {
        let mut counters = self.counters.lock();
        let counter = counters
            .entry(identity.to_string())
            .or_insert(ThrottleCounter {
                count: 0,
                window_start: now,
            });

        if now.duration_since(counter.window_start) >= self.window {
            counter.count = 0;
            counter.window_start = now;
        }

        counter.count = counter.count.saturating_add(1);
        let reset_after = self
            .window
            .saturating_sub(now.duration_since(counter.window_start));

        if counter.count > self.max_requests {
            tracing::warn!(
                client = identity,
                count = counter.count,
                "Request ceiling exceeded"
            );
            return Err(ResolveError::RateLimited {
                retry_after_secs: ceil_secs(reset_after),
            });
        }

        Ok(Quota {
            limit: self.max_requests,
            remaining: self.max_requests - counter.count,
            reset_after,
        })
    }

    /// Forget identities whose window has elapsed. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut counters = self.counters.lock();
        let before = counters.len();
        counters.retain(|_, c| now.duration_since(c.window_start) < self.window);
        before - counters.len()
    }

    /// Number of identities currently tracked
    pub fn tracked(&self) -> usize {
        self.counters.lock().len()
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Whole seconds, rounded up so a client never retries too early
pub fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hundred_allowed_then_rejected() {
        let gate = ThrottleGate::default();
        let start = Instant::now();

        for i in 0..100 {
            let at = start + Duration::from_secs(i);
            assert!(gate.check_at("10.0.0.1", at).is_ok(), "request {} rejected", i + 1);
        }

        let err = gate
            .check_at("10.0.0.1", start + Duration::from_secs(100))
            .unwrap_err();
        assert!(matches!(err, ResolveError::RateLimited { retry_after_secs: 800 }));
    }

    #[test]
    fn test_remaining_counts_down() {
        let gate = ThrottleGate::new(3, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(gate.check_at("a", now).unwrap().remaining, 2);
        assert_eq!(gate.check_at("a", now).unwrap().remaining, 1);
        let last = gate.check_at("a", now).unwrap();
        assert_eq!(last.remaining, 0);
        assert_eq!(last.limit, 3);
        assert_eq!(last.reset_after, Duration::from_secs(60));
    }

    #[test]
    fn test_identities_are_independent() {
        let gate = ThrottleGate::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(gate.check_at("a", now).is_ok());
        assert!(gate.check_at("a", now).is_err());
        assert!(gate.check_at("b", now).is_ok());
    }

    #[test]
    fn test_window_rollover_resets_counter() {
        let gate = ThrottleGate::new(2, Duration::from_secs(900));
        let start = Instant::now();
        assert!(gate.check_at("a", start).is_ok());
        assert!(gate.check_at("a", start).is_ok());
        assert!(gate.check_at("a", start + Duration::from_secs(899)).is_err());

        let quota = gate.check_at("a", start + Duration::from_secs(900)).unwrap();
        assert_eq!(quota.remaining, 1);
    }

    #[test]
    fn test_purge_expired() {
        let gate = ThrottleGate::new(5, Duration::from_secs(60));
        let start = Instant::now();
        gate.check_at("old", start).unwrap();
        gate.check_at("new", start + Duration::from_secs(30)).unwrap();

        assert_eq!(gate.purge_expired_at(start + Duration::from_secs(61)), 1);
        assert_eq!(gate.tracked(), 1);
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_secs(5)), 5);
        assert_eq!(ceil_secs(Duration::from_millis(5001)), 6);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
