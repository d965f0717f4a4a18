//! # Inactivity Timer
//!
//! Tracks operator activity so the register can sign the cashier out and
//! clear the cart after a quiet period. The caller supplies the clock, so
//! the timer itself never reads time.
//!
//! ```text
//!   touch(t0) ─────────── deadline = t0 + timeout ──────────► expired
//!        ▲                                   │
//!        └───── any operator command ────────┘ (pushes deadline back)
//! ```

use std::time::{Duration, Instant};

use crate::SESSION_TIMEOUT_SECS;

/// Deadline tracker for one signed-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityTimer {
    timeout: Duration,
    last_activity: Instant,
}

impl InactivityTimer {
    /// Starts a timer with the given timeout at `now`.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        InactivityTimer {
            timeout,
            last_activity: now,
        }
    }

    /// Starts a timer with the standard ten minute timeout.
    pub fn with_default_timeout(now: Instant) -> Self {
        Self::new(Duration::from_secs(SESSION_TIMEOUT_SECS), now)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records activity at `now`.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// When the session expires if nothing else happens.
    pub fn deadline(&self) -> Instant {
        self.last_activity + self.timeout
    }

    /// Whether the timeout has elapsed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }
}
