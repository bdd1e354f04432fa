//! # Core Window Accounting
//!
//! This module implements the heart of the throttle: fixed-window admission
//! accounting for a single key. The state per key is deliberately tiny (an
//! integer counter and an absolute expiry timestamp), so the whole table
//! stays cheap even with thousands of live keys.
//!
//! ## The Fixed-Window Algorithm
//!
//! ```text
//!     How a window evolves (limit = 3, window = 60s):
//!
//!     t=0s    check ──► no entry      ──► open  {count: 1, reset_at: 60s}  ✅ remaining 2
//!     t=10s   check ──► count 1 < 3   ──► admit {count: 2}                 ✅ remaining 1
//!     t=20s   check ──► count 2 < 3   ──► admit {count: 3}                 ✅ remaining 0
//!     t=30s   check ──► count 3 >= 3  ──► reject (count unchanged)         ⛔ retry at 60s
//!     t=61s   check ──► expired       ──► open  {count: 1, reset_at: 121s} ✅ remaining 2
//! ```
//!
//! Rejected calls never touch the counter, so the count can never exceed the
//! limit while a window is live. Expiry is strict (`reset_at < now`): the
//! boundary instant itself still belongs to the old window.
//!
//! ## Trade-Off
//!
//! Fixed windows are simpler and cheaper than sliding windows or token
//! buckets, at the cost of boundary bursts: a caller can spend one window's
//! budget just before the boundary and the next window's budget just after,
//! momentarily passing 2x the nominal rate. That is acceptable for coarse
//! abuse prevention, which is what this throttle is for.

use super::config::ThrottleRule;
use super::utils::current_time_ms;
use std::time::Duration;

/// Outcome of a single admission check.
///
/// Besides the admit/deny bit, the decision carries the diagnostic fields a
/// caller needs to build a useful "too many requests" response: how much
/// budget is left and when the window resets.
///
/// ## HTTP Mapping
///
/// The throttle has no wire format of its own; the conventional mapping at
/// an HTTP boundary is:
///
/// ```text
///     admitted == true  ──► proceed with normal processing
///     admitted == false ──► 429 Too Many Requests, no side effects,
///                           Retry-After from retry_after()
/// ```
///
/// # Example
///
/// ```rust
/// use throttle::{Throttle, ThrottleRule};
///
/// let throttle = Throttle::new();
/// let decision = throttle.check("ai-detect:1.2.3.4", ThrottleRule::per_minute(10));
///
/// if decision.admitted {
///     println!("{} calls left this window", decision.remaining);
/// } else {
///     println!("throttled, retry in {:?}", decision.retry_after());
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the call may proceed.
    pub admitted: bool,

    /// Admissions left in the current window after this decision.
    ///
    /// Always 0 for rejected calls.
    pub remaining: u32,

    /// Absolute timestamp (milliseconds since epoch) at which the current
    /// window ends and the counter resets.
    pub reset_at_ms: u64,
}

impl Decision {
    /// Milliseconds until the window resets, saturating at 0.
    ///
    /// Suitable for a `Retry-After`-style hint on rejected calls.
    #[inline]
    pub fn retry_after_ms(&self) -> u64 {
        self.reset_at_ms.saturating_sub(current_time_ms())
    }

    /// Time until the window resets, saturating at zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{Throttle, ThrottleRule};
    ///
    /// let throttle = Throttle::new();
    /// let decision = throttle.check("demo", ThrottleRule::per_minute(10));
    /// assert!(decision.retry_after() <= std::time::Duration::from_secs(60));
    /// ```
    #[inline]
    pub fn retry_after(&self) -> Duration {
        Duration::from_millis(self.retry_after_ms())
    }
}

/// Per-key window state: how many calls this window has admitted and when
/// the window ends.
///
/// Entries live in the throttle table and are mutated in place under the
/// table's entry lock; the type itself has no interior synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowEntry {
    /// Admissions observed in the current window. Starts at 1 because a
    /// window is only ever opened by an admitted call.
    pub(crate) count: u32,

    /// Absolute end of the current window in epoch milliseconds.
    pub(crate) reset_at_ms: u64,
}

impl WindowEntry {
    /// Opens a fresh window at `now_ms`, accounting for the call that
    /// triggered it.
    #[inline]
    pub(crate) fn open(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(window_ms),
        }
    }

    /// Returns true once the window has fully elapsed.
    ///
    /// Strict comparison: at `now == reset_at` the window is still live.
    #[inline]
    pub(crate) fn is_expired(&self, now_ms: u64) -> bool {
        self.reset_at_ms < now_ms
    }

    /// Read-modify-write for a call landing inside a live window.
    ///
    /// Admits and increments while `count < limit`; once the limit is
    /// reached, rejects without incrementing and reports the unchanged
    /// `reset_at` so the caller knows when to retry.
    #[inline]
    pub(crate) fn observe(&mut self, limit: u32) -> Decision {
        if self.count >= limit {
            return Decision {
                admitted: false,
                remaining: 0,
                reset_at_ms: self.reset_at_ms,
            };
        }

        self.count += 1;
        Decision {
            admitted: true,
            remaining: limit - self.count,
            reset_at_ms: self.reset_at_ms,
        }
    }

    /// Decision for the call that opened this window.
    #[inline]
    pub(crate) fn opening_decision(&self, rule: ThrottleRule) -> Decision {
        Decision {
            admitted: true,
            remaining: rule.limit.saturating_sub(1),
            reset_at_ms: self.reset_at_ms,
        }
    }
}
