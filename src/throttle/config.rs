//! # Throttle Rules
//!
//! This module provides the policy type that tells the throttle how much
//! traffic a given operation may admit. Think of it as the "settings panel"
//! for one named operation.
//!
//! ## Key Concepts
//!
//! ### Fixed-Window Parameters
//!
//! ```text
//!     Fixed-Window Rule:
//!
//!     ┌──────────────────────────────┐
//!     │   limit: 10                  │ ← admissions per window
//!     │   window_ms: 60_000          │ ← window length
//!     │                              │
//!     │   |── 60s ──|── 60s ──|      │
//!     │    ≤10 calls  ≤10 calls      │ ← counter resets at each boundary
//!     └──────────────────────────────┘
//! ```
//!
//! The counter resets at regular, non-overlapping boundaries. This is an
//! explicit simplicity/precision trade-off: a burst straddling a boundary can
//! momentarily pass up to 2x the nominal rate, which is acceptable for coarse
//! abuse prevention.

use std::time::Duration;

/// Policy for one throttled operation: how many admissions per fixed window.
///
/// A rule is passed to every [`check`](crate::Throttle::check) call rather
/// than baked into the table, so one shared table can guard many operations
/// with different budgets (a detection endpoint at 10/minute, a purchase
/// endpoint at 5/minute, and so on).
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use throttle::ThrottleRule;
///
/// // 10 admissions per minute
/// let rule = ThrottleRule::per_minute(10);
///
/// // 100 admissions per second
/// let rule = ThrottleRule::per_second(100);
///
/// // Custom window
/// let rule = ThrottleRule::per_window(50, Duration::from_secs(300));
///
/// // Raw constructor (window in milliseconds)
/// let rule = ThrottleRule::new(10, 60_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRule {
    /// Maximum number of admissions inside one window.
    ///
    /// Once `limit` calls have been admitted, every further call in the same
    /// window is rejected without touching the counter.
    pub limit: u32,

    /// Window length in milliseconds.
    ///
    /// Common values:
    /// - 1000 ms (1 second) for per-second limiting
    /// - 60000 ms (1 minute) for per-minute limiting
    pub window_ms: u64,
}

impl Default for ThrottleRule {
    /// Creates a default rule: 10 admissions per minute.
    fn default() -> Self {
        Self {
            limit: 10,
            window_ms: 60_000,
        }
    }
}

impl ThrottleRule {
    /// Creates a new rule with the given limit and window length.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum admissions per window
    /// * `window_ms` - Window length in milliseconds
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::ThrottleRule;
    ///
    /// // 20 admissions per 30 seconds
    /// let rule = ThrottleRule::new(20, 30_000);
    /// ```
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }

    /// Creates a rule admitting `limit` calls per second.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::ThrottleRule;
    ///
    /// let rule = ThrottleRule::per_second(100);
    /// assert_eq!(rule.window_ms, 1000);
    /// ```
    pub fn per_second(limit: u32) -> Self {
        Self {
            limit,
            window_ms: 1000,
        }
    }

    /// Creates a rule admitting `limit` calls per minute.
    ///
    /// Useful for APIs with minute-based quotas.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::ThrottleRule;
    ///
    /// // 10 requests per minute
    /// let rule = ThrottleRule::per_minute(10);
    /// assert_eq!(rule.window_ms, 60_000);
    /// ```
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window_ms: 60_000,
        }
    }

    /// Creates a rule admitting `limit` calls per arbitrary window.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use throttle::ThrottleRule;
    ///
    /// // 1000 requests per hour
    /// let rule = ThrottleRule::per_window(1000, Duration::from_secs(3600));
    /// ```
    pub fn per_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window_ms: window.as_millis() as u64,
        }
    }

    /// Sets the admission limit.
    ///
    /// Builder method for deriving a stricter or looser variant of a rule.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::ThrottleRule;
    ///
    /// let strict = ThrottleRule::per_minute(10).with_limit(3);
    /// assert_eq!(strict.limit, 3);
    /// ```
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the window length in milliseconds.
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Validates the rule for correctness.
    ///
    /// A zero limit or zero-length window is a caller contract violation,
    /// not a runtime condition; [`check`](crate::Throttle::check) asserts
    /// this in debug builds.
    ///
    /// # Errors
    ///
    /// Returns an error message if:
    /// - `limit` is 0
    /// - `window_ms` is 0
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::ThrottleRule;
    ///
    /// let rule = ThrottleRule::new(0, 1000);  // Invalid!
    /// assert!(rule.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.limit == 0 {
            return Err("limit must be greater than 0");
        }

        if self.window_ms == 0 {
            return Err("window_ms must be greater than 0");
        }

        Ok(())
    }

    /// Returns the window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Returns the effective sustained rate in admissions per second.
    ///
    /// Useful for displaying the configured rate to users.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::ThrottleRule;
    ///
    /// let rule = ThrottleRule::per_minute(120);
    /// assert_eq!(rule.effective_rate_per_second(), 2.0);
    /// ```
    pub fn effective_rate_per_second(&self) -> f64 {
        if self.window_ms == 0 {
            0.0
        } else {
            (self.limit as f64 * 1000.0) / self.window_ms as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_validation() {
        let valid = ThrottleRule::default();
        assert!(valid.validate().is_ok());

        let no_limit = ThrottleRule {
            limit: 0,
            ..Default::default()
        };
        assert!(no_limit.validate().is_err());

        let no_window = ThrottleRule {
            window_ms: 0,
            ..Default::default()
        };
        assert!(no_window.validate().is_err());
        assert_eq!(no_window.effective_rate_per_second(), 0.0);
    }

    #[test]
    fn test_rule_constructors() {
        let per_sec = ThrottleRule::per_second(100);
        assert_eq!(per_sec.limit, 100);
        assert_eq!(per_sec.window_ms, 1000);
        assert_eq!(per_sec.effective_rate_per_second(), 100.0);

        let per_min = ThrottleRule::per_minute(10);
        assert_eq!(per_min.limit, 10);
        assert_eq!(per_min.window_ms, 60_000);

        let custom = ThrottleRule::per_window(50, Duration::from_secs(300));
        assert_eq!(custom.window_ms, 300_000);
        assert_eq!(custom.window(), Duration::from_secs(300));
    }

    #[test]
    fn test_rule_builders() {
        let rule = ThrottleRule::per_minute(10)
            .with_limit(5)
            .with_window_ms(30_000);

        assert_eq!(rule.limit, 5);
        assert_eq!(rule.window_ms, 30_000);
    }

    #[test]
    fn test_default_rule() {
        let rule = ThrottleRule::default();
        assert_eq!(rule.limit, 10);
        assert_eq!(rule.window_ms, 60_000);
        assert!(rule.validate().is_ok());
    }
}
