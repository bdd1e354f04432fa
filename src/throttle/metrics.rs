//! This module provides monitoring and health analysis for the throttle.
//! It helps you understand how much traffic is being turned away and
//! whether the table is nearing its capacity bound.
//!
//! ## Metrics Overview
//!
//! ```text
//!     Metrics Dashboard:
//!     ┌─────────────────────────────────────┐
//!     │  Admit Rate: 92%                    │
//!     │  ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓░  (92/100)     │
//!     │                                     │
//!     │  Tracked Keys: 1,204 / 10,000       │
//!     │  ▓▓░░░░░░░░░░░░░░░░░░  (12%)        │
//!     │                                     │
//!     │  Health: ✅ Healthy                 │
//!     │  Windows Opened: 3,511              │
//!     │  Swept: 2,307                       │
//!     └─────────────────────────────────────┘
//! ```

use std::fmt;

/// Snapshot of the throttle's counters and table occupancy.
///
/// Counters are cumulative since construction; the snapshot is taken with
/// relaxed atomics, so fields may be a few operations apart under load.
/// Fine for monitoring, not a transactional view.
///
/// ## Key Metrics Explained
///
/// ### Admission Metrics
/// - **total_admitted**: calls allowed to proceed
/// - **total_rejected**: calls turned away (over-limit or table full)
/// - **admit_rate**: fraction of calls admitted
///
/// ### Table Metrics
/// - **windows_opened**: fresh windows started (new keys plus rollovers)
/// - **total_swept**: expired windows removed
/// - **active_keys / max_keys**: current and maximum table occupancy
///
/// ## Example Usage
///
/// ```rust
/// use throttle::{Throttle, ThrottleRule};
///
/// let throttle = Throttle::new();
/// // ... route traffic through it ...
///
/// let metrics = throttle.metrics();
///
/// if metrics.health_status().is_unhealthy() {
///     println!("⚠️ heavy rejection: {:.1}%", metrics.rejection_rate() * 100.0);
/// }
///
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone)]
pub struct ThrottleMetrics {
    /// Total number of calls admitted.
    pub total_admitted: u64,

    /// Total number of calls rejected.
    /// Includes both over-limit rejections and new keys turned away by a
    /// full table.
    pub total_rejected: u64,

    /// Total number of windows opened (first call for a key, and every
    /// rollover of an expired window).
    pub windows_opened: u64,

    /// Total number of expired windows removed by sweeps and clears.
    pub total_swept: u64,

    /// Number of keys currently tracked.
    pub active_keys: usize,

    /// Maximum number of keys the table will track.
    pub max_keys: usize,
}

impl ThrottleMetrics {
    /// Calculates the fraction of calls admitted.
    ///
    /// # Returns
    ///
    /// A value between 0.0 and 1.0; 1.0 when no calls have been seen yet.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::Throttle;
    ///
    /// let throttle = Throttle::new();
    /// assert_eq!(throttle.metrics().admit_rate(), 1.0);
    /// ```
    #[inline]
    pub fn admit_rate(&self) -> f64 {
        let total = self.total_admitted + self.total_rejected;
        if total == 0 {
            1.0 // No calls yet, assume healthy
        } else {
            self.total_admitted as f64 / total as f64
        }
    }

    /// Calculates the rejection rate (inverse of the admit rate).
    #[inline]
    pub fn rejection_rate(&self) -> f64 {
        1.0 - self.admit_rate()
    }

    /// Returns the total number of calls observed (admitted + rejected).
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_admitted + self.total_rejected
    }

    /// Fraction of the key capacity currently in use (0.0 to 1.0).
    #[inline]
    pub fn capacity_used(&self) -> f64 {
        if self.max_keys == 0 {
            0.0
        } else {
            self.active_keys as f64 / self.max_keys as f64
        }
    }

    /// Checks if the table is approaching its key capacity.
    ///
    /// Returns `true` when more than 80% of the capacity is in use, which
    /// usually means a key flood (many distinct callers or fabricated
    /// addresses) rather than organic traffic.
    pub fn is_near_capacity(&self) -> bool {
        self.capacity_used() > 0.8
    }

    /// Determines the health status of the throttle.
    ///
    /// - **Healthy**: normal operation
    /// - **Degraded**: noticeable rejection (>30%) or table near capacity
    /// - **Critical**: most traffic rejected (>60%) or table effectively full
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{HealthStatus, Throttle};
    ///
    /// let throttle = Throttle::new();
    /// assert_eq!(throttle.metrics().health_status(), HealthStatus::Healthy);
    /// ```
    pub fn health_status(&self) -> HealthStatus {
        let rejection = self.rejection_rate();

        if rejection > 0.6 || self.capacity_used() > 0.95 {
            HealthStatus::Critical
        } else if rejection > 0.3 || self.is_near_capacity() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Generates a human-readable summary of the metrics.
    ///
    /// # Example Output
    ///
    /// ```text
    /// Throttle Metrics:
    /// ├─ Admission:
    /// │  ├─ Admit Rate: 92.00%
    /// │  ├─ Rejection Rate: 8.00%
    /// │  └─ Total Requests: 4250
    /// ├─ Table:
    /// │  ├─ Tracked Keys: 1204/10000
    /// │  ├─ Capacity Used: 12.04%
    /// │  ├─ Windows Opened: 3511
    /// │  └─ Swept: 2307
    /// └─ Health:
    ///    ├─ Status: Healthy
    ///    └─ Near Capacity: false
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "Throttle Metrics:\n\
             ├─ Admission:\n\
             │  ├─ Admit Rate: {:.2}%\n\
             │  ├─ Rejection Rate: {:.2}%\n\
             │  ├─ Total Admitted: {}\n\
             │  ├─ Total Rejected: {}\n\
             │  └─ Total Requests: {}\n\
             ├─ Table:\n\
             │  ├─ Tracked Keys: {}/{}\n\
             │  ├─ Capacity Used: {:.2}%\n\
             │  ├─ Windows Opened: {}\n\
             │  └─ Swept: {}\n\
             └─ Health:\n\
                ├─ Status: {:?}\n\
                └─ Near Capacity: {}",
            self.admit_rate() * 100.0,
            self.rejection_rate() * 100.0,
            self.total_admitted,
            self.total_rejected,
            self.total_requests(),
            self.active_keys,
            self.max_keys,
            self.capacity_used() * 100.0,
            self.windows_opened,
            self.total_swept,
            self.health_status(),
            self.is_near_capacity()
        )
    }
}

impl fmt::Display for ThrottleMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Health status indicator for the throttle.
///
/// Provides a simple three-level assessment, making it easy to trigger
/// alerts or take action based on status.
///
/// ## Status Levels
///
/// ```text
///     Healthy ──────► Normal operation, little rejection
///        │
///     Degraded ─────► Heavy rejection or table filling up
///        │
///     Critical ─────► Most traffic rejected or table full
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Operating normally; rejections are the exception.
    Healthy,

    /// A meaningful share of traffic is being rejected, or the key table
    /// is nearing its bound. Usually a traffic spike or an abuse attempt
    /// being absorbed as intended; worth watching.
    Degraded,

    /// Most traffic is being rejected or the table is effectively full.
    /// Either an attack is in progress or the configured budgets no longer
    /// match legitimate demand.
    Critical,
}

impl HealthStatus {
    /// Returns true if the status indicates any problems.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::HealthStatus;
    ///
    /// assert!(!HealthStatus::Healthy.is_unhealthy());
    /// assert!(HealthStatus::Critical.is_unhealthy());
    /// ```
    pub fn is_unhealthy(&self) -> bool {
        !matches!(self, Self::Healthy)
    }

    /// Returns a suggested action based on the health status.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::Throttle;
    ///
    /// let health = Throttle::new().metrics().health_status();
    /// println!("Recommendation: {}", health.suggested_action());
    /// ```
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::Healthy => "No action needed",
            Self::Degraded => "Monitor closely, review per-operation budgets",
            Self::Critical => "Investigate traffic source; raise budgets only if demand is legitimate",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "✅ Healthy"),
            Self::Degraded => write!(f, "⚠️ Degraded"),
            Self::Critical => write!(f, "🔴 Critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(admitted: u64, rejected: u64, active: usize) -> ThrottleMetrics {
        ThrottleMetrics {
            total_admitted: admitted,
            total_rejected: rejected,
            windows_opened: 0,
            total_swept: 0,
            active_keys: active,
            max_keys: 10_000,
        }
    }

    #[test]
    fn test_metrics_calculations() {
        let m = metrics(80, 20, 1_000);

        assert_eq!(m.admit_rate(), 0.8);
        assert!((m.rejection_rate() - 0.2).abs() < 1e-9);
        assert_eq!(m.total_requests(), 100);
        assert_eq!(m.capacity_used(), 0.1);
        assert!(!m.is_near_capacity());
        assert_eq!(m.health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_degraded_on_rejection() {
        let m = metrics(60, 40, 100);

        assert!(m.rejection_rate() > 0.3);
        assert_eq!(m.health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_health_critical_on_heavy_rejection() {
        let m = metrics(20, 80, 100);
        assert_eq!(m.health_status(), HealthStatus::Critical);
    }

    #[test]
    fn test_health_tracks_capacity() {
        let near = metrics(100, 0, 8_500);
        assert!(near.is_near_capacity());
        assert_eq!(near.health_status(), HealthStatus::Degraded);

        let full = metrics(100, 0, 9_600);
        assert_eq!(full.health_status(), HealthStatus::Critical);
    }

    #[test]
    fn test_edge_cases() {
        // No traffic yet
        let m = metrics(0, 0, 0);
        assert_eq!(m.admit_rate(), 1.0);
        assert_eq!(m.rejection_rate(), 0.0);
        assert_eq!(m.health_status(), HealthStatus::Healthy);

        // Degenerate capacity
        let m = ThrottleMetrics {
            max_keys: 0,
            ..metrics(0, 0, 0)
        };
        assert_eq!(m.capacity_used(), 0.0);
    }

    #[test]
    fn test_health_status_methods() {
        assert!(!HealthStatus::Healthy.is_unhealthy());
        assert!(HealthStatus::Degraded.is_unhealthy());
        assert!(HealthStatus::Critical.is_unhealthy());

        assert_eq!(HealthStatus::Healthy.suggested_action(), "No action needed");
        assert!(HealthStatus::Degraded.suggested_action().contains("Monitor"));
        assert!(HealthStatus::Critical
            .suggested_action()
            .contains("Investigate"));
    }

    #[test]
    fn test_health_status_display() {
        assert!(format!("{}", HealthStatus::Healthy).contains("Healthy"));
        assert!(format!("{}", HealthStatus::Degraded).contains("Degraded"));
        assert!(format!("{}", HealthStatus::Critical).contains("Critical"));
    }

    #[test]
    fn test_metrics_display() {
        let m = ThrottleMetrics {
            total_admitted: 100,
            total_rejected: 20,
            windows_opened: 30,
            total_swept: 15,
            active_keys: 12,
            max_keys: 10_000,
        };

        let display = format!("{}", m);
        assert!(display.contains("Throttle Metrics"));
        assert!(display.contains("Admit Rate"));

        let summary = m.summary();
        assert!(summary.contains("Admission"));
        assert!(summary.contains("Table"));
        assert!(summary.contains("Health"));
        assert!(summary.contains("Tracked Keys: 12/10000"));
    }
}
