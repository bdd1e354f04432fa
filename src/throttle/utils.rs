//! # Time Utilities (utils.rs)
//!
//! Clock helpers for window bookkeeping. Every window boundary in this crate
//! is an absolute timestamp in milliseconds since the UNIX epoch, produced by
//! [`current_time_ms`].
//!
//! ## Clock-Jump Safety
//!
//! ```text
//!     Naive wall clock:                 Monotonic-based clock:
//!
//!     now() ─► SystemTime::now()        now() ─► base + Instant::elapsed()
//!                   │                               │
//!         NTP step / manual change          immune to clock steps
//!                   │                               │
//!         windows shrink or stretch         windows keep their length
//! ```
//!
//! The wall-clock epoch is captured exactly once at first use; after that,
//! "now" advances with a monotonic [`Instant`], so a system clock step can
//! never expire a live window early or keep an expired one alive.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// Monotonic time base to prevent issues when the system clock jumps.
// We capture the wall-clock epoch milliseconds at process start,
// then advance using a monotonic Instant to compute 'now'.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

/// Returns the current time in milliseconds since UNIX epoch.
///
/// Used for window boundaries (`reset_at`) and sweep expiry checks.
/// Millisecond precision is sufficient for admission control.
///
/// # Example
///
/// ```rust
/// use throttle::current_time_ms;
///
/// let now = current_time_ms();
/// println!("Current timestamp: {} ms", now);
/// ```
#[inline(always)]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    });
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_advances() {
        let ms1 = current_time_ms();

        std::thread::sleep(std::time::Duration::from_millis(10));

        let ms2 = current_time_ms();
        assert!(ms2 >= ms1 + 9);
    }

    #[test]
    fn test_time_monotonicity() {
        let mut last_ms = 0;

        for _ in 0..10 {
            let ms = current_time_ms();
            assert!(ms >= last_ms);
            last_ms = ms;

            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    #[test]
    fn test_time_is_epoch_scale() {
        // Sanity: the value is epoch milliseconds, not a small uptime counter.
        // 2020-01-01 in epoch ms.
        assert!(current_time_ms() > 1_577_836_800_000);
    }
}
