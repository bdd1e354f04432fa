//! # Throttle - Fixed-Window Request Throttle for Rust
//!
//! A small, fast admission-control library: it counts requests per key inside
//! fixed time windows and tells you whether each call may proceed. Think of
//! it as a doorman with a clipboard - every caller gets a fixed number of
//! entries per minute, and the clipboard is wiped at each minute mark.
//!
//! ## What is a Fixed Window?
//!
//! A fixed window resets an integer counter at regular, non-overlapping time
//! boundaries (as opposed to a continuously sliding window or a token
//! bucket):
//!
//! ```text
//!     Fixed-Window Visualization (limit = 3 per minute):
//!
//!     |────────── 60s ──────────|────────── 60s ──────────|
//!      req ✅ req ✅ req ✅ req ⛔   req ✅ req ✅ ...
//!      1      2      3      4       1      2
//!                           │
//!                  over the limit: rejected,
//!                  counter untouched
//! ```
//!
//! The trade-off is explicit: a burst straddling a boundary can momentarily
//! pass up to 2x the nominal rate. For coarse abuse prevention - the use case
//! this crate targets - that is a fine price for the simplicity of one
//! counter and one timestamp per key.
//!
//! ## Features
//!
//! - 🔑 **Per-Key Budgets** - independent counters per (operation, caller) pair
//! - 🧹 **Background Sweep** - expired windows are removed periodically,
//!   bounding memory to active keys
//! - 🛡️ **Bounded Table** - a cap on tracked keys resists key-flood abuse
//! - 🧵 **Thread-Safe** - checks from any thread; per-key mutation is
//!   serialized by the table's sharded locks
//! - 📊 **Metrics** - admission counters and a three-level health status
//!
//! ## Quick Start
//!
//! ```rust
//! use throttle::{Throttle, ThrottleRule};
//!
//! // One shared table for the whole process
//! let throttle = Throttle::new();
//!
//! // 10 requests per minute for this key
//! let decision = throttle.check("ai-detect:1.2.3.4", ThrottleRule::per_minute(10));
//!
//! if decision.admitted {
//!     println!("✅ proceed ({} left this window)", decision.remaining);
//! } else {
//!     println!("⛔ too many requests, retry in {:?}", decision.retry_after());
//! }
//! ```
//!
//! ### Keying by Caller
//!
//! ```rust
//! use throttle::{derive_key, Throttle, ThrottleRule};
//!
//! let throttle = Throttle::new();
//!
//! // In a request handler: first forwarded entry identifies the caller,
//! // "unknown" when the header is absent.
//! let key = derive_key("ai-detect", Some("1.2.3.4, 10.0.0.1"));
//! assert_eq!(key, "ai-detect:1.2.3.4");
//!
//! let decision = throttle.check(&key, ThrottleRule::per_minute(10));
//! assert!(decision.admitted);
//! ```
//!
//! ### Background Sweep
//!
//! ```rust
//! use std::sync::Arc;
//! use throttle::Throttle;
//!
//! let throttle = Arc::new(Throttle::new());
//!
//! // Periodic sweep with a deterministic stop for shutdown/tests
//! let (handle, stop_tx) = throttle.clone().start_stoppable_sweep_thread();
//! # stop_tx.send(()).unwrap();
//! # handle.join().unwrap();
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Request Handlers      │
//!                    └──────────┬──────────────┘
//!                               │
//!                    ┌──────────▼──────────────┐
//!                    │     Throttle API        │
//!                    ├─────────────────────────┤
//!                    │  • check(key, rule)     │
//!                    │  • derive_key()         │
//!                    │  • metrics()            │
//!                    └──────────┬──────────────┘
//!                               │
//!                ┌──────────────┴───────────────┐
//!                │                              │
//!     ┌──────────▼──────────┐      ┌───────────▼──────────┐
//!     │   Window Table      │      │   Sweep Task         │
//!     ├─────────────────────┤      ├──────────────────────┤
//!     │ • key → {count,     │      │ • fixed interval     │
//!     │        reset_at}    │      │ • drops expired only │
//!     │ • sharded map       │      │ • stoppable          │
//!     │ • capacity bound    │      │                      │
//!     └─────────────────────┘      └──────────────────────┘
//! ```
//!
//! ## HTTP Mapping
//!
//! The throttle has no wire format of its own. The conventional mapping at
//! an HTTP boundary: admitted → proceed with normal processing; rejected →
//! respond "429 Too Many Requests" with no side effects, using
//! [`Decision::retry_after`] for the `Retry-After` header.
//!
//! ## Scope
//!
//! The table lives in one process: no persistence across restarts and no
//! cross-instance coordination. Running several instances multiplies every
//! budget by the instance count; a horizontally-scaled deployment needs a
//! shared, atomically-updated counter store instead of this crate's table.
//!
//! ## Examples
//!
//! See the `demos/` directory for complete walkthroughs:
//! - `basic.rs` - rules, admission, rejection, metrics
//! - `per_client.rs` - per-caller keying from forwarded headers

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

// Internal module
mod throttle;

// Public re-exports
pub use throttle::{
    client_from_forwarded, current_time_ms, derive_key, Decision, HealthStatus, Throttle,
    ThrottleMetrics, ThrottleRule, UNKNOWN_CLIENT,
};

/// A throttle wrapped in `Arc` for convenient thread-safe sharing.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use throttle::{SharedThrottle, Throttle, ThrottleRule};
///
/// let shared: SharedThrottle = Arc::new(Throttle::new());
///
/// // Clone and share across threads
/// let throttle_clone = shared.clone();
/// std::thread::spawn(move || {
///     throttle_clone.check("demo", ThrottleRule::per_minute(10));
/// });
/// ```
pub type SharedThrottle = std::sync::Arc<Throttle>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
pub const MSRV: &str = "1.70.0";

/// Prelude module for convenient imports.
///
/// Import everything you need with a single line:
/// ```rust
/// use throttle::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for typical admission-control use cases.
    //!
    //! # Example
    //! ```rust
    //! use throttle::prelude::*;
    //!
    //! let throttle = Throttle::new();
    //! let rule = ThrottleRule::per_minute(10);
    //! let decision = throttle.check("demo", rule);
    //! assert!(decision.admitted);
    //! ```

    pub use crate::{
        derive_key, Decision, HealthStatus, SharedThrottle, Throttle, ThrottleMetrics,
        ThrottleRule,
    };
}

/// Builder pattern for creating throttles with custom settings.
///
/// # Example
///
/// ```rust
/// use throttle::ThrottleBuilder;
///
/// // Sweep expired windows every 30 seconds
/// let throttle = ThrottleBuilder::new()
///     .sweep_interval_ms(30_000)
///     .build();
///
/// // Or use try_build() for error handling
/// let result = ThrottleBuilder::new()
///     .sweep_interval_ms(0)  // Invalid!
///     .try_build();
///
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ThrottleBuilder {
    sweep_interval_ms: u64,
}

impl ThrottleBuilder {
    /// Creates a new builder with default settings.
    ///
    /// Default configuration:
    /// - 60 second sweep interval
    pub fn new() -> Self {
        Self {
            sweep_interval_ms: 60_000,
        }
    }

    /// Sets the interval between background sweep passes.
    ///
    /// Shorter intervals bound memory more tightly at the cost of more
    /// frequent table scans.
    ///
    /// # Arguments
    ///
    /// * `ms` - Interval between sweeps in milliseconds (must be > 0)
    pub fn sweep_interval_ms(mut self, ms: u64) -> Self {
        self.sweep_interval_ms = ms;
        self
    }

    /// Builds the throttle with the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if `sweep_interval_ms` is 0. Use `try_build()` if you want to
    /// handle errors.
    pub fn build(self) -> Throttle {
        self.try_build().expect("Invalid throttle configuration")
    }

    /// Attempts to build the throttle, returning an error if invalid.
    ///
    /// # Errors
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn try_build(self) -> Result<Throttle, &'static str> {
        if self.sweep_interval_ms == 0 {
            return Err("sweep_interval_ms must be greater than 0");
        }
        Ok(Throttle::with_sweep_interval(self.sweep_interval_ms))
    }
}

impl Default for ThrottleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_functionality() {
        let throttle = Throttle::new();
        let rule = ThrottleRule::per_minute(10);

        for _ in 0..10 {
            assert!(throttle.check("k", rule).admitted);
        }

        assert!(!throttle.check("k", rule).admitted);

        let metrics = throttle.metrics();
        assert_eq!(metrics.total_admitted, 10);
        assert_eq!(metrics.total_rejected, 1);
    }

    #[test]
    fn test_builder() {
        let throttle = ThrottleBuilder::new().sweep_interval_ms(30_000).build();

        assert_eq!(throttle.active_keys(), 0);
    }

    #[test]
    fn test_builder_validation() {
        let result = ThrottleBuilder::new().sweep_interval_ms(0).try_build();

        assert!(result.is_err());
    }

    #[test]
    fn test_thread_safety() {
        let throttle = Arc::new(Throttle::new());
        let rule = ThrottleRule::per_minute(1000);
        let mut handles = vec![];

        for _ in 0..10 {
            let throttle_clone = throttle.clone();
            let handle = thread::spawn(move || {
                let mut admitted = 0;
                for _ in 0..200 {
                    if throttle_clone.check("shared", rule).admitted {
                        admitted += 1;
                    }
                }
                admitted
            });
            handles.push(handle);
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // 2000 attempts against a 1000 budget inside one window
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_prelude_imports() {
        // Test that prelude exports work
        use crate::prelude::*;

        let throttle = Throttle::new();
        let rule = ThrottleRule::default();
        let decision = throttle.check("prelude", rule);
        assert!(decision.admitted);
        let _status = HealthStatus::Healthy;
    }

    #[test]
    fn test_shared_type() {
        let throttle = Throttle::new();
        let _shared: SharedThrottle = std::sync::Arc::new(throttle);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(MSRV, "1.70.0");
    }

    #[test]
    fn test_builder_default() {
        let builder = ThrottleBuilder::default();
        let throttle = builder.build();
        assert_eq!(throttle.active_keys(), 0);
    }
}
