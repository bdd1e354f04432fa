//! # Throttle Module
//!
//! This module provides the internal implementation of the fixed-window
//! throttle. It's organized into several submodules, each responsible for a
//! specific aspect of admission control.
//!
//! ## Module Structure
//!
//! ```text
//!     throttle/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── config.rs       (Per-operation rules)
//!     ├── core.rs         (Fixed-window accounting and decisions)
//!     ├── table.rs        (Keyed table, capacity, background sweep)
//!     ├── key.rs          (Throttle key derivation)
//!     ├── metrics.rs      (Counters and health assessment)
//!     └── utils.rs        (Clock helpers)
//! ```
//!
//! ## Admission Flow
//!
//! ```text
//!     Incoming Request
//!          │
//!          ▼
//!     ┌─────────┐
//!     │   Key   │ ◄── operation + forwarded address
//!     └────┬────┘
//!          │
//!          ▼
//!     ┌─────────┐
//!     │  Table  │ ◄── one window entry per key
//!     └────┬────┘
//!          │
//!          ▼
//!     ┌─────────┐
//!     │  Core   │ ◄── fixed-window count against the rule
//!     └────┬────┘
//!          │
//!          ▼
//!      Decision  ──► admitted / rejected + remaining + reset_at
//! ```
//!
//! ## Component Responsibilities
//!
//! - **config**: the per-operation budget (limit, window length)
//! - **core**: window accounting for a single key, decision type
//! - **table**: the shared keyed table, capacity bound, periodic sweep
//! - **key**: deterministic key construction from request attributes
//! - **metrics**: admission counters and health status
//! - **utils**: clock-jump-safe current time

// Declare submodules (internal organization)
mod config;
mod core;
mod key;
mod metrics;
mod table;
mod utils;

// Re-export public types for external use
// These are the types that users of the library will interact with

/// Per-operation admission rules
pub use config::ThrottleRule;

/// Admission decision returned by every check
pub use core::Decision;

/// The keyed throttle table with background sweeping
pub use table::Throttle;

/// Throttle key derivation from request attributes
pub use key::{client_from_forwarded, derive_key, UNKNOWN_CLIENT};

/// Metrics and health monitoring for observability
pub use metrics::{HealthStatus, ThrottleMetrics};

/// Clock helper used for window bookkeeping
pub use utils::current_time_ms;
