//! # Keyed Throttle Table
//!
//! This module provides the throttle table: one [`WindowEntry`] per key, with
//! periodic sweeping of expired windows. It's designed for request handlers
//! that need to apply different budgets to different (operation, caller)
//! pairs over one shared table.
//!
//! ## Architecture
//!
//! ```text
//!     Admission Flow:
//!
//!     "ai-detect:1.2.3.4" ──┐
//!     "ai-detect:10.0.0.7" ─┤
//!     "ai-tags:1.2.3.4" ────┼──► Throttle ──► check() ──► Decision
//!     "buy-points:..." ─────┘        │
//!                                    ▼
//!                             ┌──────────────┐
//!                             │  DashMap     │
//!                             │  ┌─────────┐ │
//!                             │  │key → WE │ │  WE = WindowEntry
//!                             │  │key → WE │ │
//!                             │  │key → WE │ │
//!                             │  └─────────┘ │
//!                             └──────┬───────┘
//!                                    │ every sweep interval
//!                                    ▼
//!                             drop expired windows
//! ```
//!
//! ## Key Properties
//!
//! 1. **Per-Key Isolation**: each key's counter is independent
//! 2. **Serialized Mutation**: a key's read-modify-write runs under its
//!    shard lock, so concurrent calls for one key never double-admit
//! 3. **Bounded Memory**: expired windows are swept periodically, and the
//!    table caps the number of tracked keys to resist key-flood abuse
//! 4. **Idempotent Sweep**: expiry is re-checked at deletion time, so an
//!    entry refreshed mid-sweep is never evicted

use super::{
    config::ThrottleRule,
    core::{Decision, WindowEntry},
    metrics::ThrottleMetrics,
    utils::current_time_ms,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

// Configuration constants

/// Maximum number of distinct keys the table will track simultaneously.
///
/// This limit prevents memory exhaustion attacks where an attacker spreads
/// requests over millions of fabricated keys.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Occupancy at which an on-demand sweep runs before inserting a new key
/// (90% of max).
const SWEEP_THRESHOLD: usize = (MAX_TRACKED_KEYS * 90) / 100;

/// Default interval between background sweep passes (milliseconds).
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Per-key fixed-window admission control over an owned in-memory table.
///
/// The table is explicit state: construct it once, hand it to the request
/// layer (typically as [`SharedThrottle`](crate::SharedThrottle)), and tests
/// can build isolated instances. Nothing is ambient or process-global.
///
/// ## Usage Patterns
///
/// ### Request Handler Integration
///
/// ```rust
/// use std::sync::Arc;
/// use throttle::{derive_key, Throttle, ThrottleRule};
///
/// let throttle = Arc::new(Throttle::new());
///
/// // In your request handler:
/// fn handle_request(throttle: &Throttle, forwarded_for: Option<&str>) {
///     let key = derive_key("ai-detect", forwarded_for);
///     let decision = throttle.check(&key, ThrottleRule::per_minute(10));
///     if !decision.admitted {
///         // Respond 429 Too Many Requests, Retry-After: decision.retry_after()
///         return;
///     }
///     // Process the request
/// }
/// ```
///
/// ### With Background Sweep
///
/// ```rust
/// use std::sync::Arc;
/// use throttle::Throttle;
///
/// let throttle = Arc::new(Throttle::with_sweep_interval(60_000));
///
/// // Start the periodic sweep; stop it deterministically when shutting down.
/// let (handle, stop_tx) = throttle.clone().start_stoppable_sweep_thread();
/// # stop_tx.send(()).unwrap();
/// # handle.join().unwrap();
/// ```
///
/// ## Memory Management
///
/// 1. **Periodic Sweep**: expired windows are removed on a fixed interval
/// 2. **On-Demand Sweep**: inserting a new key into a nearly-full table
///    sweeps first
/// 3. **Bounded Tracking**: at most 10,000 keys; a full table of live
///    windows rejects new keys rather than evicting live counters
#[derive(Clone)]
pub struct Throttle {
    /// Concurrent hash map storing key to window-entry mappings.
    /// DashMap provides sharded locking for concurrent access.
    entries: Arc<DashMap<String, WindowEntry, ahash::RandomState>>,

    /// Current count of tracked keys.
    /// Used for fast capacity checks without iterating the map.
    active_count: Arc<AtomicUsize>,

    /// Interval between background sweep passes (milliseconds).
    sweep_interval_ms: u64,

    /// Total number of calls admitted since startup.
    total_admitted: Arc<AtomicU64>,

    /// Total number of calls rejected since startup.
    total_rejected: Arc<AtomicU64>,

    /// Total number of windows opened since startup (new keys and expired
    /// windows rolling over).
    windows_opened: Arc<AtomicU64>,

    /// Total number of expired windows removed since startup.
    total_swept: Arc<AtomicU64>,

    /// Flag to prevent concurrent sweep passes.
    sweep_in_progress: Arc<AtomicBool>,
}

impl Throttle {
    /// Creates a new throttle table with the default sweep interval (60 s).
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{Throttle, ThrottleRule};
    ///
    /// let throttle = Throttle::new();
    /// assert!(throttle.check("demo", ThrottleRule::per_minute(10)).admitted);
    /// ```
    pub fn new() -> Self {
        // Shard count scaled to CPU cores; more shards means less contention
        // at the cost of memory overhead.
        let num_shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .next_power_of_two()
            .min(64);

        // Pre-size each shard for expected load distribution
        let initial_capacity = (MAX_TRACKED_KEYS / num_shards).max(128);

        Self {
            entries: Arc::new(DashMap::with_capacity_and_hasher_and_shard_amount(
                initial_capacity,
                ahash::RandomState::new(),
                num_shards,
            )),
            active_count: Arc::new(AtomicUsize::new(0)),
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            total_admitted: Arc::new(AtomicU64::new(0)),
            total_rejected: Arc::new(AtomicU64::new(0)),
            windows_opened: Arc::new(AtomicU64::new(0)),
            total_swept: Arc::new(AtomicU64::new(0)),
            sweep_in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a throttle with a custom sweep interval.
    ///
    /// # Arguments
    ///
    /// * `sweep_interval_ms` - How often the background sweep runs
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::Throttle;
    ///
    /// // Sweep every 30 seconds
    /// let throttle = Throttle::with_sweep_interval(30_000);
    /// ```
    pub fn with_sweep_interval(sweep_interval_ms: u64) -> Self {
        let mut throttle = Self::new();
        throttle.sweep_interval_ms = sweep_interval_ms;
        throttle
    }

    /// Decides whether a call identified by `key` may proceed under `rule`.
    ///
    /// This is the single public admission operation:
    ///
    /// - No entry for `key`, or the stored window has expired: a fresh
    ///   window opens (`count = 1`), the call is admitted with
    ///   `remaining = limit - 1`.
    /// - Live window with `count < limit`: the call is admitted and
    ///   `remaining` decreases by 1.
    /// - Live window at the limit: the call is rejected with
    ///   `remaining = 0` and the unchanged `reset_at` reporting when the
    ///   caller may retry.
    ///
    /// The operation never fails and never blocks beyond the entry's shard
    /// lock. A zero `limit` or `window_ms` is a caller contract violation,
    /// checked by a debug assertion.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{Throttle, ThrottleRule};
    ///
    /// let throttle = Throttle::new();
    /// let rule = ThrottleRule::per_minute(3);
    ///
    /// assert_eq!(throttle.check("demo", rule).remaining, 2);
    /// assert_eq!(throttle.check("demo", rule).remaining, 1);
    /// assert_eq!(throttle.check("demo", rule).remaining, 0);
    /// assert!(!throttle.check("demo", rule).admitted);
    /// ```
    #[inline]
    pub fn check(&self, key: &str, rule: ThrottleRule) -> Decision {
        debug_assert!(rule.validate().is_ok(), "invalid throttle rule");

        let now = current_time_ms();

        // Fast path: the key is already tracked. Mutating through get_mut
        // holds the entry's shard lock, which serializes concurrent calls
        // for the same key and avoids allocating the key again.
        if let Some(mut entry) = self.entries.get_mut(key) {
            let decision = self.roll_window(entry.value_mut(), rule, now);
            drop(entry);
            self.record(decision);
            return decision;
        }

        self.check_untracked(key, rule, now)
    }

    /// Applies one call to an existing entry: roll an expired window over,
    /// or account within the live one.
    #[inline]
    fn roll_window(&self, entry: &mut WindowEntry, rule: ThrottleRule, now: u64) -> Decision {
        if entry.is_expired(now) {
            *entry = WindowEntry::open(now, rule.window_ms);
            self.windows_opened.fetch_add(1, Ordering::Relaxed);
            entry.opening_decision(rule)
        } else {
            entry.observe(rule.limit)
        }
    }

    /// Slow path for keys with no entry: capacity checks, then atomic
    /// insert-or-observe.
    fn check_untracked(&self, key: &str, rule: ThrottleRule, now: u64) -> Decision {
        // Sweep expired windows before taking up one of the last slots.
        if self.active_count.load(Ordering::Acquire) >= SWEEP_THRESHOLD {
            self.sweep();
        }

        if self.active_count.load(Ordering::Acquire) >= MAX_TRACKED_KEYS {
            warn!(
                "throttle table full ({} keys), rejecting new key: {}",
                MAX_TRACKED_KEYS, key
            );
            return self.reject_untracked(rule, now);
        }

        // Entry API for atomic insert-or-get
        match self.entries.entry(key.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                // Another thread created it while we were checking
                let decision = self.roll_window(occupied.get_mut(), rule, now);
                drop(occupied);
                self.record(decision);
                decision
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                // Reserve our slot atomically
                let prev = self.active_count.fetch_add(1, Ordering::AcqRel);

                // Check for race condition where we exceeded the limit
                if prev >= MAX_TRACKED_KEYS {
                    // Rollback our increment
                    self.active_count.fetch_sub(1, Ordering::AcqRel);
                    warn!("throttle table capacity race detected, rejecting key: {}", key);
                    return self.reject_untracked(rule, now);
                }

                let entry = WindowEntry::open(now, rule.window_ms);
                let decision = entry.opening_decision(rule);
                vacant.insert(entry);

                self.windows_opened.fetch_add(1, Ordering::Relaxed);
                debug!("opened window for key: {} (active: {})", key, prev + 1);

                self.record(decision);
                decision
            }
        }
    }

    /// Rejection for a key the table refuses to track (fail-closed).
    ///
    /// The table never evicts a live window to make room: dropping one
    /// would reset its count and let that key double its admissions. A
    /// full table therefore turns away new keys until windows lapse.
    fn reject_untracked(&self, rule: ThrottleRule, now: u64) -> Decision {
        let decision = Decision {
            admitted: false,
            remaining: 0,
            reset_at_ms: now.saturating_add(rule.window_ms),
        };
        self.record(decision);
        decision
    }

    /// Records a decision in the admission counters.
    #[inline]
    fn record(&self, decision: Decision) {
        if decision.admitted {
            self.total_admitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Removes every entry whose window has fully expired.
    ///
    /// Expiry is evaluated per entry, under its shard lock, at deletion
    /// time, so an entry that was refreshed after the sweep began carries
    /// a new `reset_at` and is kept. Running the sweep twice in a row is
    /// therefore harmless.
    ///
    /// Returns the number of entries removed. A pass that loses the race
    /// against an already-running sweep returns 0 without scanning.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{Throttle, ThrottleRule};
    ///
    /// let throttle = Throttle::new();
    /// throttle.check("short-lived", ThrottleRule::new(5, 1));
    /// std::thread::sleep(std::time::Duration::from_millis(5));
    ///
    /// assert_eq!(throttle.sweep(), 1);
    /// assert_eq!(throttle.active_keys(), 0);
    /// ```
    pub fn sweep(&self) -> usize {
        // Only one sweep at a time; losers skip rather than queue.
        if self
            .sweep_in_progress
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return 0;
        }

        // Ensure we reset the flag when done (RAII pattern)
        let _guard = SweepGuard {
            flag: &self.sweep_in_progress,
        };

        let now = current_time_ms();
        let mut removed = 0usize;

        self.entries.retain(|key, entry| {
            if entry.is_expired(now) {
                debug!("sweeping expired window for key: {}", key);
                removed += 1;
                self.active_count.fetch_sub(1, Ordering::AcqRel);
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.total_swept.fetch_add(removed as u64, Ordering::Relaxed);
            debug!("sweep removed {} expired windows", removed);
        }

        self.shrink_to_fit();
        removed
    }

    /// Shrinks the internal map if it has significant overcapacity.
    ///
    /// This helps reduce memory usage after many keys have been removed.
    pub fn shrink_to_fit(&self) {
        let current_size = self.active_count.load(Ordering::Acquire);
        let capacity = self.entries.capacity();

        // Shrink if capacity is more than 4x the current size
        if capacity > current_size * 4 && capacity > 1024 {
            self.entries.shrink_to_fit();
            debug!(
                "shrunk throttle table capacity from {} to ~{}",
                capacity, current_size
            );
        }
    }

    /// Returns the number of currently tracked keys.
    #[inline]
    pub fn active_keys(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the throttle's counters and occupancy.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{Throttle, ThrottleRule};
    ///
    /// let throttle = Throttle::new();
    /// throttle.check("demo", ThrottleRule::per_minute(10));
    ///
    /// let metrics = throttle.metrics();
    /// assert_eq!(metrics.total_admitted, 1);
    /// println!("{}", metrics.summary());
    /// ```
    pub fn metrics(&self) -> ThrottleMetrics {
        ThrottleMetrics {
            total_admitted: self.total_admitted.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            windows_opened: self.windows_opened.load(Ordering::Relaxed),
            total_swept: self.total_swept.load(Ordering::Relaxed),
            active_keys: self.active_keys(),
            max_keys: MAX_TRACKED_KEYS,
        }
    }

    /// Starts the background sweep thread.
    ///
    /// The thread runs indefinitely, sweeping at the configured interval.
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the sweep thread.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use throttle::Throttle;
    ///
    /// let throttle = Arc::new(Throttle::new());
    /// let handle = throttle.clone().start_sweep_thread();
    ///
    /// // The sweep thread now runs until the program exits
    /// ```
    pub fn start_sweep_thread(self: Arc<Self>) -> thread::JoinHandle<()> {
        let throttle = self.clone();

        thread::Builder::new()
            .name("throttle-sweep".to_string())
            .spawn(move || {
                info!(
                    "started sweep thread (interval: {}ms)",
                    throttle.sweep_interval_ms
                );

                loop {
                    thread::sleep(Duration::from_millis(throttle.sweep_interval_ms));
                    throttle.sweep();

                    let active = throttle.active_keys();
                    if active > SWEEP_THRESHOLD {
                        warn!(
                            "high key usage: {} tracked keys ({}% of capacity)",
                            active,
                            (active * 100) / MAX_TRACKED_KEYS
                        );
                    }
                }
            })
            .expect("Failed to spawn sweep thread")
    }

    /// Starts a stoppable background sweep thread.
    ///
    /// Similar to [`start_sweep_thread`](Self::start_sweep_thread), but can
    /// be stopped by sending a signal through the returned channel, which
    /// makes the sweep's lifecycle deterministic in tests and shutdown
    /// paths.
    ///
    /// # Returns
    ///
    /// A tuple of:
    /// - `JoinHandle` for the sweep thread
    /// - `Sender` to signal the thread to stop
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use throttle::Throttle;
    ///
    /// let throttle = Arc::new(Throttle::new());
    /// let (handle, stop_tx) = throttle.clone().start_stoppable_sweep_thread();
    ///
    /// // Later, to stop the thread:
    /// stop_tx.send(()).unwrap();
    /// handle.join().unwrap();
    /// ```
    pub fn start_stoppable_sweep_thread(
        self: Arc<Self>,
    ) -> (thread::JoinHandle<()>, mpsc::Sender<()>) {
        let (stop_tx, stop_rx) = mpsc::channel();
        let throttle = self.clone();

        let handle = thread::Builder::new()
            .name("throttle-sweep".to_string())
            .spawn(move || {
                info!(
                    "started stoppable sweep thread (interval: {}ms)",
                    throttle.sweep_interval_ms
                );

                loop {
                    match stop_rx.recv_timeout(Duration::from_millis(throttle.sweep_interval_ms)) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            info!("sweep thread stopping");
                            break;
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            throttle.sweep();

                            let active = throttle.active_keys();
                            if active > SWEEP_THRESHOLD {
                                warn!(
                                    "high key usage: {} tracked keys ({}% of capacity)",
                                    active,
                                    (active * 100) / MAX_TRACKED_KEYS
                                );
                            }
                        }
                    }
                }
            })
            .expect("Failed to spawn sweep thread");

        (handle, stop_tx)
    }

    /// Removes every entry and resets the table to empty.
    ///
    /// Counters other than the sweep total are preserved. Useful for tests
    /// and emergency resets.
    ///
    /// # Example
    ///
    /// ```rust
    /// use throttle::{Throttle, ThrottleRule};
    ///
    /// let throttle = Throttle::new();
    /// throttle.check("demo", ThrottleRule::per_minute(10));
    /// throttle.clear();
    /// assert_eq!(throttle.active_keys(), 0);
    /// ```
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        self.active_count.store(0, Ordering::Release);
        self.total_swept.fetch_add(count as u64, Ordering::Relaxed);
        info!("cleared all {} throttle entries", count);
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("active_keys", &self.active_keys())
            .field("sweep_interval_ms", &self.sweep_interval_ms)
            .finish()
    }
}

/// RAII guard for the sweep flag.
///
/// Ensures the flag is always reset, even if the sweep panics or returns
/// early.
struct SweepGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> Drop for SweepGuard<'a> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
