use std::sync::Arc;
use std::thread;
use std::time::Duration;
use throttle::{derive_key, Throttle, ThrottleRule};

#[test]
fn test_window_budget_and_rollover() {
    let throttle = Throttle::new();
    let rule = ThrottleRule::new(10, 200);
    let key = derive_key("ai-detect", Some("1.2.3.4"));
    assert_eq!(key, "ai-detect:1.2.3.4");

    // Calls 1-10 inside the window are admitted, remaining counts down to 0
    for expected_remaining in (0..10).rev() {
        let decision = throttle.check(&key, rule);
        assert!(decision.admitted);
        assert_eq!(decision.remaining, expected_remaining);
    }

    // Call 11 inside the same window is rejected with remaining = 0
    let rejected = throttle.check(&key, rule);
    assert!(!rejected.admitted);
    assert_eq!(rejected.remaining, 0);
    assert!(rejected.retry_after_ms() <= 200);

    // After the window lapses a call starts fresh with remaining = limit - 1
    thread::sleep(Duration::from_millis(230));

    let fresh = throttle.check(&key, rule);
    assert!(fresh.admitted);
    assert_eq!(fresh.remaining, 9);
}

#[test]
fn test_keys_do_not_influence_each_other() {
    let throttle = Throttle::new();
    let rule = ThrottleRule::per_minute(3);

    let detect = derive_key("ai-detect", Some("1.2.3.4"));
    let tags = derive_key("ai-tags", Some("1.2.3.4"));
    let other_caller = derive_key("ai-detect", Some("10.0.0.7"));

    // Exhaust the first key
    for _ in 0..3 {
        assert!(throttle.check(&detect, rule).admitted);
    }
    assert!(!throttle.check(&detect, rule).admitted);

    // Same caller, different operation: untouched budget
    assert_eq!(throttle.check(&tags, rule).remaining, 2);

    // Same operation, different caller: untouched budget
    assert_eq!(throttle.check(&other_caller, rule).remaining, 2);
}

#[test]
fn test_sustained_contention_admits_exactly_the_budget() {
    let throttle = Arc::new(Throttle::new());
    let rule = ThrottleRule::per_minute(100);
    let mut handles = vec![];

    // Many threads fighting over one key inside a single window
    for thread_id in 0..20 {
        let throttle_clone = throttle.clone();
        handles.push(thread::spawn(move || {
            let mut admitted = 0u32;
            let mut rejected = 0u32;

            for _ in 0..50 {
                if throttle_clone.check("hot-key", rule).admitted {
                    admitted += 1;
                } else {
                    rejected += 1;
                }
            }

            (thread_id, admitted, rejected)
        }));
    }

    let results: Vec<(usize, u32, u32)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let total_admitted: u32 = results.iter().map(|(_, a, _)| a).sum();
    let total_rejected: u32 = results.iter().map(|(_, _, r)| r).sum();

    println!(
        "Contention test - Admitted: {}, Rejected: {}",
        total_admitted, total_rejected
    );

    // 1000 attempts against a budget of 100: exactly the budget admitted
    assert_eq!(total_admitted, 100);
    assert_eq!(total_rejected, 900);

    // Check metrics consistency
    let metrics = throttle.metrics();
    assert_eq!(metrics.total_admitted, total_admitted as u64);
    assert_eq!(metrics.total_rejected, total_rejected as u64);
}

#[test]
fn test_sweep_lifecycle() {
    let throttle = Arc::new(Throttle::with_sweep_interval(100));
    let short = ThrottleRule::new(10, 150);

    // Phase 1: open windows for many keys
    for i in 0..50 {
        let key = derive_key("op", Some(&format!("192.168.1.{}", i)));
        assert!(throttle.check(&key, short).admitted);
    }
    assert_eq!(throttle.active_keys(), 50);

    // Phase 2: start the sweep thread
    let (handle, stop_tx) = throttle.clone().start_stoppable_sweep_thread();

    // Phase 3: keep a few keys alive past expiry while the rest go stale
    let kept = 5;
    for _ in 0..4 {
        for i in 0..kept {
            let key = derive_key("op", Some(&format!("192.168.1.{}", i)));
            throttle.check(&key, short);
        }
        thread::sleep(Duration::from_millis(60));
    }

    // Give the sweep another full interval after the last refresh
    thread::sleep(Duration::from_millis(60));

    // The sweep has run several times by now; stale keys are gone, the
    // continuously-refreshed ones survive.
    let remaining = throttle.active_keys();
    println!("Remaining keys after sweep: {}", remaining);
    assert!(remaining < 50, "should have swept stale keys");
    assert!(
        remaining >= kept,
        "should have kept at least {} refreshed keys, but only {} remain",
        kept,
        remaining
    );

    // Phase 4: stop the sweep thread deterministically
    stop_tx.send(()).unwrap();
    handle.join().unwrap();

    let metrics = throttle.metrics();
    assert!(metrics.total_swept > 0);
}

#[test]
fn test_unknown_caller_shares_one_budget() {
    let throttle = Throttle::new();
    let rule = ThrottleRule::per_minute(2);

    // No forwarded header and an empty one both map to the sentinel key
    let a = derive_key("ai-detect", None);
    let b = derive_key("ai-detect", Some(""));
    assert_eq!(a, "ai-detect:unknown");
    assert_eq!(a, b);

    assert!(throttle.check(&a, rule).admitted);
    assert!(throttle.check(&b, rule).admitted);
    assert!(!throttle.check(&a, rule).admitted);
}
