//! Basic usage example for the throttle crate.

use std::thread;
use std::time::Duration;
use throttle::{Throttle, ThrottleRule};

fn main() {
    println!("=== Basic Throttle Example ===\n");

    // Example 1: Simple admission control
    simple_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 2: Rule constructors
    rule_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 3: Window rollover
    rollover_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 4: Monitoring metrics
    metrics_example();
}

fn simple_example() {
    println!("1. Simple Admission Control:");

    let throttle = Throttle::new();
    // 10 admissions per minute for this key
    let rule = ThrottleRule::per_minute(10);

    println!("   Created throttle, rule: 10 requests/minute");

    let mut admitted = 0;
    let mut rejected = 0;

    for i in 1..=12 {
        let decision = throttle.check("ai-detect:1.2.3.4", rule);
        if decision.admitted {
            admitted += 1;
            println!("   Request {} - ✅ Allowed ({} remaining)", i, decision.remaining);
        } else {
            rejected += 1;
            println!(
                "   Request {} - ❌ Throttled (retry in {:?})",
                i,
                decision.retry_after()
            );
        }
    }

    println!("   Results: {} admitted, {} throttled", admitted, rejected);
}

fn rule_example() {
    println!("2. Rule Constructors:");

    let per_second = ThrottleRule::per_second(100);
    let per_minute = ThrottleRule::per_minute(10);
    let custom = ThrottleRule::per_window(1000, Duration::from_secs(3600));

    for (name, rule) in [
        ("per_second(100)", per_second),
        ("per_minute(10)", per_minute),
        ("per_window(1000, 1h)", custom),
    ] {
        println!(
            "   {} -> limit {}, window {}ms, {:.3} req/sec sustained",
            name,
            rule.limit,
            rule.window_ms,
            rule.effective_rate_per_second()
        );
    }
}

fn rollover_example() {
    println!("3. Window Rollover:");

    let throttle = Throttle::new();
    // Tiny window so the demo doesn't have to wait a minute
    let rule = ThrottleRule::new(3, 500);

    println!("   Rule: 3 requests per 500ms window");

    for i in 1..=4 {
        let decision = throttle.check("demo", rule);
        println!(
            "   Request {} - {}",
            i,
            if decision.admitted { "✅ Allowed" } else { "❌ Throttled" }
        );
    }

    println!("   Waiting for the window to reset...");
    thread::sleep(Duration::from_millis(550));

    let decision = throttle.check("demo", rule);
    println!(
        "   After reset - {} ({} remaining)",
        if decision.admitted { "✅ Allowed" } else { "❌ Throttled" },
        decision.remaining
    );
}

fn metrics_example() {
    println!("4. Monitoring and Metrics:");

    let throttle = Throttle::new();
    let rule = ThrottleRule::per_minute(5);

    // Generate some traffic
    for _ in 0..8 {
        throttle.check("metrics-demo", rule);
    }

    let metrics = throttle.metrics();

    println!("   Admission Metrics:");
    println!("   - Total requests: {}", metrics.total_requests());
    println!("   - Admit rate: {:.2}%", metrics.admit_rate() * 100.0);
    println!("   - Rejection rate: {:.2}%", metrics.rejection_rate() * 100.0);
    println!("   - Tracked keys: {}/{}", metrics.active_keys, metrics.max_keys);

    let health = metrics.health_status();
    println!("   - Health status: {:?}", health);
    println!("   - Suggested action: {}", health.suggested_action());
}
