use throttle::{derive_key, Throttle, ThrottleRule};

fn main() {
    let throttle = Throttle::new();
    let rule = ThrottleRule::per_minute(10);

    // Simulate requests from different forwarded-address headers
    let headers = [
        Some("192.168.1.1"),
        Some("192.168.1.2, 10.0.0.1"),
        None, // no header: shares the "unknown" budget
    ];

    for forwarded in &headers {
        let key = derive_key("ai-detect", *forwarded);
        for i in 1..=12 {
            let decision = throttle.check(&key, rule);
            if decision.admitted {
                println!("{} - Request {} allowed", key, i);
            } else {
                // An HTTP handler would answer 429 here
                println!(
                    "{} - Request {} BLOCKED (retry in {:?})",
                    key,
                    i,
                    decision.retry_after()
                );
            }
        }
        println!();
    }

    println!("{}", throttle.metrics().summary());
}
