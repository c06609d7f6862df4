//! Fan-out Benchmark
//!
//! Measures synchronous notify throughput as the subscriber count grows, and
//! the extra cost of isolated notification.
//!
//! # Usage
//!
//! ```bash
//! cargo bench --bench fanout
//! ```

use observable::Observable;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const NOTIFICATIONS: u64 = 100_000;

struct BenchmarkResult {
    subscribers: usize,
    notify_ns: f64,
    isolated_ns: f64,
}

fn run(subscribers: usize) -> BenchmarkResult {
    let observable = Observable::new();
    let total = Arc::new(AtomicU64::new(0));
    for _ in 0..subscribers {
        let total = Arc::clone(&total);
        observable.subscribe(move |v: &u64| {
            total.fetch_add(*v, Ordering::Relaxed);
        });
    }

    let start = Instant::now();
    for i in 0..NOTIFICATIONS {
        observable.notify(black_box(&i));
    }
    let notify_ns = start.elapsed().as_nanos() as f64 / NOTIFICATIONS as f64;

    let start = Instant::now();
    for i in 0..NOTIFICATIONS {
        let _ = black_box(observable.notify_isolated(black_box(&i)));
    }
    let isolated_ns = start.elapsed().as_nanos() as f64 / NOTIFICATIONS as f64;

    black_box(total.load(Ordering::Relaxed));
    BenchmarkResult {
        subscribers,
        notify_ns,
        isolated_ns,
    }
}

fn main() {
    println!("{:>12} {:>14} {:>14}", "subscribers", "notify ns/op", "isolated ns/op");
    for subscribers in [0, 1, 4, 16, 64, 256] {
        let result = run(subscribers);
        println!(
            "{:>12} {:>14.1} {:>14.1}",
            result.subscribers, result.notify_ns, result.isolated_ns
        );
    }
}
