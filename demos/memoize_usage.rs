//! Memoizing a slow function with `MemoizingCache`.
//!
//! Run with `RUST_LOG=memo_rs=trace cargo run --example memoize_usage` to see
//! hits, misses and evictions as they happen.

use memo_rs::config::MemoConfig;
use memo_rs::{Arg, Args, CacheMetrics, CallError, FifoPolicy, MemoizingCache};
use std::fmt;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct NotPositive(i64);

impl fmt::Display for NotPositive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a positive integer", self.0)
    }
}

impl std::error::Error for NotPositive {}

/// Number of steps for `n` to reach 1 under the Collatz map.
fn collatz_steps(args: &Args) -> Result<u32, NotPositive> {
    let start = args.get(0).and_then(Arg::as_i64).unwrap_or_default();
    if start <= 0 {
        return Err(NotPositive(start));
    }
    let mut n = start;
    let mut steps = 0;
    while n != 1 {
        n = if n % 2 == 0 { n / 2 } else { 3 * n + 1 };
        steps += 1;
    }
    Ok(steps)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut cache = MemoizingCache::new(collatz_steps, Some(4), false).unwrap();

    for n in [27, 97, 27, 871, 6171, 27, 97, 77031] {
        let steps = cache.call(&Args::new().arg(n)).unwrap();
        println!("collatz({:>5}) = {:>3} steps", n, steps);
    }
    println!("after warm-up: {}", cache.cache_info());

    // 27.0 shares the key of 27 unless types are distinguished
    cache.call(&Args::new().arg(27.0)).unwrap();
    println!("after 27.0:    {}", cache.cache_info());

    match cache.call(&Args::new().arg(-5)) {
        Err(CallError::Function(e)) => println!("not cached: {}", e),
        other => println!("unexpected: {:?}", other),
    }

    match cache.call(&Args::new().arg(Arg::list([1, 2]))) {
        Err(err @ CallError::BadKey(_)) => println!("rejected: {}", err),
        other => println!("unexpected: {:?}", other),
    }

    cache.resize(Some(2)).unwrap();
    println!("after resize:  {}", cache.cache_info());

    for (name, value) in cache.metrics() {
        println!("  {:<18} {:.3}", name, value);
    }

    cache.cache_clear();
    println!("after clear:   {}", cache.cache_info());

    let config = MemoConfig {
        capacity: Some(2),
        distinguish_types: true,
    };
    let mut fifo = MemoizingCache::with_policy(config, FifoPolicy, collatz_steps).unwrap();
    for n in [3, 5, 3, 7] {
        fifo.call(&Args::new().arg(n)).unwrap();
    }
    println!(
        "{} cache keeps 3? {}",
        fifo.policy_name(),
        fifo.contains(&Args::new().arg(3)).unwrap()
    );
}
