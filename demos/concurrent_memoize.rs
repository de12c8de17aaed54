//! Sharing one memoizing cache between threads.
//!
//! Eight threads ask for the same slow result at once; single-flight makes the
//! function run once and the other seven wait for its value.
//!
//! Run with `RUST_LOG=memo_rs=trace cargo run --example concurrent_memoize --features concurrent`.

use memo_rs::{Arg, Args, ConcurrentMemoizingCache};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

static CALLS: AtomicUsize = AtomicUsize::new(0);

fn slow_lookup(args: &Args) -> Result<String, Infallible> {
    CALLS.fetch_add(1, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(200));
    let id = args.get(0).and_then(Arg::as_i64).unwrap_or_default();
    Ok(format!("record-{}", id))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cache = Arc::new(ConcurrentMemoizingCache::new(slow_lookup, Some(100), false).unwrap());

    let started = Instant::now();
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let value = cache.call(&Args::new().arg(42)).unwrap();
                println!("thread {} got {}", t, value);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    println!(
        "8 callers, {} function call(s), {:?} elapsed",
        CALLS.load(Ordering::SeqCst),
        started.elapsed()
    );
    println!("{}", cache.cache_info());
}
