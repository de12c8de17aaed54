//! Cache Configuration Module
//!
//! Configuration structs have all public fields for simple instantiation, and
//! are validated once, when a cache is built from them:
//!
//! - **Simple**: Just create the struct with all fields set
//! - **Checked at the boundary**: Invalid bounds fail construction with a
//!   [`ConfigError`](crate::error::ConfigError) instead of being clamped
//!
//! | Item | Used by | Description |
//! |------|---------|-------------|
//! | [`MemoConfig`] | [`MemoizingCache`](crate::MemoizingCache), `ConcurrentMemoizingCache` | Capacity and type distinction |
//! | [`Capacity`] | [`EntryStore`](crate::store::EntryStore) | Validated entry bound |
//!
//! # Examples
//!
//! ```
//! use memo_rs::config::MemoConfig;
//! use memo_rs::{Args, MemoizingCache};
//! use core::convert::Infallible;
//!
//! let config = MemoConfig {
//!     capacity: Some(1000),
//!     distinguish_types: false,
//! };
//! let mut cache = MemoizingCache::init(config, |args: &Args| {
//!     Ok::<_, Infallible>(args.len())
//! })
//! .unwrap();
//! assert_eq!(cache.call(&Args::new().arg(1).arg(2)).unwrap(), 2);
//! ```

pub mod capacity;
pub mod memo;

pub use capacity::Capacity;
pub use memo::{MemoConfig, DEFAULT_CAPACITY};
