//! Configuration for memoizing caches.
//!
//! # Sizing Guidelines
//!
//! `capacity` counts cached results, not bytes. Each entry costs roughly the
//! size of the encoded key plus the value plus ~80 bytes of list node, index
//! slot and metadata.
//!
//! - Recursive functions with a small argument domain (Fibonacci, grid walks)
//!   are usually fine unbounded: `capacity: None`.
//! - Functions called with an open-ended argument space need a bound, otherwise
//!   the cache grows with every distinct call.
//!
//! # Examples
//!
//! ```
//! use memo_rs::config::MemoConfig;
//!
//! // Default: 128 entries, 1 and 1.0 share a key
//! let config = MemoConfig::default();
//! assert_eq!(config.capacity, Some(128));
//!
//! let config = MemoConfig {
//!     capacity: None,
//!     distinguish_types: true,
//! };
//! assert!(config.validate().is_ok());
//! ```

use super::Capacity;
use crate::error::ConfigError;
use core::fmt;

/// Entry bound used by [`MemoConfig::default`].
pub const DEFAULT_CAPACITY: usize = 128;

/// Configuration for a [`MemoizingCache`](crate::MemoizingCache) or its
/// concurrent counterpart.
///
/// # Fields
///
/// - `capacity`: Maximum number of cached results; `None` disables eviction.
///   `Some(0)` is rejected when the cache is built.
/// - `distinguish_types`: When `true`, arguments that compare equal but have
///   different types (`1` and `1.0`) are cached separately.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MemoConfig {
    /// Maximum number of cached results, `None` for unbounded.
    pub capacity: Option<usize>,
    /// Cache equal values of different types under different keys.
    pub distinguish_types: bool,
}

impl MemoConfig {
    /// Checks the bound and returns it in validated form.
    pub fn validate(&self) -> Result<Capacity, ConfigError> {
        Capacity::from_option(self.capacity)
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            capacity: Some(DEFAULT_CAPACITY),
            distinguish_types: false,
        }
    }
}

impl fmt::Debug for MemoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoConfig")
            .field("capacity", &self.capacity)
            .field("distinguish_types", &self.distinguish_types)
            .finish()
    }
}
