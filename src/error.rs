//! Error types for memoized calls, key encoding and configuration.
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`EncodeError`] | [`KeyCodec::encode`](crate::key::KeyCodec::encode) | Arguments cannot form a cache key |
//! | [`CallError`] | [`MemoizingCache::call`](crate::MemoizingCache::call) | Bad key, or the wrapped function failed |
//! | [`ConfigError`] | constructors and `resize` | Capacity bound rejected at the boundary |
//! | [`InvariantError`] | [`EntryStore::check_invariants`](crate::store::EntryStore::check_invariants) | Internal bookkeeping drifted |
//!
//! None of these are recovered or retried inside the cache. They surface to the
//! caller as soon as they occur.

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// Where an offending argument sits in the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPosition {
    /// Zero-based index into the positional arguments.
    Positional(usize),
    /// Name of a keyword argument.
    Keyword(String),
}

impl fmt::Display for ArgPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgPosition::Positional(index) => write!(f, "positional argument {}", index),
            ArgPosition::Keyword(name) => write!(f, "keyword argument `{}`", name),
        }
    }
}

/// Error returned when call arguments cannot be normalized into a [`Key`](crate::key::Key).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The argument (or something nested inside it) is a mutable container.
    ///
    /// Use [`Arg::freeze`](crate::key::Arg::freeze) to opt into caching by value.
    #[error("{position} is unhashable: `{type_name}` is a mutable container")]
    Unhashable {
        /// Which argument was rejected.
        position: ArgPosition,
        /// Type name of the innermost offending value.
        type_name: &'static str,
    },

    /// The same keyword was passed twice in one call.
    #[error("keyword argument `{0}` passed more than once")]
    DuplicateKeyword(String),
}

/// Error returned by a memoized call.
///
/// `E` is the wrapped function's own error type. The cache never inspects it.
#[derive(Debug, thiserror::Error)]
pub enum CallError<E> {
    /// The arguments could not be encoded; the wrapped function was not invoked.
    #[error("arguments cannot be used as a cache key: {0}")]
    BadKey(#[from] EncodeError),

    /// The wrapped function returned an error. Nothing was cached.
    #[error("wrapped function failed: {0}")]
    Function(#[source] E),
}

impl<E> CallError<E> {
    /// Returns `true` for [`CallError::BadKey`].
    pub fn is_bad_key(&self) -> bool {
        matches!(self, CallError::BadKey(_))
    }

    /// Returns the wrapped function's error, if that is what this is.
    pub fn into_function_error(self) -> Option<E> {
        match self {
            CallError::Function(e) => Some(e),
            CallError::BadKey(_) => None,
        }
    }
}

impl<E: PartialEq> PartialEq for CallError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CallError::BadKey(a), CallError::BadKey(b)) => a == b,
            (CallError::Function(a), CallError::Function(b)) => a == b,
            _ => false,
        }
    }
}

/// Error returned when a capacity bound is invalid.
///
/// Invalid bounds are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A bounded cache must hold at least one entry. Use `None` for unbounded.
    #[error("capacity must be greater than zero (use None for an unbounded cache)")]
    ZeroCapacity,

    /// Negative bounds are meaningless.
    #[error("capacity must not be negative, got {0}")]
    Negative(i64),
}

/// Error returned when internal store invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}
