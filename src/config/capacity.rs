//! Capacity bound shared by the store and both memoizing façades.

use crate::error::ConfigError;
use core::fmt;
use core::num::NonZeroUsize;

/// Upper bound on the number of entries a store may hold.
///
/// `Unbounded` disables eviction entirely: victim selection is never consulted.
///
/// # Examples
///
/// ```
/// use memo_rs::config::Capacity;
///
/// assert_eq!(Capacity::from_option(Some(8)).unwrap().get(), Some(8));
/// assert_eq!(Capacity::from_option(None).unwrap(), Capacity::Unbounded);
/// assert!(Capacity::from_option(Some(0)).is_err());
/// assert!(Capacity::try_from(-1_i64).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capacity {
    /// At most this many entries.
    Bounded(NonZeroUsize),
    /// No limit.
    Unbounded,
}

impl Capacity {
    /// Validates an optional entry count. `None` means unbounded.
    pub fn from_option(capacity: Option<usize>) -> Result<Self, ConfigError> {
        match capacity {
            None => Ok(Capacity::Unbounded),
            Some(n) => NonZeroUsize::new(n)
                .map(Capacity::Bounded)
                .ok_or(ConfigError::ZeroCapacity),
        }
    }

    /// Returns the bound as a plain count, `None` when unbounded.
    #[inline]
    pub fn get(self) -> Option<usize> {
        match self {
            Capacity::Bounded(n) => Some(n.get()),
            Capacity::Unbounded => None,
        }
    }

    #[inline]
    pub fn is_bounded(self) -> bool {
        matches!(self, Capacity::Bounded(_))
    }

    /// Returns `true` if a store holding `len` entries has no room for another.
    #[inline]
    pub fn is_full(self, len: usize) -> bool {
        match self {
            Capacity::Bounded(n) => len >= n.get(),
            Capacity::Unbounded => false,
        }
    }

    /// Returns `true` if `len` entries exceed this bound.
    #[inline]
    pub fn is_exceeded_by(self, len: usize) -> bool {
        match self {
            Capacity::Bounded(n) => len > n.get(),
            Capacity::Unbounded => false,
        }
    }

    /// Initial hash index size; unbounded stores start small and grow.
    pub(crate) fn index_hint(self) -> usize {
        match self {
            Capacity::Bounded(n) => n.get().min(1 << 16).next_power_of_two(),
            Capacity::Unbounded => 16,
        }
    }
}

impl From<NonZeroUsize> for Capacity {
    fn from(n: NonZeroUsize) -> Self {
        Capacity::Bounded(n)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = ConfigError;

    /// Signed bounds coming from user input: negative and zero are rejected.
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(ConfigError::Negative(value));
        }
        let n = usize::try_from(value).map_err(|_| ConfigError::Negative(value))?;
        Capacity::from_option(Some(n))
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Bounded(n) => write!(f, "{}", n),
            Capacity::Unbounded => f.write_str("unbounded"),
        }
    }
}
