//! Call Arguments and Key Encoding
//!
//! A memoized call is described by an [`Args`] value: positional arguments in
//! call order plus named keyword arguments. [`KeyCodec`] normalizes an `Args`
//! into a [`Key`], the hashable token the store is indexed by.
//!
//! # Normalization Rules
//!
//! - Positional arguments keep their call order.
//! - Keyword arguments are sorted by name, so `f(a=1, b=2)` and `f(b=2, a=1)`
//!   produce the same key. Passing a name twice is an error.
//! - Mutable containers ([`Arg::List`], [`Arg::Map`]) are rejected with
//!   [`EncodeError::Unhashable`], at any nesting depth. [`Arg::freeze`] converts
//!   them into their immutable counterparts when caching by value is intended.
//! - Floats: `-0.0` and `0.0` are the same value, and every NaN is folded into
//!   one canonical NaN that equals itself inside a key.
//!
//! # Type Distinction
//!
//! With `distinguish_types` off, values that compare equal share a key even if
//! their types differ: `true`, `1`, `1u64` and `1.0` all encode to the same
//! integer part. With it on, the encoded part keeps the value's type, so each
//! of those is a separate cache entry. The rule applies recursively inside
//! tuples and frozen maps.
//!
//! ```
//! use memo_rs::key::KeyCodec;
//! use memo_rs::Args;
//!
//! let loose = KeyCodec::new(false);
//! let strict = KeyCodec::new(true);
//! let int = Args::new().arg(1);
//! let float = Args::new().arg(1.0);
//!
//! assert_eq!(loose.encode(&int).unwrap(), loose.encode(&float).unwrap());
//! assert_ne!(strict.encode(&int).unwrap(), strict.encode(&float).unwrap());
//! ```

extern crate alloc;

use crate::error::{ArgPosition, EncodeError};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// Bit pattern every NaN is folded into.
const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

/// 2^63, the first float outside the `i64` range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// 2^127, the first float outside the `i128` range.
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// A dynamically typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// The unit value, for "no value" arguments.
    Unit,
    /// Boolean; equal to `0` and `1` unless types are distinguished.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer, for values past `i64::MAX`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Immutable sequence; hashable when its elements are.
    Tuple(Vec<Arg>),
    /// Immutable name/value mapping; hashable when its values are.
    FrozenMap(Vec<(String, Arg)>),
    /// Mutable sequence. Unhashable unless frozen.
    List(Vec<Arg>),
    /// Mutable name/value mapping. Unhashable unless frozen.
    Map(Vec<(String, Arg)>),
}

impl Arg {
    /// Builds a tuple from anything convertible into arguments.
    pub fn tuple<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        Arg::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a mutable list from anything convertible into arguments.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        Arg::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the value's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Unit => "unit",
            Arg::Bool(_) => "bool",
            Arg::Int(_) => "int",
            Arg::UInt(_) => "uint",
            Arg::Float(_) => "float",
            Arg::Str(_) => "str",
            Arg::Bytes(_) => "bytes",
            Arg::Tuple(_) => "tuple",
            Arg::FrozenMap(_) => "frozenmap",
            Arg::List(_) => "list",
            Arg::Map(_) => "map",
        }
    }

    /// Returns `true` if this value can be part of a key as-is.
    pub fn is_hashable(&self) -> bool {
        self.first_unhashable().is_none()
    }

    /// Recursively converts mutable containers into immutable ones.
    ///
    /// `List` becomes `Tuple`; `Map` becomes `FrozenMap` with its entries
    /// sorted by name. Everything else is returned unchanged.
    pub fn freeze(self) -> Self {
        match self {
            Arg::List(items) | Arg::Tuple(items) => {
                Arg::Tuple(items.into_iter().map(Arg::freeze).collect())
            }
            Arg::Map(entries) | Arg::FrozenMap(entries) => {
                let mut entries: Vec<(String, Arg)> = entries
                    .into_iter()
                    .map(|(name, value)| (name, value.freeze()))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Arg::FrozenMap(entries)
            }
            other => other,
        }
    }

    /// Integer view of the value. Floats convert only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Arg::Int(v) => Some(v),
            Arg::UInt(v) => i64::try_from(v).ok(),
            Arg::Bool(v) => Some(i64::from(v)),
            Arg::Float(v) if v >= -I64_BOUND && v < I64_BOUND => {
                let truncated = v as i64;
                (truncated as f64 == v).then_some(truncated)
            }
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Arg::Int(v) => Some(v as f64),
            Arg::UInt(v) => Some(v as f64),
            Arg::Float(v) => Some(v),
            Arg::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Boolean view; only `Bool` converts.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Arg::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Text view of a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a tuple or list.
    pub fn as_slice(&self) -> Option<&[Arg]> {
        match self {
            Arg::Tuple(items) | Arg::List(items) => Some(items),
            _ => None,
        }
    }

    /// Type name of the first mutable container found, depth first.
    fn first_unhashable(&self) -> Option<&'static str> {
        match self {
            Arg::List(_) | Arg::Map(_) => Some(self.type_name()),
            Arg::Tuple(items) => items.iter().find_map(Arg::first_unhashable),
            Arg::FrozenMap(entries) => entries.iter().find_map(|(_, v)| v.first_unhashable()),
            _ => None,
        }
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Self {
                Arg::Int(i64::from(v))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Self {
                Arg::UInt(u64::from(v))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<usize> for Arg {
    fn from(v: usize) -> Self {
        Arg::UInt(v as u64)
    }
}

impl From<isize> for Arg {
    fn from(v: isize) -> Self {
        Arg::Int(v as i64)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Float(v)
    }
}

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Float(f64::from(v))
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(String::from(v))
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}

impl From<()> for Arg {
    fn from(_: ()) -> Self {
        Arg::Unit
    }
}

/// The arguments of one call: positional values plus keyword values.
///
/// # Examples
///
/// ```
/// use memo_rs::Args;
///
/// let args = Args::new().arg(3).arg("north").kwarg("scale", 2.5);
/// assert_eq!(args.get(0).and_then(|a| a.as_i64()), Some(3));
/// assert_eq!(args.kwarg_value("scale").and_then(|a| a.as_f64()), Some(2.5));
/// assert_eq!(args.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    positional: Vec<Arg>,
    keyword: Vec<(String, Arg)>,
}

impl Args {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an argument list from positional values only.
    pub fn from_positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        Args {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Arg>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Appends a keyword argument. Order does not matter for keying.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Positional argument at `index`.
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.positional.get(index)
    }

    /// Value of the first keyword argument called `name`.
    pub fn kwarg_value(&self, name: &str) -> Option<&Arg> {
        self.keyword
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Positional arguments in call order.
    pub fn positional(&self) -> &[Arg] {
        &self.positional
    }

    /// Keyword arguments in call-site order.
    pub fn keywords(&self) -> &[(String, Arg)] {
        &self.keyword
    }

    /// Total number of arguments, positional and keyword.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    /// Returns `true` if the call has no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Freezes every argument, see [`Arg::freeze`].
    #[must_use]
    pub fn freeze(self) -> Self {
        Args {
            positional: self.positional.into_iter().map(Arg::freeze).collect(),
            keyword: self
                .keyword
                .into_iter()
                .map(|(name, value)| (name, value.freeze()))
                .collect(),
        }
    }
}

impl<T: Into<Arg>> FromIterator<T> for Args {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Args::from_positional(iter)
    }
}

/// One normalized value inside a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    /// The unit value.
    Unit,
    /// Only produced when types are distinguished; otherwise bools become `Int`.
    Bool(bool),
    /// Any integral number, widened so `u64` and integral floats fit.
    Int(i128),
    /// Only produced when types are distinguished; otherwise unsigned values become `Int`.
    UInt(u64),
    /// Float bits after folding `-0.0` and NaN.
    Float(u64),
    /// Text.
    Str(Box<str>),
    /// Raw bytes.
    Bytes(Box<[u8]>),
    /// Normalized tuple elements.
    Tuple(Box<[KeyPart]>),
    /// Normalized map entries, sorted by name.
    Map(Box<[(Box<str>, KeyPart)]>),
}

/// Normalized, hashable form of a call's arguments.
///
/// Two keys are equal exactly when the calls they came from are
/// interchangeable under the codec that built them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    positional: Box<[KeyPart]>,
    keyword: Box<[(Box<str>, KeyPart)]>,
}

impl Key {
    /// Positional parts in call order.
    pub fn positional(&self) -> &[KeyPart] {
        &self.positional
    }

    /// Keyword parts, sorted by name.
    pub fn keywords(&self) -> &[(Box<str>, KeyPart)] {
        &self.keyword
    }
}

/// Normalizes call arguments into [`Key`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyCodec {
    distinguish_types: bool,
}

impl KeyCodec {
    /// Creates a codec. With `distinguish_types`, `1`, `1.0` and `true` get distinct keys.
    pub fn new(distinguish_types: bool) -> Self {
        KeyCodec { distinguish_types }
    }

    /// Returns `true` if this codec keeps numeric types apart.
    pub fn distinguishes_types(&self) -> bool {
        self.distinguish_types
    }

    /// Encodes `args` into a key.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::Unhashable`] if any argument contains a `List` or `Map`.
    /// - [`EncodeError::DuplicateKeyword`] if a keyword name repeats.
    pub fn encode(&self, args: &Args) -> Result<Key, EncodeError> {
        let positional = args
            .positional
            .iter()
            .enumerate()
            .map(|(index, arg)| self.encode_top(arg, || ArgPosition::Positional(index)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut keyword = args
            .keyword
            .iter()
            .map(|(name, arg)| {
                let part = self.encode_top(arg, || ArgPosition::Keyword(name.clone()))?;
                Ok((Box::<str>::from(name.as_str()), part))
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;
        keyword.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = keyword.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(EncodeError::DuplicateKeyword(String::from(&*pair[0].0)));
        }

        Ok(Key {
            positional: positional.into_boxed_slice(),
            keyword: keyword.into_boxed_slice(),
        })
    }

    fn encode_top(
        &self,
        arg: &Arg,
        position: impl FnOnce() -> ArgPosition,
    ) -> Result<KeyPart, EncodeError> {
        self.encode_part(arg)
            .map_err(|type_name| EncodeError::Unhashable {
                position: position(),
                type_name,
            })
    }

    /// Encodes one value; the error is the type name of the first mutable
    /// container found.
    fn encode_part(&self, arg: &Arg) -> Result<KeyPart, &'static str> {
        let part = match *arg {
            Arg::Unit => KeyPart::Unit,
            Arg::Bool(v) if self.distinguish_types => KeyPart::Bool(v),
            Arg::Bool(v) => KeyPart::Int(i128::from(v)),
            Arg::Int(v) => KeyPart::Int(i128::from(v)),
            Arg::UInt(v) if self.distinguish_types => KeyPart::UInt(v),
            Arg::UInt(v) => KeyPart::Int(i128::from(v)),
            Arg::Float(v) => self.encode_float(v),
            Arg::Str(ref s) => KeyPart::Str(Box::from(s.as_str())),
            Arg::Bytes(ref b) => KeyPart::Bytes(Box::from(b.as_slice())),
            Arg::Tuple(ref items) => KeyPart::Tuple(
                items
                    .iter()
                    .map(|item| self.encode_part(item))
                    .collect::<Result<Box<[_]>, _>>()?,
            ),
            Arg::FrozenMap(ref entries) => {
                let mut parts = entries
                    .iter()
                    .map(|(name, value)| {
                        Ok((Box::<str>::from(name.as_str()), self.encode_part(value)?))
                    })
                    .collect::<Result<Vec<(Box<str>, KeyPart)>, &'static str>>()?;
                parts.sort_by(|a, b| a.0.cmp(&b.0));
                KeyPart::Map(parts.into_boxed_slice())
            }
            Arg::List(_) | Arg::Map(_) => return Err(arg.type_name()),
        };
        Ok(part)
    }

    fn encode_float(&self, v: f64) -> KeyPart {
        if v.is_nan() {
            return KeyPart::Float(CANONICAL_NAN);
        }
        if v == 0.0 {
            // -0.0 == 0.0
            return if self.distinguish_types {
                KeyPart::Float(0.0_f64.to_bits())
            } else {
                KeyPart::Int(0)
            };
        }
        if !self.distinguish_types && v > -I128_BOUND && v < I128_BOUND {
            let truncated = v as i128;
            if truncated as f64 == v {
                return KeyPart::Int(truncated);
            }
        }
        KeyPart::Float(v.to_bits())
    }
}
