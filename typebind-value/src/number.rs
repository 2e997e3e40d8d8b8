use core::fmt;

#[derive(Clone, Copy, PartialEq)]
enum Repr {
    I64(i64),
    U64(u64),
    F64(f64),
}

/// A JSON number that remembers whether it was an integer or a float.
///
/// Integers are stored canonically: anything that fits in an `i64` is kept
/// signed, only larger values use the unsigned slot. Floats are always finite.
#[derive(Clone, Copy, PartialEq)]
pub struct Number(Repr);

/// The representation a [`Number`] was built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NumberType {
    /// Signed 64-bit integer
    I64,
    /// Unsigned 64-bit integer larger than `i64::MAX`
    U64,
    /// Finite 64-bit float
    F64,
}

impl Number {
    /// Creates a number from an i64.
    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        Number(Repr::I64(v))
    }

    /// Creates a number from a u64.
    #[must_use]
    pub fn from_u64(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Number(Repr::I64(i)),
            Err(_) => Number(Repr::U64(v)),
        }
    }

    /// Creates a number from an f64.
    ///
    /// Returns `None` if the value is NaN or infinite.
    #[must_use]
    pub fn from_f64(v: f64) -> Option<Self> {
        v.is_finite().then_some(Number(Repr::F64(v)))
    }

    /// Which representation this number uses.
    pub fn number_type(&self) -> NumberType {
        match self.0 {
            Repr::I64(_) => NumberType::I64,
            Repr::U64(_) => NumberType::U64,
            Repr::F64(_) => NumberType::F64,
        }
    }

    /// Returns true if this number was written as an integer.
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Returns true if this number was written as a float.
    pub fn is_float(&self) -> bool {
        matches!(self.0, Repr::F64(_))
    }

    /// Converts to i64 if this is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            Repr::I64(v) => Some(v),
            Repr::U64(_) | Repr::F64(_) => None,
        }
    }

    /// Converts to u64 if this is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self.0 {
            Repr::I64(v) => u64::try_from(v).ok(),
            Repr::U64(v) => Some(v),
            Repr::F64(_) => None,
        }
    }

    /// Converts to f64, possibly losing precision for large integers.
    pub fn as_f64(&self) -> f64 {
        match self.0 {
            Repr::I64(v) => v as f64,
            Repr::U64(v) => v as f64,
            Repr::F64(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::I64(v) => write!(f, "{v}"),
            Repr::U64(v) => write!(f, "{v}"),
            // Debug keeps the fractional part on integral floats ("1.0")
            Repr::F64(v) => write!(f, "{v:?}"),
        }
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

macro_rules! impl_from_int {
    ($($t:ty => $method:ident),* $(,)?) => {
        $(
            impl From<$t> for Number {
                fn from(v: $t) -> Self {
                    Self::$method(v as _)
                }
            }
        )*
    };
}

impl_from_int! {
    i8 => from_i64,
    i16 => from_i64,
    i32 => from_i64,
    i64 => from_i64,
    isize => from_i64,
    u8 => from_i64,
    u16 => from_i64,
    u32 => from_i64,
    u64 => from_u64,
    usize => from_u64,
}

impl TryFrom<f32> for Number {
    type Error = NonFiniteFloat;

    fn try_from(v: f32) -> Result<Self, Self::Error> {
        Self::from_f64(f64::from(v)).ok_or(NonFiniteFloat)
    }
}

impl TryFrom<f64> for Number {
    type Error = NonFiniteFloat;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::from_f64(v).ok_or(NonFiniteFloat)
    }
}

/// Returned when converting NaN or an infinity into a [`Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonFiniteFloat;

impl fmt::Display for NonFiniteFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("non-finite number cannot be represented in JSON")
    }
}

impl core::error::Error for NonFiniteFloat {}
