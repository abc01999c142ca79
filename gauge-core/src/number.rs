//! Arbitrary precision numbers using dashu
//!
//! Uses dashu-float (DBig) for exact decimal arithmetic. Addition,
//! subtraction and multiplication are exact; division keeps at least 50
//! significant digits. Rounding to a result scale happens once, explicitly,
//! through [`Number::rescale`].

use dashu_float::DBig;
use dashu_int::IBig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Overflow: result too large")]
    Overflow,
}

/// Default precision for calculations (significant decimal digits)
const DEFAULT_PRECISION: usize = 50;

/// Largest absolute exponent accepted by [`Number::checked_pow`]
const MAX_POW_EXPONENT: u32 = 1024;

/// Largest decimal exponent magnitude of a parsed literal or a power
const MAX_EXPONENT: usize = 10_000;

/// Arbitrary precision decimal number
///
/// Optionally carries a display scale (fractional digits). A scaled number
/// always renders exactly that many fractional digits, so `0.0025` rescaled
/// to 6 prints as `0.002500`. Equality and ordering compare the numeric
/// value only.
#[derive(Debug, Clone)]
pub struct Number {
    inner: DBig,
    scale: Option<u32>,
}

impl Number {
    /// Largest scale accepted by [`Number::rescale`]
    pub const MAX_SCALE: u32 = 1_000;

    // ========== Construction ==========

    /// Ensure a DBig has adequate precision for calculations without
    /// dropping any digit it already has
    fn with_work_precision(val: DBig) -> DBig {
        let precision = val.digits().max(DEFAULT_PRECISION);
        val.with_precision(precision).value()
    }

    /// Same value with unlimited precision, so +, - and * stay exact
    fn exact(val: &DBig) -> DBig {
        val.clone().with_precision(0).value()
    }

    fn check_exponent(val: &DBig) -> Result<(), NumberError> {
        if val.repr().exponent().unsigned_abs() > MAX_EXPONENT {
            Err(NumberError::Overflow)
        } else {
            Ok(())
        }
    }

    fn from_inner(inner: DBig) -> Self {
        Self { inner, scale: None }
    }

    /// Create from string representation
    /// Supports: "123", "3.14", "1.5e10", "602214076e15", "-42"
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) {
            return Err(NumberError::ParseError(s.to_string()));
        }

        // Scientific notation with integer mantissa: "602214076e15"
        if (s.contains('e') || s.contains('E')) && !s.contains('.') {
            let s_lower = s.to_lowercase();
            let parts: Vec<&str> = s_lower.split('e').collect();
            if parts.len() == 2 {
                let mantissa: IBig = parts[0].parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;
                let exp: i32 = parts[1].parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;

                let result = DBig::from_parts(mantissa, exp as isize);
                Self::check_exponent(&result)?;
                return Ok(Self::from_inner(Self::with_work_precision(result)));
            }
        }

        let inner: DBig = s.parse()
            .map_err(|_| NumberError::ParseError(s.to_string()))?;
        Self::check_exponent(&inner)?;

        Ok(Self::from_inner(Self::with_work_precision(inner)))
    }

    /// Create from i64 with working precision
    pub fn from_i64(n: i64) -> Self {
        Self::from_inner(Self::with_work_precision(DBig::from(n)))
    }

    /// Create from f64 via its shortest round-trip decimal representation
    pub fn from_f64(f: f64) -> Result<Self, NumberError> {
        if f.is_nan() || f.is_infinite() {
            return Err(NumberError::ParseError(f.to_string()));
        }
        Self::from_str(&f.to_string())
    }

    /// Exact `significand * 10^exponent`
    pub fn from_parts(significand: i64, exponent: i32) -> Self {
        let inner = DBig::from_parts(IBig::from(significand), exponent as isize);
        Self::from_inner(Self::with_work_precision(inner))
    }

    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    pub fn one() -> Self {
        Self::from_i64(1)
    }

    // ========== Predicates ==========

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.inner == DBig::ZERO
    }

    /// Check if value is an integer
    pub fn is_integer(&self) -> bool {
        let floor_val = self.inner.clone().floor();
        self.inner == floor_val
    }

    /// Display scale, if this number has been rescaled
    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    // ========== Basic Arithmetic ==========

    /// Addition
    pub fn add(&self, other: &Self) -> Self {
        let sum = Self::exact(&self.inner) + Self::exact(&other.inner);
        Self::from_inner(Self::with_work_precision(sum))
    }

    /// Subtraction
    pub fn sub(&self, other: &Self) -> Self {
        let difference = Self::exact(&self.inner) - Self::exact(&other.inner);
        Self::from_inner(Self::with_work_precision(difference))
    }

    /// Multiplication
    pub fn mul(&self, other: &Self) -> Self {
        let product = Self::exact(&self.inner) * Self::exact(&other.inner);
        Self::from_inner(Self::with_work_precision(product))
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            Err(NumberError::DivisionByZero)
        } else {
            Ok(Self::from_inner(&self.inner / &other.inner))
        }
    }

    /// Integer power by repeated squaring. Negative exponents divide.
    pub fn checked_pow(&self, exp: i32) -> Result<Self, NumberError> {
        if exp == 0 {
            return Ok(Self::one());
        }
        let mut remaining = exp.unsigned_abs();
        if remaining > MAX_POW_EXPONENT {
            return Err(NumberError::Overflow);
        }

        let mut base = self.clone();
        let mut acc = Self::one();
        while remaining > 0 {
            if remaining & 1 == 1 {
                acc = acc.mul(&base);
                Self::check_exponent(&acc.inner)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul(&base);
                Self::check_exponent(&base.inner)?;
            }
        }

        if exp < 0 {
            Self::one().checked_div(&acc)
        } else {
            Ok(acc)
        }
    }

    /// Negation
    pub fn neg(&self) -> Self {
        Self::from_inner(-&self.inner)
    }

    // ========== Scale ==========

    /// Round half away from zero to `scale` fractional digits.
    ///
    /// The returned number remembers the scale and renders with exactly
    /// that many fractional digits. Fails with `Overflow` past
    /// [`Number::MAX_SCALE`] or when the integer part is too long to render.
    pub fn rescale(&self, scale: u32) -> Result<Self, NumberError> {
        if scale > Self::MAX_SCALE {
            return Err(NumberError::Overflow);
        }
        let integer_digits = self.inner.repr().exponent() + self.inner.digits() as isize;
        if integer_digits > (2 * MAX_EXPONENT) as isize {
            return Err(NumberError::Overflow);
        }

        let units = self.scaled_integer(scale);
        let inner = DBig::from_parts(units, -(scale as isize));
        Ok(Self {
            inner: Self::with_work_precision(inner),
            scale: Some(scale),
        })
    }

    /// `round(self * 10^scale)` as an integer, ties away from zero
    fn scaled_integer(&self, scale: u32) -> IBig {
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let shift = exponent + scale as isize;

        if shift >= 0 {
            return significand * pow10(shift as usize);
        }

        // |significand| < 10^digits <= 10^(-shift - 1), so it rounds to zero
        let digits = significand.to_string().trim_start_matches('-').len();
        if shift.unsigned_abs() > digits {
            return IBig::ZERO;
        }

        let divisor = pow10(shift.unsigned_abs());
        let quotient = &significand / &divisor;
        let remainder = &significand % &divisor;
        let remainder = if remainder < IBig::ZERO { -remainder } else { remainder };

        if remainder * IBig::from(2u8) >= divisor {
            if significand < IBig::ZERO {
                quotient - IBig::ONE
            } else {
                quotient + IBig::ONE
            }
        } else {
            quotient
        }
    }

    /// Try to convert to i64 (integers only)
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        self.scaled_integer(0).try_into().ok()
    }

    // ========== Display ==========

    /// Render with exactly `places` fractional digits (rounded half away from zero)
    fn to_fixed(&self, places: u32) -> String {
        let units = self.scaled_integer(places);
        let negative = units < IBig::ZERO;
        let digits = if negative { (-units).to_string() } else { units.to_string() };
        let sign = if negative { "-" } else { "" };

        if places == 0 {
            return format!("{}{}", sign, digits);
        }

        let places = places as usize;
        let padded = if digits.len() <= places {
            format!("{}{}", "0".repeat(places + 1 - digits.len()), digits)
        } else {
            digits
        };
        let split = padded.len() - places;
        format!("{}{}.{}", sign, &padded[..split], &padded[split..])
    }

    /// Render the exact value without trailing fractional zeros
    pub fn to_plain(&self) -> String {
        let (_, exponent) = self.inner.clone().into_repr().into_parts();
        if exponent >= 0 {
            return self.to_fixed(0);
        }
        let fixed = self.to_fixed(exponent.unsigned_abs() as u32);
        let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

fn pow10(exp: usize) -> IBig {
    IBig::from(10u8).pow(exp)
}

// ========== Trait Implementations ==========

impl Default for Number {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scale {
            Some(scale) => write!(f, "{}", self.to_fixed(scale)),
            None => write!(f, "{}", self.to_plain()),
        }
    }
}

impl std::str::FromStr for Number {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::from_str(s)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept both "1.25" and 1.25 so hand-written JSON stays ergonomic
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::String(s) => Self::from_str(&s).map_err(serde::de::Error::custom),
            serde_json::Value::Number(n) => Self::from_str(&n.to_string()).map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!("expected a decimal, got {}", other))),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // DBig implements PartialOrd, use it and treat None as Equal
        self.inner.partial_cmp(&other.inner).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Anything a caller may hand the engine as a quantity.
///
/// Strings are parsed as decimals, integers convert exactly, and floats go
/// through their shortest decimal representation.
pub trait IntoDecimal {
    fn into_decimal(self) -> Result<Number, NumberError>;
}

impl IntoDecimal for Number {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Ok(self)
    }
}

impl IntoDecimal for &Number {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Ok(self.clone())
    }
}

impl IntoDecimal for &str {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Number::from_str(self)
    }
}

impl IntoDecimal for String {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Number::from_str(&self)
    }
}

impl IntoDecimal for &String {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Number::from_str(self)
    }
}

impl IntoDecimal for f64 {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Number::from_f64(self)
    }
}

macro_rules! int_into_decimal {
    ($($t:ty),*) => {
        $(
            impl IntoDecimal for $t {
                fn into_decimal(self) -> Result<Number, NumberError> {
                    Ok(Number::from_i64(self as i64))
                }
            }
        )*
    };
}

int_into_decimal!(i8, i16, i32, i64, u8, u16, u32);

impl IntoDecimal for u64 {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Number::from_str(&self.to_string())
    }
}

impl IntoDecimal for usize {
    fn into_decimal(self) -> Result<Number, NumberError> {
        Number::from_str(&self.to_string())
    }
}
