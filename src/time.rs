//! Rational time for cycle-based patterns
//!
//! Time is measured in cycles and kept as an exact, arbitrary precision
//! fraction, so nested `fast`/`slow`/`compress` chains never drift or
//! overflow. The cycle helpers (`sam`, `next_sam`, `cycle_pos`,
//! `whole_cycle`) live on [`Fraction`] itself.

use num_bigint::BigInt;
use num_rational::{BigRational, Ratio};
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// Fraction type for rational time values
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fraction(BigRational);

impl Fraction {
    /// Create `n/d`.
    ///
    /// # Panics
    /// Panics when `d` is zero.
    pub fn new(n: i64, d: i64) -> Self {
        Self(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    pub fn from_integer(n: i64) -> Self {
        Self(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    pub fn one() -> Self {
        Self(BigRational::one())
    }

    /// Closest simple fraction to `f` (`4.64` becomes `116/25`, not the
    /// exact binary expansion). Non-finite input maps to zero.
    pub fn from_float(f: f64) -> Self {
        if let Some(r) = Ratio::<i64>::approximate_float(f) {
            return Self(BigRational::new(
                BigInt::from(*r.numer()),
                BigInt::from(*r.denom()),
            ));
        }
        Self(BigRational::from_float(f).unwrap_or_else(BigRational::zero))
    }

    pub fn to_float(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Start of the cycle containing this time.
    pub fn sam(&self) -> Fraction {
        Self(self.0.floor())
    }

    /// Start of the following cycle.
    pub fn next_sam(&self) -> Fraction {
        Self(self.0.floor() + BigRational::one())
    }

    /// Position within the cycle, always in `[0, 1)`.
    pub fn cycle_pos(&self) -> Fraction {
        Self(&self.0 - self.0.floor())
    }

    /// The cycle containing this time, as a span.
    pub fn whole_cycle(&self) -> TimeSpan {
        TimeSpan {
            begin: self.sam(),
            end: self.next_sam(),
        }
    }

    /// Integer floor, saturating at the `i64` bounds.
    pub fn floor_i64(&self) -> i64 {
        self.0.floor().to_integer().to_i64().unwrap_or(if self.0.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Fraction {
        Self(self.0.abs())
    }

    /// `1 / self`.
    ///
    /// # Panics
    /// Panics when `self` is zero.
    pub fn recip(&self) -> Fraction {
        Self(self.0.recip())
    }

    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }
}

macro_rules! impl_fraction_op {
    ($trait:ident, $method:ident) => {
        impl $trait<Fraction> for Fraction {
            type Output = Fraction;
            fn $method(self, other: Fraction) -> Fraction {
                Fraction(self.0.$method(other.0))
            }
        }

        impl<'a> $trait<&'a Fraction> for Fraction {
            type Output = Fraction;
            fn $method(self, other: &'a Fraction) -> Fraction {
                Fraction(self.0.$method(&other.0))
            }
        }

        impl<'a> $trait<Fraction> for &'a Fraction {
            type Output = Fraction;
            fn $method(self, other: Fraction) -> Fraction {
                Fraction((&self.0).$method(other.0))
            }
        }

        impl<'a, 'b> $trait<&'b Fraction> for &'a Fraction {
            type Output = Fraction;
            fn $method(self, other: &'b Fraction) -> Fraction {
                Fraction((&self.0).$method(&other.0))
            }
        }
    };
}

impl_fraction_op!(Add, add);
impl_fraction_op!(Sub, sub);
impl_fraction_op!(Mul, mul);
impl_fraction_op!(Div, div);

impl Neg for Fraction {
    type Output = Fraction;
    fn neg(self) -> Fraction {
        Fraction(-self.0)
    }
}

impl<'a> Neg for &'a Fraction {
    type Output = Fraction;
    fn neg(self) -> Fraction {
        Fraction(-&self.0)
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::from_integer(n)
    }
}

impl From<i32> for Fraction {
    fn from(n: i32) -> Self {
        Fraction::from_integer(n as i64)
    }
}

impl From<usize> for Fraction {
    fn from(n: usize) -> Self {
        Self(BigRational::from_integer(BigInt::from(n)))
    }
}

impl From<(i64, i64)> for Fraction {
    fn from((n, d): (i64, i64)) -> Self {
        Fraction::new(n, d)
    }
}

impl<'a> From<&'a Fraction> for Fraction {
    fn from(f: &'a Fraction) -> Self {
        f.clone()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.denom().is_one() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Error returned when a string is not a fraction, integer or decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFractionError(String);

impl fmt::Display for ParseFractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time value '{}'", self.0)
    }
}

impl std::error::Error for ParseFractionError {}

impl FromStr for Fraction {
    type Err = ParseFractionError;

    /// Accepts `"3"`, `"-1/4"` and decimals such as `"0.25"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFractionError(s.to_string());
        if let Some((n, d)) = s.split_once('/') {
            let n: BigInt = n.trim().parse().map_err(|_| err())?;
            let d: BigInt = d.trim().parse().map_err(|_| err())?;
            if d.is_zero() {
                return Err(err());
            }
            return Ok(Fraction(BigRational::new(n, d)));
        }
        if s.contains('.') {
            let f: f64 = s.parse().map_err(|_| err())?;
            if !f.is_finite() {
                return Err(err());
            }
            return Ok(Fraction::from_float(f));
        }
        let n: BigInt = s.parse().map_err(|_| err())?;
        Ok(Fraction(BigRational::from_integer(n)))
    }
}

impl Serialize for Fraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A half-open interval `[begin, end)` of cycle time
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: Fraction,
    pub end: Fraction,
}

impl TimeSpan {
    pub fn new(begin: impl Into<Fraction>, end: impl Into<Fraction>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    pub fn duration(&self) -> Fraction {
        &self.end - &self.begin
    }

    pub fn midpoint(&self) -> Fraction {
        &self.begin + (&self.end - &self.begin) / Fraction::from_integer(2)
    }

    /// Splits the span at cycle boundaries. The pieces are ordered, each
    /// lies within a single cycle, and together they cover the span
    /// exactly. A zero-width span comes back as itself.
    pub fn span_cycles(&self) -> Vec<TimeSpan> {
        if self.begin == self.end {
            return vec![self.clone()];
        }

        let mut spans = Vec::new();
        let mut begin = self.begin.clone();
        let end_sam = self.end.sam();

        while self.end > begin {
            if begin.sam() == end_sam {
                spans.push(TimeSpan::new(begin, self.end.clone()));
                break;
            }
            let next_begin = begin.next_sam();
            spans.push(TimeSpan::new(begin, next_begin.clone()));
            begin = next_begin;
        }
        spans
    }

    /// Applies `f` to both ends.
    pub fn with_time(&self, f: impl Fn(&Fraction) -> Fraction) -> TimeSpan {
        TimeSpan::new(f(&self.begin), f(&self.end))
    }

    /// Applies `f` to both ends, relative to the cycle of `begin`.
    pub fn with_cycle(&self, f: impl Fn(&Fraction) -> Fraction) -> TimeSpan {
        let sam = self.begin.sam();
        let begin = &sam + f(&(&self.begin - &sam));
        let end = &sam + f(&(&self.end - &sam));
        TimeSpan::new(begin, end)
    }

    /// Intersection of two spans, `None` when they don't meet.
    ///
    /// A zero-width result only counts when it is not sitting on the end
    /// of a non-zero-width input, so spans that merely touch do not
    /// intersect.
    pub fn intersection(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let begin = (&self.begin).max(&other.begin).clone();
        let end = (&self.end).min(&other.end).clone();

        if begin > end {
            return None;
        }
        if begin == end {
            if begin == self.end && self.begin < self.end {
                return None;
            }
            if begin == other.end && other.begin < other.end {
                return None;
            }
        }
        Some(TimeSpan { begin, end })
    }

    /// Like [`TimeSpan::intersection`] for callers that have already
    /// established the spans overlap.
    ///
    /// # Panics
    /// Panics when the spans do not intersect.
    pub fn intersection_or_fail(&self, other: &TimeSpan) -> TimeSpan {
        match self.intersection(other) {
            Some(span) => span,
            None => panic!("TimeSpan {:?} and TimeSpan {:?} do not intersect", self, other),
        }
    }

    /// True when `other` lies entirely within this span.
    pub fn contains_span(&self, other: &TimeSpan) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }
}

impl fmt::Debug for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} → {})", self.begin, self.end)
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
