use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use twofloat::TwoFloat;

/// Arithmetic the simplex kernel needs, implemented for plain `f64` and
/// for double-double `TwoFloat`. The extended build stands in for the
/// native optimizer's quad-precision factorization.
pub trait Scalar:
    Copy
    + PartialOrd
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;

    fn zero() -> Self {
        Self::from_f64(0.0)
    }

    fn abs(self) -> Self {
        if self < Self::zero() { -self } else { self }
    }
}

impl Scalar for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl Scalar for TwoFloat {
    fn from_f64(v: f64) -> Self {
        TwoFloat::from(v)
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}
