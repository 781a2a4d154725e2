//! 18-decimal fixed-point fractions.
//!
//! Quorum fractions are stored as integers scaled by `10^18`, so `0.51` is
//! `510_000_000_000_000_000`. All arithmetic is integer-only and rounds up
//! deterministically where a count is derived from a fraction.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fraction in `[0, 1]` with 18 decimals of precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fraction(u128);

impl Fraction {
    /// Scale factor: `1.0` as a raw value.
    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(Self::SCALE);

    /// Build from a raw scaled value, rejecting anything above one.
    pub fn from_raw(raw: u128) -> Result<Self, TypesError> {
        if raw > Self::SCALE {
            return Err(TypesError::FractionOutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// Build from basis points (`5100` = 0.51).
    pub fn from_bps(bps: u32) -> Result<Self, TypesError> {
        Self::from_raw(bps as u128 * (Self::SCALE / 10_000))
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    /// `ceil(count * self)` computed without floating point.
    pub fn ceil_mul(&self, count: u64) -> u64 {
        let product = count as u128 * self.0;
        // count <= u64::MAX and self <= 1, so the quotient fits in u64.
        product.div_ceil(Self::SCALE) as u64
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        let digits = format!("{frac:018}");
        let trimmed = digits.trim_end_matches('0');
        if trimmed.is_empty() {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{trimmed}")
        }
    }
}
