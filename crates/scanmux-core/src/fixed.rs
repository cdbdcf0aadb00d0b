//! Fixed-point formats used by the color-transform unit.
//!
//! Userspace supplies matrix coefficients as signed 31.32 fixed point in
//! sign-magnitude form; the hardware consumes signed 0.9 fixed point. The
//! narrowing conversion lives here so both the validation and the register
//! programming paths agree on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed 31.32 fixed point, sign-magnitude: bit 63 is the sign, bits 62..32
/// the integer part, bits 31..0 the fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixedS31_32(u64);

impl FixedS31_32 {
    const SIGN_BIT: u64 = 1 << 63;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Exactly 1.0.
    pub const ONE: Self = Self(1 << 32);

    /// Wrap a raw sign-magnitude bit pattern.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw bit pattern.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// The magnitude with the sign bit cleared.
    #[inline]
    pub fn magnitude(self) -> u64 {
        self.0 & !Self::SIGN_BIT
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 & Self::SIGN_BIT != 0
    }

    /// Whether the magnitude is strictly greater than 1.0. Coefficients
    /// beyond that cannot be represented in the hardware format at all;
    /// exactly 1.0 is accepted and saturates during conversion.
    #[inline]
    pub fn exceeds_unity(self) -> bool {
        self.magnitude() > Self::ONE.0
    }

    /// Approximate a float. Magnitudes past the representable range clamp.
    pub fn from_f64(value: f64) -> Self {
        let sign = if value.is_sign_negative() {
            Self::SIGN_BIT
        } else {
            0
        };
        let scaled = (value.abs() * (1u64 << 32) as f64).round();
        let magnitude = if scaled >= (Self::SIGN_BIT - 1) as f64 {
            Self::SIGN_BIT - 1
        } else {
            scaled as u64
        };
        Self(sign | magnitude)
    }

    /// The value as a float, for diagnostics.
    pub fn to_f64(self) -> f64 {
        let magnitude = self.magnitude() as f64 / (1u64 << 32) as f64;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Narrow to the hardware's signed 0.9 format.
    ///
    /// The sign carries over. A magnitude of 1.0 or more saturates to the
    /// largest fractional value; otherwise the nine most significant
    /// fraction bits are kept and the rest truncated.
    pub fn to_s0_9(self) -> FixedS0_9 {
        let mut out = if self.is_negative() {
            FixedS0_9::SIGN_BIT
        } else {
            0
        };
        let integer_bits = self.0 & 0x7FFF_FFFF_0000_0000;
        if integer_bits != 0 {
            out |= FixedS0_9::MAGNITUDE_MASK;
        } else {
            out |= ((self.0 >> 23) as u16) & FixedS0_9::MAGNITUDE_MASK;
        }
        FixedS0_9(out)
    }
}

impl fmt::Display for FixedS31_32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

/// Signed 0.9 fixed point as the color-transform registers take it: bit 9 is
/// the sign, bits 8..0 the fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixedS0_9(u16);

impl FixedS0_9 {
    /// Sign bit of the packed field.
    pub const SIGN_BIT: u16 = 1 << 9;

    /// Mask covering the nine fraction bits.
    pub const MAGNITUDE_MASK: u16 = (1 << 9) - 1;

    /// The packed 10-bit field.
    #[inline]
    pub fn bits(self) -> u16 {
        self.0
    }
}
