//! Color-transform matrices.
//!
//! A 3x3 matrix of [`FixedS31_32`] coefficients in row-major order, applied
//! to RGB pixels on one composition channel. The hardware has a single
//! instance of the transform unit, so ownership is arbitrated elsewhere;
//! this module only deals with the numbers.

use crate::fixed::FixedS31_32;
use serde::{Deserialize, Serialize};

/// One of the three color components, used to address coefficient groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Red,
    Green,
    Blue,
}

impl Component {
    /// All components, in register order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Column index of this component when it is the matrix input.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// A 3x3 color transform, row-major: `out[i] = sum_j m[i*3+j] * in[j]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMatrix {
    coefficients: [FixedS31_32; 9],
}

impl ColorMatrix {
    /// The identity transform.
    pub const IDENTITY: Self = {
        let mut m = [FixedS31_32::ZERO; 9];
        m[0] = FixedS31_32::ONE;
        m[4] = FixedS31_32::ONE;
        m[8] = FixedS31_32::ONE;
        Self { coefficients: m }
    };

    /// Build from raw sign-magnitude bit patterns, row-major.
    pub fn from_raw(raw: [u64; 9]) -> Self {
        Self {
            coefficients: raw.map(FixedS31_32::from_raw),
        }
    }

    /// All nine coefficients, row-major.
    #[inline]
    pub fn coefficients(&self) -> &[FixedS31_32; 9] {
        &self.coefficients
    }

    /// The coefficient applied to input `col` when producing output `row`.
    #[inline]
    pub fn coefficient(&self, row: usize, col: usize) -> FixedS31_32 {
        self.coefficients[row * 3 + col]
    }

    /// The three coefficients multiplying the given input component, in
    /// output order R, G, B. The hardware groups its coefficient registers
    /// this way.
    pub fn input_column(&self, input: Component) -> [FixedS31_32; 3] {
        let j = input.index();
        [
            self.coefficients[j],
            self.coefficients[3 + j],
            self.coefficients[6 + j],
        ]
    }

    /// Index of the first coefficient whose magnitude the hardware format
    /// cannot represent, if any.
    pub fn first_unrepresentable(&self) -> Option<usize> {
        self.coefficients.iter().position(|c| c.exceeds_unity())
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
