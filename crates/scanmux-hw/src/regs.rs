//! Composer register map.
//!
//! A small block of 32-bit registers controls routing, interrupt masking and
//! the color-transform unit. Layout:
//!
//! - `MuxRoute` holds a two-bit channel field per output slot; the value 3
//!   means the slot is disconnected.
//! - `IrqMask` holds one underrun-report bit per channel; clearing a bit
//!   masks underrun reporting for that channel.
//! - `ColorCtl` carries the 1-based id of the channel the color transform
//!   applies to, 0 when the unit is off.
//! - One `ColorCoef*` register per input component packs three S0.9
//!   coefficients, one per output lane.

use scanmux_core::{ChannelId, Component, MuxSlot, CHANNEL_COUNT};

/// A register in the composer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    MuxRoute,
    IrqMask,
    ColorCtl,
    ColorCoefRed,
    ColorCoefGreen,
    ColorCoefBlue,
}

impl Register {
    /// Byte offset within the register block.
    pub fn offset(self) -> u32 {
        match self {
            Self::MuxRoute => 0x000,
            Self::IrqMask => 0x004,
            Self::ColorCtl => 0x010,
            Self::ColorCoefRed => 0x014,
            Self::ColorCoefGreen => 0x018,
            Self::ColorCoefBlue => 0x01c,
        }
    }

    /// Value the register holds after reset.
    pub fn reset_value(self) -> u32 {
        match self {
            // Every slot disconnected.
            Self::MuxRoute => {
                let mut v = 0;
                for slot in 0..scanmux_core::MUX_SLOT_COUNT {
                    v |= MUX_FIELD_DISABLED << (2 * slot);
                }
                v
            }
            // Underrun reporting armed on every channel.
            Self::IrqMask => (1 << CHANNEL_COUNT) - 1,
            Self::ColorCtl => 0,
            Self::ColorCoefRed | Self::ColorCoefGreen | Self::ColorCoefBlue => 0,
        }
    }

    /// The coefficient register for one input component.
    pub fn color_coef(input: Component) -> Self {
        match input {
            Component::Red => Self::ColorCoefRed,
            Component::Green => Self::ColorCoefGreen,
            Component::Blue => Self::ColorCoefBlue,
        }
    }
}

/// A contiguous bit field within a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub shift: u32,
    pub width: u32,
}

impl Field {
    pub const fn new(shift: u32, width: u32) -> Self {
        Self { shift, width }
    }

    /// Mask of the field in register position.
    #[inline]
    pub const fn mask(self) -> u32 {
        ((1 << self.width) - 1) << self.shift
    }

    /// Place `value` into the field, replacing it in `reg`.
    #[inline]
    pub const fn insert(self, reg: u32, value: u32) -> u32 {
        (reg & !self.mask()) | ((value << self.shift) & self.mask())
    }

    /// Read the field out of `reg`.
    #[inline]
    pub const fn extract(self, reg: u32) -> u32 {
        (reg & self.mask()) >> self.shift
    }
}

/// `MuxRoute` field value for a disconnected slot.
pub const MUX_FIELD_DISABLED: u32 = 3;

/// The `MuxRoute` field for one output slot.
pub fn mux_slot_field(slot: MuxSlot) -> Field {
    Field::new(2 * u32::from(slot.index()), 2)
}

/// The channel-id field of `ColorCtl`; holds `ChannelId::fifo_field`, 0 off.
pub const COLOR_CTL_CHANNEL: Field = Field::new(0, 2);

/// The lane within a `ColorCoef*` register for one output row (R, G, B).
pub fn color_coef_lane(output_row: usize) -> Field {
    Field::new(10 * output_row as u32, 10)
}

/// `IrqMask` bit arming underrun reporting for `channel`.
pub fn underrun_bit(channel: ChannelId) -> u32 {
    1 << channel.index()
}
