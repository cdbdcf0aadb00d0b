//! Per-object state records.
//!
//! Outputs and planes are described by small value types that transactions
//! duplicate, mutate, and swap in atomically. Everything here is plain data;
//! validation and hardware programming live in the engine crate.

use crate::channel::ChannelId;
use crate::color::ColorMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of mux slots on the output side of the composer. Each display
/// output occupies one fixed slot; the routing register holds a two-bit
/// channel field per slot.
pub const MUX_SLOT_COUNT: u8 = 6;

/// A display output (scanout pipe), as named by device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "out{}", self.0)
    }
}

/// A composition plane (layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaneId(pub u32);

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plane{}", self.0)
    }
}

/// A scanout buffer handle. The manager never dereferences it; it only
/// matters whether a plane has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FramebufferId(pub u64);

/// An output's position in the routing register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MuxSlot(u8);

impl MuxSlot {
    /// Create a slot id, if `index` names an existing slot.
    #[inline]
    pub fn new(index: u8) -> Option<Self> {
        (index < MUX_SLOT_COUNT).then_some(Self(index))
    }

    /// The slot's index.
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MuxSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

/// Display timing for an enabled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMode {
    /// Active pixels per line.
    pub hactive: u32,
    /// Active lines per frame.
    pub vactive: u32,
    /// Vertical refresh rate.
    pub refresh_hz: u32,
    /// Pixel clock, including blanking.
    pub pixel_clock_hz: u64,
}

impl OutputMode {
    /// Composer cycles per second needed to keep this output's FIFO fed.
    /// The FIFO drains at pixel rate, so that is also the fill rate floor.
    #[inline]
    pub fn scanout_cycles(&self) -> u64 {
        self.pixel_clock_hz
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.hactive, self.vactive, self.refresh_hz)
    }
}

/// The mutable state of one display output.
///
/// `enabled` tracks whether the output holds a mode (and therefore a
/// composition channel); `active` tracks whether it is currently scanning
/// out. An enabled but inactive output keeps its channel so re-activation
/// never has to re-route the mux.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputState {
    pub enabled: bool,
    pub active: bool,
    pub mode: Option<OutputMode>,
    /// Channel feeding this output, while enabled.
    pub assigned_channel: Option<ChannelId>,
    /// Color transform requested for this output, if any.
    pub color_matrix: Option<ColorMatrix>,
    /// The writeback engine consumes this output's channel directly, so the
    /// mux route to the physical output must stay cut.
    pub feeds_writeback: bool,
    /// Set during validation when the routing register needs reprogramming.
    pub needs_mux_update: bool,
}

impl OutputState {
    /// Scanout-side composer load for this output, in cycles per second.
    #[inline]
    pub fn scanout_cycles(&self) -> u64 {
        self.mode.map_or(0, |m| m.scanout_cycles())
    }
}

/// The mutable state of one composition plane.
///
/// The per-plane bandwidth figures are computed by the plane pipeline when
/// the plane is set up; the manager only sums and bounds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaneState {
    /// Output this plane composites into, if any.
    pub output: Option<OutputId>,
    /// Buffer scanned out by this plane, if any.
    pub framebuffer: Option<FramebufferId>,
    /// Memory bus bandwidth this plane costs, in bytes per second.
    pub membus_load: u64,
    /// Composer time this plane costs, in cycles per second.
    pub compose_cycles: u64,
}

impl PlaneState {
    /// Whether this plane counts towards the load totals. A plane with no
    /// buffer or no output fetches nothing.
    #[inline]
    pub fn contributes_load(&self) -> bool {
        self.framebuffer.is_some() && self.output.is_some()
    }
}
