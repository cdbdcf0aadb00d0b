//! Shared-resource records and the committed device state.
//!
//! Three records describe everything outputs contend for: the channel pool,
//! the color-transform unit, and the load totals that drive the core clock.
//! Transactions duplicate these records up front, validate against the
//! copies, and swap them back in at commit time.

use scanmux_core::{
    ChannelId, ChannelMask, ColorMatrix, OutputId, OutputState, PlaneId, PlaneState,
};
use serde::Serialize;
use std::collections::HashMap;

/// Ownership of the composition channels, plus the scanout-side figures the
/// core clock computation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelPoolState {
    /// Channels not owned by any enabled output.
    pub unassigned: ChannelMask,
    /// Outputs currently scanning out.
    pub active_outputs: u32,
    /// Summed scanout-side composer load of the active outputs, in cycles
    /// per second.
    pub scanout_cycles: u64,
    /// Core clock rate this state needs, in Hz.
    pub core_clock_hz: u64,
}

impl Default for ChannelPoolState {
    fn default() -> Self {
        Self {
            unassigned: ChannelMask::ALL,
            active_outputs: 0,
            scanout_cycles: 0,
            core_clock_hz: 0,
        }
    }
}

/// Ownership of the single color-transform unit.
///
/// When `owner` is `None` the unit is off; the matrix then keeps whatever
/// was last programmed, which is fine because the control register gates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorTransformState {
    pub owner: Option<ChannelId>,
    pub matrix: ColorMatrix,
}

/// Summed plane load across the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadTrackerState {
    /// Memory bus bandwidth, bytes per second.
    pub membus_bytes: u64,
    /// Composer time, cycles per second.
    pub compose_cycles: u64,
}

/// The committed state of the whole device.
#[derive(Debug, Clone, Default)]
pub struct CurrentState {
    /// Bumped on every swap; transactions built against an older generation
    /// are refused at commit.
    pub generation: u64,
    pub pool: ChannelPoolState,
    pub color: ColorTransformState,
    pub load: LoadTrackerState,
    pub outputs: HashMap<OutputId, OutputState>,
    pub planes: HashMap<PlaneId, PlaneState>,
}
