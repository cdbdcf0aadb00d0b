//! ScanMux Core - Foundation types for the display-engine state manager
//!
//! This crate provides the fundamental types used throughout ScanMux:
//! - Composition channel ids and bitmask pools
//! - Fixed-point scalars (S31.32 source, S0.9 hardware) and color matrices
//! - Per-output and per-plane configuration records
//! - The shared error type

pub mod channel;
pub mod color;
pub mod error;
pub mod fixed;
pub mod state;

pub use channel::{ChannelId, ChannelMask, CHANNEL_COUNT};
pub use color::{ColorMatrix, Component};
pub use error::{Result, ScanMuxError};
pub use fixed::{FixedS0_9, FixedS31_32};
pub use state::{
    FramebufferId, MuxSlot, OutputId, OutputMode, OutputState, PlaneId, PlaneState,
    MUX_SLOT_COUNT,
};

/// Budget constants derived from the composition hardware.
pub mod budget {
    /// Ceiling on aggregate memory-bus read load, in bytes per second.
    /// The bus tops out at 2 GiB/s; the margin leaves room for the other
    /// memory clients sharing it.
    pub const MEMBUS_CEILING: u64 = 1024 * 1024 * 1024 + 512 * 1024 * 1024;

    /// Ceiling on aggregate composer cycles per second. The composer clock
    /// nominally runs at 250 MHz; 240M leaves a safety margin.
    pub const COMPOSE_CYCLE_CEILING: u64 = 240_000_000;

    /// Core clock floor held for the duration of a modeset, in Hz.
    pub const MODESET_CLOCK_FLOOR_HZ: u64 = 500_000_000;
}
