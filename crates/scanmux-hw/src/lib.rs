//! ScanMux Hardware - Register map and access traits for the composer
//!
//! This crate owns everything that touches composer registers and the core
//! clock:
//!
//! - The register map and field packing helpers
//! - The [`RegisterBus`] trait the engine programs through, with a soft
//!   implementation for tests and simulation
//! - The [`CoreClock`] trait and RAII rate requests

pub mod bus;
pub mod clock;
pub mod regs;

pub use bus::{RegisterBus, SoftBus};
pub use clock::{ClockRequest, CoreClock, RequestId, SoftClock};
pub use regs::{Field, Register, MUX_FIELD_DISABLED};
