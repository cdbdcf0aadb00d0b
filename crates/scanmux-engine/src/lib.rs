//! ScanMux Engine - Atomic state transactions for the composer
//!
//! The engine arbitrates the three shared pieces of the scanout hardware:
//! the pool of composition channels, the single color-transform unit, and
//! the core clock. Display updates are staged on a [`Transaction`], checked
//! as a whole against the committed state, and then either rejected or
//! applied atomically:
//!
//! - Validation never touches hardware and leaves the device unchanged
//! - Commits serialize on a gate; the hardware phase can run on a worker
//!   thread while the next transaction is being prepared
//! - Register programming goes through `scanmux-hw`, so the whole pipeline
//!   runs unmodified against the soft register block

mod alloc;
mod clock;
mod color;
mod load;
mod program;
mod worker;

pub mod commit;
pub mod device;
pub mod ops;
pub mod state;
pub mod transaction;

pub use commit::CommitMode;
pub use device::{
    CommitFault, Device, DeviceConfig, DeviceStatus, OutputDescriptor, OutputSummary,
    PlaneSummary,
};
pub use ops::{ModesetOps, NoopOps};
pub use state::{ChannelPoolState, ColorTransformState, CurrentState, LoadTrackerState};
pub use transaction::{OutputUpdate, PlaneUpdate, Transaction};
