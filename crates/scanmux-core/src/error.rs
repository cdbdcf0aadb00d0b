//! Error types for ScanMux.

use crate::channel::ChannelId;
use crate::state::{OutputId, PlaneId};
use thiserror::Error;

/// Main error type for ScanMux operations.
#[derive(Error, Debug)]
pub enum ScanMuxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation: no free channel is compatible with an output being enabled.
    #[error("no compatible composition channel free for {0}")]
    NoChannelAvailable(OutputId),

    /// Validation: a second output asked for the single color-transform unit.
    #[error("color transform already claimed for {owner}")]
    ColorTransformInUse { owner: ChannelId },

    /// Validation: a matrix coefficient is outside what the hardware format
    /// can approximate.
    #[error("color coefficient {index} has magnitude above 1.0")]
    CoefficientUnrepresentable { index: usize },

    /// Validation: a color transform was requested on an output that has no
    /// channel.
    #[error("color transform requested on {0} which has no channel")]
    ColorTransformWithoutChannel(OutputId),

    /// Validation: the summed memory bus load went over the ceiling.
    #[error("memory bus load {load} B/s exceeds budget {budget} B/s")]
    MembusOverBudget { load: u64, budget: u64 },

    /// Validation: the summed composer load went over the ceiling.
    #[error("composer load {load} cycles/s exceeds budget {budget} cycles/s")]
    ComposerOverBudget { load: u64, budget: u64 },

    /// External consistency check rejected the configuration.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),

    /// Buffer preparation failed before the point of no return.
    #[error("buffer preparation failed: {0}")]
    PrepareFailed(String),

    /// The wait for the commit gate was interrupted or timed out.
    #[error("interrupted while waiting for an earlier commit")]
    Interrupted,

    /// Another transaction committed after this one was built; its view of
    /// the shared records is stale.
    #[error("transaction superseded by a newer commit")]
    Superseded,

    /// A transaction was committed without passing validation first.
    #[error("transaction was not validated")]
    NotChecked,

    /// A fast commit was requested for an update the fast path cannot take.
    #[error("update does not qualify for the fast path")]
    NotFastEligible,

    /// A transaction named an output the device does not have.
    #[error("unknown output: {0}")]
    UnknownOutput(OutputId),

    /// A transaction named a plane the device does not have.
    #[error("unknown plane: {0}")]
    UnknownPlane(PlaneId),

    /// Device configuration is malformed.
    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for ScanMux operations.
pub type Result<T> = std::result::Result<T, ScanMuxError>;
