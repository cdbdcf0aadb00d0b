//! Hooks into the surrounding display stack.
//!
//! The engine owns validation, serialization and the shared-resource
//! registers; everything specific to encoders, plane pipelines and buffer
//! lifetimes is behind [`ModesetOps`]. Every method has a no-op default, so
//! the engine runs self-contained in tests and simulation.

use crate::transaction::Transaction;
use scanmux_core::{OutputId, Result};

/// Driver hooks called around validation and during the hardware phase of a
/// commit. Methods are invoked in the documented order; the hardware-phase
/// ones run on the commit worker for non-blocking commits.
#[allow(unused_variables)]
pub trait ModesetOps: Send + Sync {
    /// Validate everything the engine does not know about: modes against
    /// encoder limits, plane scaling, format support. Runs after channel
    /// assignment, with no hardware touched yet.
    fn check_consistency(&self, tx: &Transaction) -> Result<()> {
        Ok(())
    }

    /// Pin buffers and allocate whatever the hardware phase will need.
    /// Failing here aborts the commit cleanly.
    fn prepare(&self, tx: &Transaction) -> Result<()> {
        Ok(())
    }

    /// Interruptible wait for the staged buffers to become ready. Only
    /// called for blocking commits, before the point of no return.
    fn wait_for_readiness_interruptible(&self, tx: &Transaction) -> Result<()> {
        Ok(())
    }

    /// Uninterruptible wait for buffer readiness and earlier commits this
    /// one depends on. First step of the hardware phase.
    fn wait_for_readiness(&self, tx: &Transaction) {}

    /// Quiesce outputs being disabled or re-routed.
    fn program_disables(&self, tx: &Transaction) {}

    /// Push the staged plane configuration.
    fn program_planes(&self, tx: &Transaction) {}

    /// Light up outputs being enabled.
    fn program_enables(&self, tx: &Transaction) {}

    /// Block until `output` has scanned out the new configuration. An error
    /// is recorded as a fault against the commit, not returned to the
    /// caller; the commit is past the point of no return.
    fn wait_flip_done(&self, output: OutputId) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Apply a fast-path update: a buffer flip on one plane, no routing or
    /// clock changes.
    fn apply_fast_update(&self, tx: &Transaction) {}

    /// Release buffers and bookkeeping from before the swap.
    fn cleanup(&self, tx: &Transaction) {}

    /// The commit is fully finished and the gate is about to be released.
    fn commit_done(&self, generation: u64) {}
}

/// Ops implementation that does nothing; enough for running the engine
/// against the soft register block.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOps;

impl ModesetOps for NoopOps {}
