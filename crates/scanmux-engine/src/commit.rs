//! The commit pipeline.
//!
//! Everything before the state swap may fail and leaves the device
//! untouched; everything after it must not fail and runs against hardware.
//! Commits serialize on the gate, and the gate travels with the job when the
//! hardware phase is handed to the worker, so at most one commit is past its
//! swap at any time.

use crate::device::{CommitFault, DeviceInner, GateGuard};
use crate::program;
use crate::transaction::Transaction;
use crate::worker::{CommitWorker, PendingCommit};
use scanmux_core::{budget, Result, ScanMuxError};
use scanmux_hw::ClockRequest;
use std::sync::Arc;
use tracing::{debug, error};

/// How a checked transaction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Run the hardware phase inline; return once scanout follows the new
    /// state.
    Blocking,
    /// Swap the software state and return; the worker runs the hardware
    /// phase.
    NonBlocking,
    /// Apply a single-plane flip directly, skipping the full hardware
    /// phase. Only transactions that pass the fast-eligibility test may use
    /// this.
    Fast,
}

pub(crate) fn commit(
    inner: &Arc<DeviceInner>,
    worker: &CommitWorker,
    mut tx: Transaction,
    mode: CommitMode,
) -> Result<()> {
    if !tx.is_checked() {
        return Err(ScanMuxError::NotChecked);
    }
    if mode == CommitMode::Fast && !tx.fast_eligible() {
        return Err(ScanMuxError::NotFastEligible);
    }

    let guard = acquire_gate(inner)?;

    // The gate is ours, so nothing can swap state underneath us anymore. A
    // transaction that lost the race to an earlier commit is refused here,
    // before any buffer work happens on its behalf.
    if inner.current.lock().generation != tx.base_generation() {
        return Err(ScanMuxError::Superseded);
    }

    inner.ops.prepare(&tx)?;

    if mode == CommitMode::Fast {
        inner.ops.apply_fast_update(&tx);
        swap_state(inner, &mut tx);
        inner.ops.cleanup(&tx);
        return Ok(());
    }

    if mode == CommitMode::Blocking {
        // Buffer readiness is waited for up front so the post-swap phase
        // never blocks on external fences. The wait may be interrupted; at
        // this point nothing has been swapped, so the commit just unwinds.
        if let Err(err) = inner.ops.wait_for_readiness_interruptible(&tx) {
            inner.ops.cleanup(&tx);
            return Err(err);
        }
    }

    swap_state(inner, &mut tx);

    if mode == CommitMode::Blocking {
        complete_commit(inner, tx, guard);
    } else if let Err(pending) = worker.submit(PendingCommit { tx, guard }) {
        // The worker is gone, which only happens at device teardown. The
        // state is already swapped, so finish inline rather than drop the
        // hardware phase.
        complete_commit(inner, pending.tx, pending.guard);
    }

    Ok(())
}

fn acquire_gate(inner: &DeviceInner) -> Result<GateGuard> {
    match inner.config.lock_timeout {
        Some(timeout) => inner
            .gate
            .try_lock_arc_for(timeout)
            .ok_or(ScanMuxError::Interrupted),
        None => Ok(inner.gate.lock_arc()),
    }
}

/// The point of no return: publish the transaction's resolved state as the
/// committed state and bump the generation.
fn swap_state(inner: &DeviceInner, tx: &mut Transaction) {
    let mut current = inner.current.lock();
    current.generation += 1;
    current.pool = tx.pool.clone();
    current.color = tx.color.clone();
    current.load = tx.load;
    for update in tx.outputs.iter() {
        if let Some(state) = current.outputs.get_mut(&update.id) {
            *state = update.new.clone();
            // The flag drives this commit's routing write; it must not leak
            // into the base of future transactions.
            state.needs_mux_update = false;
        }
    }
    for update in tx.planes.iter() {
        if let Some(state) = current.planes.get_mut(&update.id) {
            *state = update.new;
        }
    }
    tx.committed_generation = Some(current.generation);
    debug!(generation = current.generation, "state swapped");
}

/// The hardware phase. Runs inline for blocking commits and on the worker
/// for non-blocking ones; either way the caller's gate guard is held
/// throughout and released when this returns.
pub(crate) fn complete_commit(inner: &Arc<DeviceInner>, tx: Transaction, mut guard: GateGuard) {
    let generation = tx
        .committed_generation
        .expect("hardware phase before state swap");

    program::mask_underruns(inner.bus.as_ref(), &tx);

    // Modesets run with the clock raised to a safe floor. The previous
    // commit's steady request is withdrawn only after the boost is filed, so
    // the effective rate never dips in between.
    let boost_rate = tx.core_clock_hz().max(budget::MODESET_CLOCK_FLOOR_HZ);
    debug!(rate_hz = boost_rate, "raising core clock for commit");
    let boost = ClockRequest::start(inner.clock.clone(), boost_rate);
    guard.steady_clock.take();

    inner.ops.wait_for_readiness(&tx);

    inner.ops.program_disables(&tx);
    program::program_color_transform(inner.bus.as_ref(), tx.color());
    program::program_routing(inner.bus.as_ref(), &inner.config, &tx);
    inner.ops.program_planes(&tx);
    inner.ops.program_enables(&tx);

    for update in tx.outputs() {
        if !update.new.active {
            continue;
        }
        if let Err(reason) = inner.ops.wait_flip_done(update.id) {
            error!(output = %update.id, %reason, "flip wait failed");
            *inner.last_fault.lock() = Some(CommitFault {
                output: update.id,
                reason,
                generation,
            });
        }
    }

    inner.ops.cleanup(&tx);

    let steady_rate = tx.core_clock_hz();
    debug!(rate_hz = steady_rate, "settling core clock");
    guard.steady_clock = Some(ClockRequest::start(inner.clock.clone(), steady_rate));
    boost.finish();

    inner.ops.commit_done(generation);
    debug!(generation, "commit finished");
}
