//! Core clock demand.
//!
//! The clock has to cover the busier of two sides: the scanout FIFOs,
//! which drain at the summed pixel rate of the active outputs, and the
//! compose side working through the planes. With several outputs the
//! composer overlaps channel work, so a smaller share of the summed plane
//! cost sets the compose floor.

use crate::transaction::Transaction;
use tracing::debug;

/// Roll the staged activity changes into the scanout totals and derive the
/// clock rate this configuration needs.
pub(crate) fn update_core_clock(tx: &mut Transaction) {
    for update in tx.outputs.iter() {
        if update.old.active {
            tx.pool.active_outputs -= 1;
            tx.pool.scanout_cycles -= update.old.scanout_cycles();
        }

        if update.new.active {
            tx.pool.active_outputs += 1;
            tx.pool.scanout_cycles += update.new.scanout_cycles();
        }
    }

    let scanout = tx.pool.scanout_cycles;
    let compose = if tx.pool.active_outputs > 1 {
        tx.load.compose_cycles * 40 / 100
    } else {
        tx.load.compose_cycles * 60 / 100
    };

    tx.pool.core_clock_hz = scanout.max(compose);
    debug!(
        outputs = tx.pool.active_outputs,
        scanout, compose, rate = tx.pool.core_clock_hz,
        "core clock demand"
    );
}
