//! Plane load accounting.
//!
//! Every plane with a buffer costs memory-bus bandwidth and composer time.
//! The totals are kept incrementally: a transaction subtracts the old cost
//! of each plane it touches and adds the new one, so the sums always match
//! the committed configuration without rescanning every plane.

use crate::transaction::Transaction;
use scanmux_core::{budget, Result, ScanMuxError};

/// Roll the staged plane changes into the load totals and, when enforcement
/// is on, bound them against the hardware budgets.
///
/// The totals are updated even with enforcement off; they feed the core
/// clock computation either way.
pub(crate) fn check_load(tx: &mut Transaction, enforce: bool) -> Result<()> {
    for update in tx.planes.iter() {
        if update.old.contributes_load() {
            tx.load.membus_bytes -= update.old.membus_load;
            tx.load.compose_cycles -= update.old.compose_cycles;
        }

        if update.new.contributes_load() {
            tx.load.membus_bytes += update.new.membus_load;
            tx.load.compose_cycles += update.new.compose_cycles;
        }
    }

    if !enforce {
        return Ok(());
    }

    if tx.load.membus_bytes > budget::MEMBUS_CEILING {
        return Err(ScanMuxError::MembusOverBudget {
            load: tx.load.membus_bytes,
            budget: budget::MEMBUS_CEILING,
        });
    }

    if tx.load.compose_cycles > budget::COMPOSE_CYCLE_CEILING {
        return Err(ScanMuxError::ComposerOverBudget {
            load: tx.load.compose_cycles,
            budget: budget::COMPOSE_CYCLE_CEILING,
        });
    }

    Ok(())
}
