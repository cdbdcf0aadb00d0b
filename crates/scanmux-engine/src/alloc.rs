//! Channel assignment.
//!
//! Outputs keep their channel for as long as they stay enabled; only
//! enable/disable transitions touch the pool, so resolution changes on a
//! running output never re-route it. Enables take the lowest free
//! compatible channel, walking outputs in ascending id order. With the
//! routing topologies in use an earlier output with several options never
//! steals the only channel a later one could take; if the topology ever
//! stops guaranteeing that, this greedy pass needs replacing with a real
//! matching algorithm.

use crate::device::DeviceConfig;
use crate::transaction::Transaction;
use scanmux_core::{Result, ScanMuxError};
use tracing::debug;

/// Hand out channels for enables, reclaim them for disables, and flag every
/// output whose routing register field has to be rewritten.
pub(crate) fn assign_channels(config: &DeviceConfig, tx: &mut Transaction) -> Result<()> {
    for update in tx.outputs.iter_mut() {
        let enable_changed = update.old.enabled != update.new.enabled;
        let writeback_changed = update.old.feeds_writeback != update.new.feeds_writeback;

        if !enable_changed && !writeback_changed {
            continue;
        }

        update.new.needs_mux_update = true;

        // A writeback toggle re-routes the slot but the channel sticks.
        if !enable_changed {
            continue;
        }

        if !update.new.enabled {
            if let Some(channel) = update.old.assigned_channel {
                tx.pool.unassigned.insert(channel);
            }
            update.new.assigned_channel = None;
            continue;
        }

        let descriptor = config
            .output(update.id)
            .ok_or(ScanMuxError::UnknownOutput(update.id))?;
        let eligible = tx.pool.unassigned.intersection(descriptor.compatible);
        let Some(channel) = eligible.lowest() else {
            return Err(ScanMuxError::NoChannelAvailable(update.id));
        };

        debug!(output = %update.id, %channel, "assigned composition channel");
        update.new.assigned_channel = Some(channel);
        tx.pool.unassigned.remove(channel);
    }

    Ok(())
}
