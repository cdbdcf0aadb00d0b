//! Color-transform arbitration.
//!
//! The composer has exactly one color-transform unit, applied to one
//! channel at a time, and its coefficient registers are S0.9. Enabling a
//! transform therefore claims the unit for the output's channel, and any
//! matrix the hardware cannot approximate is refused outright.

use crate::transaction::Transaction;
use scanmux_core::{Result, ScanMuxError};

/// Resolve who owns the transform unit after this transaction and validate
/// the requested matrix.
pub(crate) fn check_color_transform(tx: &mut Transaction) -> Result<()> {
    // Fold disables in first, so one transaction can move the unit from one
    // output to another.
    for update in tx.outputs.iter() {
        if update.new.color_matrix.is_none() && update.old.color_matrix.is_some() {
            tx.color.owner = None;
        }
    }

    for update in tx.outputs.iter() {
        if update.new.color_matrix == update.old.color_matrix {
            continue;
        }

        let Some(matrix) = update.new.color_matrix else {
            continue;
        };

        let Some(channel) = update.new.assigned_channel else {
            return Err(ScanMuxError::ColorTransformWithoutChannel(update.id));
        };

        if let Some(owner) = tx.color.owner {
            if owner != channel {
                return Err(ScanMuxError::ColorTransformInUse { owner });
            }
        }

        if let Some(index) = matrix.first_unrepresentable() {
            return Err(ScanMuxError::CoefficientUnrepresentable { index });
        }

        tx.color.owner = Some(channel);
        tx.color.matrix = matrix;
    }

    Ok(())
}
