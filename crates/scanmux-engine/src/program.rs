//! Register programming for the hardware phase.
//!
//! These writes happen between the disable and enable hooks of a commit,
//! with the committed software state already swapped in. They only consume
//! the transaction's new side, except underrun masking, which also covers
//! channels being torn down.

use crate::device::DeviceConfig;
use crate::state::ColorTransformState;
use crate::transaction::Transaction;
use scanmux_core::{ChannelId, Component};
use scanmux_hw::regs::{self, Register};
use scanmux_hw::RegisterBus;

/// Stop underrun reporting on every channel this commit touches; the FIFOs
/// run dry legitimately while they are reprogrammed.
pub(crate) fn mask_underruns(bus: &dyn RegisterBus, tx: &Transaction) {
    for update in tx.outputs() {
        let channel = update.new.assigned_channel.or(update.old.assigned_channel);
        if let Some(channel) = channel {
            bus.update(Register::IrqMask, regs::underrun_bit(channel), 0);
        }
    }
}

/// Write the coefficient registers when the unit is owned, then the control
/// register either way; a control field of zero keeps the unit off no
/// matter what the coefficient registers hold.
pub(crate) fn program_color_transform(bus: &dyn RegisterBus, color: &ColorTransformState) {
    if color.owner.is_some() {
        for component in Component::ALL {
            let column = color.matrix.input_column(component);
            let mut value = 0;
            for (row, coefficient) in column.iter().enumerate() {
                let lane = regs::color_coef_lane(row);
                value = lane.insert(value, u32::from(coefficient.to_s0_9().bits()));
            }
            bus.write(Register::color_coef(component), value);
        }
    }

    let field = color.owner.map_or(0, ChannelId::fifo_field);
    bus.write(Register::ColorCtl, regs::COLOR_CTL_CHANNEL.insert(0, field));
}

/// Rewrite the slot fields of outputs whose routing changed. A slot feeding
/// the writeback engine reads as disconnected even while its output owns a
/// channel; the writeback consumer taps the channel directly.
pub(crate) fn program_routing(bus: &dyn RegisterBus, config: &DeviceConfig, tx: &Transaction) {
    for update in tx.outputs() {
        if !update.new.needs_mux_update {
            continue;
        }

        let Some(descriptor) = config.output(update.id) else {
            continue;
        };

        let field = regs::mux_slot_field(descriptor.slot);
        let value = match update.new.assigned_channel {
            Some(channel) if !update.new.feeds_writeback => u32::from(channel.index()),
            _ => regs::MUX_FIELD_DISABLED,
        };
        bus.update(Register::MuxRoute, field.mask(), field.insert(0, value));
    }
}
