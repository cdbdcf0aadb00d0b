//! Channel pool behavior across whole transactions.
//!
//! Every test drives the public device API end to end: stage, check,
//! commit, then look at the committed state and the routing register.

use crate::harness::{self, descriptor, MODE_1080P};
use proptest::prelude::*;
use scanmux_core::{ChannelId, ChannelMask, MuxSlot, OutputId, PlaneId, ScanMuxError};
use scanmux_engine::{CommitMode, DeviceConfig};
use scanmux_hw::{regs, Field, Register, RegisterBus, MUX_FIELD_DISABLED};

fn ch(index: u8) -> ChannelId {
    ChannelId::new(index).unwrap()
}

fn slot_field(slot: u8) -> Field {
    regs::mux_slot_field(MuxSlot::new(slot).unwrap())
}

// ── Assignment within one transaction ──────────────────────────

#[test]
fn first_enable_takes_channel_zero() {
    let rig = harness::rig();
    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(0), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let status = rig.device.status();
    assert_eq!(status.outputs[0].channel, Some(ch(0)));
    assert_eq!(status.unassigned_channels, ChannelMask::from_bits(0b110));
}

#[test]
fn subset_chain_assigns_each_output_its_own_channel() {
    // out0 can only use channel 0, out1 channels 0-1, out2 anything. Taking
    // the lowest free channel in ascending output order is the only
    // assignment that satisfies all three at once.
    let config = DeviceConfig {
        outputs: vec![
            descriptor(0, 0, 0b001),
            descriptor(1, 1, 0b011),
            descriptor(2, 2, 0b111),
        ],
        ..Default::default()
    };
    let rig = harness::rig_with(config);

    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(0), MODE_1080P).unwrap();
    tx.enable_output(OutputId(1), MODE_1080P).unwrap();
    tx.enable_output(OutputId(2), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let status = rig.device.status();
    assert_eq!(status.outputs[0].channel, Some(ch(0)));
    assert_eq!(status.outputs[1].channel, Some(ch(1)));
    assert_eq!(status.outputs[2].channel, Some(ch(2)));
    assert!(status.unassigned_channels.is_empty());
}

#[test]
fn staging_order_does_not_change_the_assignment() {
    let config = DeviceConfig {
        outputs: vec![
            descriptor(0, 0, 0b001),
            descriptor(1, 1, 0b011),
            descriptor(2, 2, 0b111),
        ],
        ..Default::default()
    };
    let rig = harness::rig_with(config);

    // Stage in descending id order; validation still walks ascending.
    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(2), MODE_1080P).unwrap();
    tx.enable_output(OutputId(1), MODE_1080P).unwrap();
    tx.enable_output(OutputId(0), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let status = rig.device.status();
    assert_eq!(status.outputs[0].channel, Some(ch(0)));
    assert_eq!(status.outputs[1].channel, Some(ch(1)));
    assert_eq!(status.outputs[2].channel, Some(ch(2)));
}

#[test]
fn enable_is_refused_when_pool_runs_dry() {
    let config = DeviceConfig {
        outputs: vec![
            descriptor(0, 0, 0b111),
            descriptor(1, 1, 0b111),
            descriptor(2, 2, 0b111),
            descriptor(3, 3, 0b111),
        ],
        ..Default::default()
    };
    let rig = harness::rig_with(config);

    let mut tx = rig.device.transaction();
    for id in 0..4 {
        tx.enable_output(OutputId(id), MODE_1080P).unwrap();
    }
    let err = rig.device.check(&mut tx).unwrap_err();
    assert!(matches!(err, ScanMuxError::NoChannelAvailable(OutputId(3))));

    // The device saw nothing of the failed transaction.
    let status = rig.device.status();
    assert_eq!(status.generation, 0);
    assert_eq!(status.unassigned_channels, ChannelMask::ALL);
}

// ── Release and reuse across transactions ──────────────────────

#[test]
fn freed_channel_serves_the_next_transaction() {
    let rig = harness::rig();
    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(0), MODE_1080P).unwrap();
    tx.enable_output(OutputId(1), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let mut tx = rig.device.transaction();
    tx.disable_output(OutputId(0)).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();
    assert_eq!(
        rig.device.status().unassigned_channels,
        ChannelMask::from_bits(0b101)
    );

    // ch0 is the lowest free channel again, so out2 gets it.
    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(2), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();
    assert_eq!(rig.device.status().outputs[2].channel, Some(ch(0)));
}

#[test]
fn handoff_within_one_transaction() {
    // Both outputs can only live on channel 0, so the second can only come
    // up in the same transaction that takes the first down.
    let config = DeviceConfig {
        outputs: vec![descriptor(0, 0, 0b001), descriptor(1, 1, 0b001)],
        planes: vec![PlaneId(0)],
        ..Default::default()
    };
    let rig = harness::rig_with(config);

    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(0), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let mut tx = rig.device.transaction();
    tx.disable_output(OutputId(0)).unwrap();
    tx.enable_output(OutputId(1), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let status = rig.device.status();
    assert_eq!(status.outputs[0].channel, None);
    assert_eq!(status.outputs[1].channel, Some(ch(0)));

    let route = rig.bus.read(Register::MuxRoute);
    assert_eq!(slot_field(0).extract(route), MUX_FIELD_DISABLED);
    assert_eq!(slot_field(1).extract(route), 0);
}

#[test]
fn deactivated_output_keeps_its_channel() {
    let rig = harness::rig();
    let mut tx = rig.device.transaction();
    tx.enable_output(OutputId(0), MODE_1080P).unwrap();
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    // active off, enabled still on: a paused output must not lose its
    // channel, or resuming could fail or reshuffle the mux.
    let mut tx = rig.device.transaction();
    tx.output_mut(OutputId(0)).unwrap().active = false;
    rig.device.check(&mut tx).unwrap();
    rig.device.commit(tx, CommitMode::Blocking).unwrap();

    let status = rig.device.status();
    assert_eq!(status.outputs[0].channel, Some(ch(0)));
    assert!(!status.outputs[0].active);
    assert_eq!(status.active_outputs, 0);
    assert_eq!(status.unassigned_channels, ChannelMask::from_bits(0b110));
}

// ── Pool invariant under arbitrary enable/disable traffic ──────

proptest! {
    #[test]
    fn pool_always_complements_held_channels(
        steps in proptest::collection::vec((0u32..3, proptest::bool::ANY), 1..12)
    ) {
        let rig = harness::rig();
        for (id, enable) in steps {
            let mut tx = rig.device.transaction();
            if enable {
                tx.enable_output(OutputId(id), MODE_1080P).unwrap();
            } else {
                tx.disable_output(OutputId(id)).unwrap();
            }
            rig.device.check(&mut tx).unwrap();
            rig.device.commit(tx, CommitMode::Blocking).unwrap();

            let status = rig.device.status();
            let mut held = ChannelMask::EMPTY;
            for output in &status.outputs {
                prop_assert_eq!(output.enabled, output.channel.is_some());
                if let Some(channel) = output.channel {
                    prop_assert!(!held.contains(channel));
                    held.insert(channel);
                }
            }
            let mut expected = ChannelMask::ALL;
            for channel in held.iter() {
                expected.remove(channel);
            }
            prop_assert_eq!(status.unassigned_channels, expected);
        }
    }
}
