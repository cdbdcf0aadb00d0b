//! ScanMux Simulator
//!
//! Runs a scripted hotplug/flip/transform scenario against the soft register
//! block, then prints the committed state and everything the hardware saw.

use anyhow::{Context, Result};
use scanmux_core::{
    ChannelMask, ColorMatrix, FixedS31_32, FramebufferId, MuxSlot, OutputId, OutputMode, PlaneId,
};
use scanmux_engine::{CommitMode, Device, DeviceConfig, NoopOps, OutputDescriptor};
use scanmux_hw::{SoftBus, SoftClock};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const MODE_1080P: OutputMode = OutputMode {
    hactive: 1920,
    vactive: 1080,
    refresh_hz: 60,
    pixel_clock_hz: 148_500_000,
};

const MODE_4K: OutputMode = OutputMode {
    hactive: 3840,
    vactive: 2160,
    refresh_hz: 60,
    pixel_clock_hz: 594_000_000,
};

fn main() -> Result<()> {
    // Initialize logging
    let verbose = std::env::args().any(|arg| arg == "--verbose");
    let level = if verbose { Level::TRACE } else { Level::DEBUG };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("ScanMux simulator starting...");

    let bus = Arc::new(SoftBus::new());
    let clock = Arc::new(SoftClock::new());

    // Two unrestricted outputs plus one that only channel 0 can feed, so the
    // last scene has to wait for the primary's channel to come back.
    let config = DeviceConfig {
        outputs: vec![
            descriptor(0, 0, 0b111)?,
            descriptor(1, 1, 0b111)?,
            descriptor(2, 2, 0b001)?,
        ],
        planes: (0..4).map(PlaneId).collect(),
        ..Default::default()
    };
    let device = Device::new(config, bus.clone(), clock.clone(), Arc::new(NoopOps))?;

    // Scene 1: primary output up at 1080p with one plane
    info!("scene 1: enable the primary output");
    let mut tx = device.transaction();
    tx.enable_output(OutputId(0), MODE_1080P)?;
    {
        let plane = tx.plane_mut(PlaneId(0))?;
        plane.output = Some(OutputId(0));
        plane.framebuffer = Some(FramebufferId(1));
        plane.membus_load = 500 * 1024 * 1024;
        plane.compose_cycles = 150_000_000;
    }
    device.check(&mut tx)?;
    device.commit(tx, CommitMode::Blocking)?;

    // Scene 2: page flip on the fast path
    info!("scene 2: flip the primary plane");
    let mut tx = device.transaction();
    tx.plane_mut(PlaneId(0))?.framebuffer = Some(FramebufferId(2));
    device.check(&mut tx)?;
    device.commit(tx, CommitMode::Fast)?;

    // Scene 3: hotplug a 4K secondary, committed without blocking
    info!("scene 3: hotplug the secondary output");
    let mut tx = device.transaction();
    tx.enable_output(OutputId(1), MODE_4K)?;
    {
        let plane = tx.plane_mut(PlaneId(1))?;
        plane.output = Some(OutputId(1));
        plane.framebuffer = Some(FramebufferId(3));
        plane.membus_load = 600 * 1024 * 1024;
        plane.compose_cycles = 80_000_000;
    }
    device.check(&mut tx)?;
    device.commit(tx, CommitMode::NonBlocking)?;

    // Scene 4: night-mode color transform on the primary
    info!("scene 4: night mode on the primary");
    let mut tx = device.transaction();
    tx.set_color_transform(OutputId(0), Some(night_matrix()))?;
    device.check(&mut tx)?;
    device.commit(tx, CommitMode::Blocking)?;

    // Scene 5: a second transform has to be refused, the unit is taken
    info!("scene 5: ask for a second transform");
    let mut tx = device.transaction();
    tx.set_color_transform(OutputId(1), Some(night_matrix()))?;
    match device.check(&mut tx) {
        Err(err) => warn!(%err, "refused, as it should be"),
        Ok(()) => warn!("second transform was accepted, this is a bug"),
    }

    // Scene 6: retire the primary; its channel lights the restricted output
    info!("scene 6: retire the primary, light the restricted output");
    let mut tx = device.transaction();
    tx.disable_output(OutputId(0))?;
    {
        let plane = tx.plane_mut(PlaneId(0))?;
        plane.output = None;
        plane.framebuffer = None;
    }
    tx.enable_output(OutputId(2), MODE_1080P)?;
    {
        let plane = tx.plane_mut(PlaneId(2))?;
        plane.output = Some(OutputId(2));
        plane.framebuffer = Some(FramebufferId(4));
        plane.membus_load = 500 * 1024 * 1024;
        plane.compose_cycles = 150_000_000;
    }
    device.check(&mut tx)?;
    device.commit(tx, CommitMode::Blocking)?;

    // Scene 7: route the secondary into the writeback engine
    info!("scene 7: writeback capture on the secondary");
    let mut tx = device.transaction();
    tx.output_mut(OutputId(1))?.feeds_writeback = true;
    device.check(&mut tx)?;
    device.commit(tx, CommitMode::Blocking)?;

    // Report
    let status = device.status();
    let json = serde_json::to_string_pretty(&status).context("serializing device status")?;
    println!("{json}");

    info!("register writes, oldest first:");
    for (reg, value) in bus.writes() {
        info!("  {reg:?} <- {value:#010x}");
    }
    info!(rates = ?clock.rate_history(), "core clock history");

    drop(device);
    info!("ScanMux simulator done");
    Ok(())
}

fn descriptor(id: u32, slot: u8, compatible: u8) -> Result<OutputDescriptor> {
    Ok(OutputDescriptor {
        id: OutputId(id),
        slot: MuxSlot::new(slot).context("mux slot out of range")?,
        compatible: ChannelMask::from_bits(compatible),
    })
}

/// Warm diagonal matrix: full red, dimmed green and blue.
fn night_matrix() -> ColorMatrix {
    let gains = [1.0, 0.82, 0.61];
    let mut raw = [0u64; 9];
    for (row, gain) in gains.iter().enumerate() {
        raw[row * 3 + row] = FixedS31_32::from_f64(*gain).raw();
    }
    ColorMatrix::from_raw(raw)
}
