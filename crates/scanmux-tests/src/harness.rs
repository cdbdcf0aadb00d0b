//! Shared fixtures: canned devices, display modes, a register bus that logs
//! into the same event stream as the ops hooks, and an ops implementation
//! that records every call and can inject failures.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use scanmux_core::{
    ChannelMask, ColorMatrix, FixedS31_32, FramebufferId, MuxSlot, OutputId, OutputMode, PlaneId,
    Result, ScanMuxError,
};
use scanmux_engine::{Device, DeviceConfig, ModesetOps, OutputDescriptor, Transaction};
use scanmux_hw::{Register, RegisterBus, SoftBus, SoftClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const MODE_1080P: OutputMode = OutputMode {
    hactive: 1920,
    vactive: 1080,
    refresh_hz: 60,
    pixel_clock_hz: 148_500_000,
};

pub const MODE_4K: OutputMode = OutputMode {
    hactive: 3840,
    vactive: 2160,
    refresh_hz: 60,
    pixel_clock_hz: 594_000_000,
};

/// One ordered stream shared by the ops hooks and the register bus, so tests
/// can assert how hook calls and register writes interleave.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn descriptor(id: u32, slot: u8, compatible: u8) -> OutputDescriptor {
    OutputDescriptor {
        id: OutputId(id),
        slot: MuxSlot::new(slot).unwrap(),
        compatible: ChannelMask::from_bits(compatible),
    }
}

/// Three outputs that can take any channel, four planes.
pub fn three_output_config() -> DeviceConfig {
    DeviceConfig {
        outputs: vec![
            descriptor(0, 0, 0b111),
            descriptor(1, 1, 0b111),
            descriptor(2, 2, 0b111),
        ],
        planes: (0..4).map(PlaneId).collect(),
        ..Default::default()
    }
}

/// A matrix from row-major f64 coefficients.
pub fn matrix(values: [f64; 9]) -> ColorMatrix {
    ColorMatrix::from_raw(values.map(|v| FixedS31_32::from_f64(v).raw()))
}

/// A diagonal (per-component gain) matrix.
pub fn diagonal(r: f64, g: f64, b: f64) -> ColorMatrix {
    matrix([r, 0.0, 0.0, 0.0, g, 0.0, 0.0, 0.0, b])
}

/// Point `plane` at `output` with a buffer and load figures.
pub fn attach_plane(
    tx: &mut Transaction,
    plane: PlaneId,
    output: OutputId,
    framebuffer: u64,
    membus_load: u64,
    compose_cycles: u64,
) {
    let state = tx.plane_mut(plane).unwrap();
    state.output = Some(output);
    state.framebuffer = Some(FramebufferId(framebuffer));
    state.membus_load = membus_load;
    state.compose_cycles = compose_cycles;
}

/// A [`SoftBus`] that also pushes every write into the shared event log.
pub struct LoggingBus {
    inner: SoftBus,
    log: EventLog,
}

impl LoggingBus {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: SoftBus::new(),
            log,
        }
    }

    pub fn writes(&self) -> Vec<(Register, u32)> {
        self.inner.writes()
    }

    pub fn take_writes(&self) -> Vec<(Register, u32)> {
        self.inner.take_writes()
    }
}

impl RegisterBus for LoggingBus {
    fn read(&self, reg: Register) -> u32 {
        self.inner.read(reg)
    }

    fn write(&self, reg: Register, value: u32) {
        self.log.lock().push(format!("write {reg:?}"));
        self.inner.write(reg, value);
    }
}

/// Records every hook call in order. Failure injection is opt-in per flag;
/// `stall_readiness` parks the hardware phase until the paired sender is
/// used or dropped.
pub struct RecordingOps {
    log: EventLog,
    pub fail_prepare: AtomicBool,
    pub interrupt_readiness: AtomicBool,
    pub flip_failure: Mutex<Option<String>>,
    pub stall_readiness: Mutex<Option<Receiver<()>>>,
    pub notify_done: Mutex<Option<Sender<u64>>>,
}

impl RecordingOps {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_prepare: AtomicBool::new(false),
            interrupt_readiness: AtomicBool::new(false),
            flip_failure: Mutex::new(None),
            stall_readiness: Mutex::new(None),
            notify_done: Mutex::new(None),
        }
    }

    fn record(&self, event: impl Into<String>) {
        self.log.lock().push(event.into());
    }
}

impl ModesetOps for RecordingOps {
    fn check_consistency(&self, _tx: &Transaction) -> Result<()> {
        self.record("check_consistency");
        Ok(())
    }

    fn prepare(&self, _tx: &Transaction) -> Result<()> {
        self.record("prepare");
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(ScanMuxError::PrepareFailed("injected".into()));
        }
        Ok(())
    }

    fn wait_for_readiness_interruptible(&self, _tx: &Transaction) -> Result<()> {
        self.record("wait_readiness_interruptible");
        if self.interrupt_readiness.load(Ordering::SeqCst) {
            return Err(ScanMuxError::Interrupted);
        }
        Ok(())
    }

    fn wait_for_readiness(&self, _tx: &Transaction) {
        if let Some(release) = self.stall_readiness.lock().take() {
            let _ = release.recv();
        }
        self.record("wait_readiness");
    }

    fn program_disables(&self, _tx: &Transaction) {
        self.record("program_disables");
    }

    fn program_planes(&self, _tx: &Transaction) {
        self.record("program_planes");
    }

    fn program_enables(&self, _tx: &Transaction) {
        self.record("program_enables");
    }

    fn wait_flip_done(&self, output: OutputId) -> std::result::Result<(), String> {
        self.record(format!("wait_flip_done {output}"));
        match &*self.flip_failure.lock() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn apply_fast_update(&self, _tx: &Transaction) {
        self.record("apply_fast_update");
    }

    fn cleanup(&self, _tx: &Transaction) {
        self.record("cleanup");
    }

    fn commit_done(&self, generation: u64) {
        self.record(format!("commit_done {generation}"));
        if let Some(done) = &*self.notify_done.lock() {
            let _ = done.send(generation);
        }
    }
}

/// A device wired to a logging bus, a soft clock, and recording ops.
pub struct Rig {
    pub device: Device,
    pub bus: Arc<LoggingBus>,
    pub clock: Arc<SoftClock>,
    pub ops: Arc<RecordingOps>,
    pub log: EventLog,
}

impl Rig {
    pub fn events(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn clear_events(&self) {
        self.log.lock().clear();
    }
}

pub fn rig() -> Rig {
    rig_with(three_output_config())
}

pub fn rig_with(config: DeviceConfig) -> Rig {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let bus = Arc::new(LoggingBus::new(log.clone()));
    let clock = Arc::new(SoftClock::new());
    let ops = Arc::new(RecordingOps::new(log.clone()));
    let device = Device::new(config, bus.clone(), clock.clone(), ops.clone()).unwrap();
    Rig {
        device,
        bus,
        clock,
        ops,
        log,
    }
}
