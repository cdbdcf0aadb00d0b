//! The device handle.
//!
//! [`Device`] ties the pieces together: the fixed output/plane topology, the
//! register bus and core clock it drives, the committed state, and the worker
//! that runs non-blocking commits. All transaction traffic goes through it.

use crate::commit::{self, CommitMode};
use crate::state::CurrentState;
use crate::transaction::Transaction;
use crate::worker::CommitWorker;
use crate::{alloc, clock, color, load, ops::ModesetOps};
use parking_lot::Mutex;
use scanmux_core::{
    ChannelId, ChannelMask, FramebufferId, MuxSlot, OutputId, OutputMode, OutputState, PlaneId,
    PlaneState, Result, ScanMuxError,
};
use scanmux_hw::{ClockRequest, CoreClock, Register, RegisterBus};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fixed description of one display output.
#[derive(Debug, Clone)]
pub struct OutputDescriptor {
    pub id: OutputId,
    /// The output's position in the routing register.
    pub slot: MuxSlot,
    /// Channels that can physically feed this output.
    pub compatible: ChannelMask,
}

/// Device topology and policy, fixed for the lifetime of the [`Device`].
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub outputs: Vec<OutputDescriptor>,
    pub planes: Vec<PlaneId>,
    /// How long a committer waits for the commit in flight before giving up
    /// with [`ScanMuxError::Interrupted`]. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
    /// Whether validation rejects configurations over the load budgets.
    /// Totals are tracked either way.
    pub enforce_load_limits: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            planes: Vec::new(),
            lock_timeout: None,
            enforce_load_limits: true,
        }
    }
}

impl DeviceConfig {
    /// The descriptor for `id`, if the device has such an output.
    pub fn output(&self, id: OutputId) -> Option<&OutputDescriptor> {
        self.outputs.iter().find(|descriptor| descriptor.id == id)
    }

    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut slots = HashSet::new();
        for descriptor in &self.outputs {
            if !ids.insert(descriptor.id) {
                return Err(ScanMuxError::InvalidConfig(format!(
                    "duplicate output {}",
                    descriptor.id
                )));
            }
            if !slots.insert(descriptor.slot) {
                return Err(ScanMuxError::InvalidConfig(format!(
                    "{} claimed twice",
                    descriptor.slot
                )));
            }
            if descriptor.compatible.is_empty() {
                return Err(ScanMuxError::InvalidConfig(format!(
                    "{} has no compatible channels",
                    descriptor.id
                )));
            }
        }
        let mut planes = HashSet::new();
        for plane in &self.planes {
            if !planes.insert(*plane) {
                return Err(ScanMuxError::InvalidConfig(format!(
                    "duplicate {plane}"
                )));
            }
        }
        Ok(())
    }
}

/// State owned by whoever holds the commit gate: the steady-state clock
/// request filed by the last finished commit.
pub(crate) struct CommitGate {
    pub(crate) steady_clock: Option<ClockRequest>,
}

/// The gate guard travels into the worker with non-blocking commits, so the
/// gate stays held from state swap to hardware completion.
pub(crate) type GateGuard = parking_lot::lock_api::ArcMutexGuard<parking_lot::RawMutex, CommitGate>;

pub(crate) struct DeviceInner {
    pub(crate) config: DeviceConfig,
    pub(crate) bus: Arc<dyn RegisterBus>,
    pub(crate) clock: Arc<dyn CoreClock>,
    pub(crate) ops: Arc<dyn ModesetOps>,
    pub(crate) gate: Arc<Mutex<CommitGate>>,
    pub(crate) current: Mutex<CurrentState>,
    pub(crate) load_enforced: AtomicBool,
    pub(crate) last_fault: Mutex<Option<CommitFault>>,
}

/// A failure past the point of no return. The commit cannot be unwound at
/// that stage, so the fault is recorded here instead of returned.
#[derive(Debug, Clone, Serialize)]
pub struct CommitFault {
    pub output: OutputId,
    pub reason: String,
    /// Generation of the commit that hit the fault.
    pub generation: u64,
}

/// An atomic display state manager over one composer.
pub struct Device {
    // Declared before `inner` so shutdown joins the worker (draining queued
    // commits) while the rest of the device is still alive.
    worker: CommitWorker,
    inner: Arc<DeviceInner>,
}

// `Result::unwrap_err` in the tests below needs this; it can't be derived
// because the trait-object fields carry no `Debug` bound.
#[cfg(test)]
impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").finish_non_exhaustive()
    }
}

impl Device {
    /// Bring up a device over the given bus and clock. All outputs start
    /// disabled and all planes start empty.
    pub fn new(
        config: DeviceConfig,
        bus: Arc<dyn RegisterBus>,
        clock: Arc<dyn CoreClock>,
        ops: Arc<dyn ModesetOps>,
    ) -> Result<Self> {
        config.validate()?;

        let mut current = CurrentState::default();
        for descriptor in &config.outputs {
            current.outputs.insert(descriptor.id, OutputState::default());
        }
        for plane in &config.planes {
            current.planes.insert(*plane, PlaneState::default());
        }

        info!(
            outputs = config.outputs.len(),
            planes = config.planes.len(),
            enforce_load = config.enforce_load_limits,
            "device up"
        );

        let load_enforced = AtomicBool::new(config.enforce_load_limits);
        let inner = Arc::new(DeviceInner {
            config,
            bus,
            clock,
            ops,
            gate: Arc::new(Mutex::new(CommitGate { steady_clock: None })),
            current: Mutex::new(current),
            load_enforced,
            last_fault: Mutex::new(None),
        });
        let worker = CommitWorker::spawn(inner.clone())?;

        Ok(Self { worker, inner })
    }

    /// Start a transaction against the current committed state.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(&self.inner.current.lock())
    }

    /// Validate a transaction. On success the transaction carries a fully
    /// resolved configuration (channel assignments, color-transform owner,
    /// load totals, clock rate) and becomes eligible for [`Device::commit`].
    ///
    /// Validation is pure: it never touches hardware or the committed state,
    /// and a failed transaction can be amended and checked again.
    pub fn check(&self, tx: &mut Transaction) -> Result<()> {
        tx.begin_check();
        alloc::assign_channels(&self.inner.config, tx)?;
        color::check_color_transform(tx)?;
        self.inner.ops.check_consistency(tx)?;
        load::check_load(tx, self.load_enforcement())?;
        clock::update_core_clock(tx);
        tx.checked = true;
        Ok(())
    }

    /// Commit a checked transaction. See [`CommitMode`] for the three ways
    /// the hardware phase can run.
    pub fn commit(&self, tx: Transaction, mode: CommitMode) -> Result<()> {
        commit::commit(&self.inner, &self.worker, tx, mode)
    }

    /// Turn load-budget enforcement on or off for future checks.
    pub fn set_load_enforcement(&self, enforce: bool) {
        self.inner.load_enforced.store(enforce, Ordering::Relaxed);
    }

    pub fn load_enforcement(&self) -> bool {
        self.inner.load_enforced.load(Ordering::Relaxed)
    }

    /// Take the most recent commit fault, if one was recorded.
    pub fn take_fault(&self) -> Option<CommitFault> {
        self.inner.last_fault.lock().take()
    }

    /// Snapshot the committed state and hardware-facing figures.
    pub fn status(&self) -> DeviceStatus {
        let current = self.inner.current.lock();

        let mut outputs: Vec<OutputSummary> = current
            .outputs
            .iter()
            .map(|(id, state)| OutputSummary {
                id: *id,
                enabled: state.enabled,
                active: state.active,
                channel: state.assigned_channel,
                mode: state.mode,
                color_transform: state.color_matrix.is_some(),
                feeds_writeback: state.feeds_writeback,
            })
            .collect();
        outputs.sort_by_key(|summary| summary.id);

        let mut planes: Vec<PlaneSummary> = current
            .planes
            .iter()
            .map(|(id, state)| PlaneSummary {
                id: *id,
                output: state.output,
                framebuffer: state.framebuffer,
            })
            .collect();
        planes.sort_by_key(|summary| summary.id);

        let armed = self.inner.bus.read(Register::IrqMask) as u8;
        let underruns_masked = ChannelMask::from_bits(ChannelMask::ALL.bits() & !armed);

        DeviceStatus {
            generation: current.generation,
            unassigned_channels: current.pool.unassigned,
            active_outputs: current.pool.active_outputs,
            core_clock_hz: current.pool.core_clock_hz,
            effective_clock_hz: self.inner.clock.effective_rate(),
            color_owner: current.color.owner,
            membus_load: current.load.membus_bytes,
            compose_load: current.load.compose_cycles,
            underruns_masked,
            outputs,
            planes,
        }
    }
}

/// Point-in-time view of the device, serializable for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub generation: u64,
    pub unassigned_channels: ChannelMask,
    pub active_outputs: u32,
    /// Rate the committed state asked for.
    pub core_clock_hz: u64,
    /// Rate the clock provider actually runs at.
    pub effective_clock_hz: u64,
    pub color_owner: Option<ChannelId>,
    pub membus_load: u64,
    pub compose_load: u64,
    /// Channels whose underrun interrupt is currently masked.
    pub underruns_masked: ChannelMask,
    pub outputs: Vec<OutputSummary>,
    pub planes: Vec<PlaneSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub id: OutputId,
    pub enabled: bool,
    pub active: bool,
    pub channel: Option<ChannelId>,
    pub mode: Option<OutputMode>,
    pub color_transform: bool,
    pub feeds_writeback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaneSummary {
    pub id: PlaneId,
    pub output: Option<OutputId>,
    pub framebuffer: Option<FramebufferId>,
}
