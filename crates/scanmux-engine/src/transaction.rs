//! Staged display updates.
//!
//! A [`Transaction`] is built from a snapshot of the committed state: the
//! three shared records are duplicated eagerly, per-output and per-plane
//! records on first touch. All mutation happens on the copies, so a
//! rejected transaction can simply be dropped and the device is untouched.

use crate::state::{ChannelPoolState, ColorTransformState, CurrentState, LoadTrackerState};
use scanmux_core::{
    ColorMatrix, OutputId, OutputMode, OutputState, PlaneId, PlaneState, Result, ScanMuxError,
};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Old and new state of one output touched by a transaction.
#[derive(Debug, Clone)]
pub struct OutputUpdate {
    pub id: OutputId,
    pub old: OutputState,
    pub new: OutputState,
}

/// Old and new state of one plane touched by a transaction.
#[derive(Debug, Clone)]
pub struct PlaneUpdate {
    pub id: PlaneId,
    pub old: PlaneState,
    pub new: PlaneState,
}

/// A set of display updates that validate and commit as one unit.
///
/// Outputs and planes not staged here keep their committed state; in
/// particular an untouched output keeps its channel across other outputs'
/// modesets.
#[derive(Debug)]
pub struct Transaction {
    pub(crate) base_generation: u64,
    pub(crate) committed_generation: Option<u64>,
    base_outputs: HashMap<OutputId, OutputState>,
    base_planes: HashMap<PlaneId, PlaneState>,
    base_pool: ChannelPoolState,
    base_color: ColorTransformState,
    base_load: LoadTrackerState,
    pub(crate) outputs: SmallVec<[OutputUpdate; 4]>,
    pub(crate) planes: SmallVec<[PlaneUpdate; 8]>,
    pub(crate) pool: ChannelPoolState,
    pub(crate) color: ColorTransformState,
    pub(crate) load: LoadTrackerState,
    pub(crate) checked: bool,
}

impl Transaction {
    pub(crate) fn new(current: &CurrentState) -> Self {
        Self {
            base_generation: current.generation,
            committed_generation: None,
            base_outputs: current.outputs.clone(),
            base_planes: current.planes.clone(),
            base_pool: current.pool.clone(),
            base_color: current.color.clone(),
            base_load: current.load,
            outputs: SmallVec::new(),
            planes: SmallVec::new(),
            pool: current.pool.clone(),
            color: current.color.clone(),
            load: current.load,
            checked: false,
        }
    }

    /// Generation of the committed state this transaction was built from.
    pub fn base_generation(&self) -> u64 {
        self.base_generation
    }

    /// Whether validation has passed since the last mutation.
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Core clock rate this transaction's state needs. Meaningful after
    /// validation.
    pub fn core_clock_hz(&self) -> u64 {
        self.pool.core_clock_hz
    }

    /// The duplicated channel-pool record.
    pub fn pool(&self) -> &ChannelPoolState {
        &self.pool
    }

    /// The duplicated color-transform record.
    pub fn color(&self) -> &ColorTransformState {
        &self.color
    }

    /// The duplicated load record.
    pub fn load(&self) -> &LoadTrackerState {
        &self.load
    }

    /// Outputs staged so far.
    pub fn outputs(&self) -> &[OutputUpdate] {
        &self.outputs
    }

    /// Planes staged so far.
    pub fn planes(&self) -> &[PlaneUpdate] {
        &self.planes
    }

    /// The output state this transaction would commit: the staged copy if
    /// the output was touched, its committed state otherwise.
    pub fn output(&self, id: OutputId) -> Option<&OutputState> {
        if let Some(i) = self.staged_output(id) {
            return Some(&self.outputs[i].new);
        }
        self.base_outputs.get(&id)
    }

    /// See [`Transaction::output`].
    pub fn plane(&self, id: PlaneId) -> Option<&PlaneState> {
        if let Some(i) = self.staged_plane(id) {
            return Some(&self.planes[i].new);
        }
        self.base_planes.get(&id)
    }

    /// Stage an output, duplicating its committed state on first touch.
    pub fn output_mut(&mut self, id: OutputId) -> Result<&mut OutputState> {
        self.checked = false;
        if let Some(i) = self.staged_output(id) {
            return Ok(&mut self.outputs[i].new);
        }
        let base = self
            .base_outputs
            .get(&id)
            .ok_or(ScanMuxError::UnknownOutput(id))?;
        self.outputs.push(OutputUpdate {
            id,
            old: base.clone(),
            new: base.clone(),
        });
        let i = self.outputs.len() - 1;
        Ok(&mut self.outputs[i].new)
    }

    /// Stage a plane, duplicating its committed state on first touch.
    pub fn plane_mut(&mut self, id: PlaneId) -> Result<&mut PlaneState> {
        self.checked = false;
        if let Some(i) = self.staged_plane(id) {
            return Ok(&mut self.planes[i].new);
        }
        let base = self
            .base_planes
            .get(&id)
            .ok_or(ScanMuxError::UnknownPlane(id))?;
        self.planes.push(PlaneUpdate {
            id,
            old: *base,
            new: *base,
        });
        let i = self.planes.len() - 1;
        Ok(&mut self.planes[i].new)
    }

    /// Give an output a mode and start scanning out.
    pub fn enable_output(&mut self, id: OutputId, mode: OutputMode) -> Result<()> {
        let state = self.output_mut(id)?;
        state.enabled = true;
        state.active = true;
        state.mode = Some(mode);
        Ok(())
    }

    /// Tear an output down. Any color transform goes with it, since the
    /// transform is tied to the output's channel.
    pub fn disable_output(&mut self, id: OutputId) -> Result<()> {
        let state = self.output_mut(id)?;
        state.enabled = false;
        state.active = false;
        state.mode = None;
        state.color_matrix = None;
        Ok(())
    }

    /// Request or drop a color transform on an output.
    pub fn set_color_transform(&mut self, id: OutputId, matrix: Option<ColorMatrix>) -> Result<()> {
        self.output_mut(id)?.color_matrix = matrix;
        Ok(())
    }

    /// Whether this update qualifies for the fast commit path: a buffer
    /// flip on a single plane that stays on its output, touching nothing
    /// else.
    pub fn fast_eligible(&self) -> bool {
        if !self.outputs.is_empty() || self.planes.len() != 1 {
            return false;
        }
        let update = &self.planes[0];
        update.old.output.is_some()
            && update.old.output == update.new.output
            && update.old.framebuffer.is_some()
            && update.new.framebuffer.is_some()
    }

    /// Put staged objects in id order so validation and programming are
    /// deterministic regardless of staging order.
    pub(crate) fn sort_for_check(&mut self) {
        self.outputs.sort_by_key(|u| u.id);
        self.planes.sort_by_key(|u| u.id);
    }

    /// Reset everything validation derives, so a transaction can be checked
    /// again after a failed or amended check without double-counting.
    pub(crate) fn begin_check(&mut self) {
        self.sort_for_check();
        self.pool = self.base_pool.clone();
        self.color = self.base_color.clone();
        self.load = self.base_load;
        for update in self.outputs.iter_mut() {
            update.new.assigned_channel = update.old.assigned_channel;
            update.new.needs_mux_update = false;
        }
        self.checked = false;
    }

    fn staged_output(&self, id: OutputId) -> Option<usize> {
        self.outputs.iter().position(|u| u.id == id)
    }

    fn staged_plane(&self, id: PlaneId) -> Option<usize> {
        self.planes.iter().position(|u| u.id == id)
    }
}
