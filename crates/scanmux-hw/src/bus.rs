//! Register access.
//!
//! The engine programs the composer through [`RegisterBus`] so commits can
//! run against real MMIO or against [`SoftBus`], which keeps registers in a
//! map and records every write for inspection.

use crate::regs::Register;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::trace;

/// Word-sized access to the composer register block.
pub trait RegisterBus: Send + Sync {
    fn read(&self, reg: Register) -> u32;

    fn write(&self, reg: Register, value: u32);

    /// Read-modify-write of the bits covered by `mask`; other bits keep
    /// their current value.
    fn update(&self, reg: Register, mask: u32, value: u32) {
        let current = self.read(reg);
        self.write(reg, (current & !mask) | (value & mask));
    }
}

/// In-memory register block. Unwritten registers read back their reset
/// value.
#[derive(Default)]
pub struct SoftBus {
    inner: Mutex<SoftBusInner>,
}

#[derive(Default)]
struct SoftBusInner {
    registers: HashMap<Register, u32>,
    writes: Vec<(Register, u32)>,
}

impl SoftBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write so far, oldest first.
    pub fn writes(&self) -> Vec<(Register, u32)> {
        self.inner.lock().writes.clone()
    }

    /// Drain the write log.
    pub fn take_writes(&self) -> Vec<(Register, u32)> {
        std::mem::take(&mut self.inner.lock().writes)
    }
}

impl RegisterBus for SoftBus {
    fn read(&self, reg: Register) -> u32 {
        self.inner
            .lock()
            .registers
            .get(&reg)
            .copied()
            .unwrap_or_else(|| reg.reset_value())
    }

    fn write(&self, reg: Register, value: u32) {
        trace!(?reg, value = format_args!("{value:#010x}"), "register write");
        let mut inner = self.inner.lock();
        inner.registers.insert(reg, value);
        inner.writes.push((reg, value));
    }
}
