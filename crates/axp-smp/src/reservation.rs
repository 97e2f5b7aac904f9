//! LL/SC reservation table: one `(reserved_pa, valid)` slot per CPU at
//! quadword (8-byte) granularity.

use axp_types::CpuId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const RESERVATION_GRANULE: u64 = 8;

fn line_of(pa: u64) -> u64 {
    pa & !(RESERVATION_GRANULE - 1)
}

struct Slot {
    line: AtomicU64,
    valid: AtomicBool,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            line: AtomicU64::new(0),
            valid: AtomicBool::new(false),
        }
    }
}

/// Per-CPU LL/SC reservations. Shared across CPUs so a write from any
/// CPU can invalidate another CPU's outstanding reservation on the same
/// line.
pub struct ReservationTable {
    slots: Vec<Slot>,
}

impl ReservationTable {
    pub fn new(num_cpus: usize) -> Self {
        let mut slots = Vec::with_capacity(num_cpus);
        slots.resize_with(num_cpus, Slot::default);
        ReservationTable { slots }
    }

    /// LDx_L: record a reservation on the line containing `pa`.
    pub fn load_locked(&self, cpu: CpuId, pa: u64) {
        let slot = &self.slots[cpu.as_usize()];
        slot.line.store(line_of(pa), Ordering::Relaxed);
        slot.valid.store(true, Ordering::Release);
    }

    /// STx_C precondition: true iff `cpu` still holds a valid reservation
    /// on the line containing `pa`. Does not itself clear the
    /// reservation; the caller clears it (success or failure) via
    /// `invalidate`/`invalidate_line` once the store has been attempted.
    pub fn is_reserved(&self, cpu: CpuId, pa: u64) -> bool {
        let slot = &self.slots[cpu.as_usize()];
        slot.valid.load(Ordering::Acquire) && slot.line.load(Ordering::Relaxed) == line_of(pa)
    }

    /// Unconditionally drop `cpu`'s reservation: local exception
    /// delivery, PAL entry, context switch, or an explicit CALL_PAL
    /// invalidation.
    pub fn invalidate(&self, cpu: CpuId) {
        self.slots[cpu.as_usize()].valid.store(false, Ordering::Release);
    }

    /// Drop every CPU's reservation on the line containing `pa`: called
    /// whenever any CPU writes to that line, including the writer
    /// itself after a successful STx_C.
    pub fn invalidate_line(&self, pa: u64) {
        let line = line_of(pa);
        for slot in &self.slots {
            if slot.valid.load(Ordering::Acquire) && slot.line.load(Ordering::Relaxed) == line {
                slot.valid.store(false, Ordering::Release);
            }
        }
    }
}
