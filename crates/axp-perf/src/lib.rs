//! Per-CPU performance counters and their serializable snapshot, meant
//! for host-facing tooling and diagnostics.
//!
//! The architectural `PERF_CTL`/`PERF_CNT` IPRs only expose four raw
//! 64-bit counters selected by a mode field; this crate is the
//! host-side mirror that actually accumulates the events the
//! interpreter observes, independent of which architectural counter
//! (if any) a guest has currently selected to watch them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// One lock-free saturating-add counter. `Ordering::Relaxed` is
/// correct here: counters are read for diagnostics, never used to
/// synchronize other state.
#[derive(Default)]
struct Counter(AtomicU64);

impl Counter {
    fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Live, mutable counter bank for one CPU. `&self`-only by design so a
/// `PerfCounters` can be shared the same way `Translator`/`SmpCoherence`
/// are: one instance per CPU, updated from inside the pipeline's hot
/// path without an exclusive lock.
#[derive(Default)]
pub struct PerfCounters {
    cycles: Counter,
    instructions_retired: Counter,
    branch_mispredicts: Counter,
    branches_resolved: Counter,
    tlb_misses: Counter,
    pal_entries: Counter,
    stalls: Counter,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self, cycles: u64) {
        self.cycles.add(cycles);
    }

    pub fn retire(&self) {
        self.instructions_retired.incr();
    }

    pub fn branch_resolved(&self, mispredicted: bool) {
        self.branches_resolved.incr();
        if mispredicted {
            self.branch_mispredicts.incr();
        }
    }

    pub fn tlb_miss(&self) {
        self.tlb_misses.incr();
    }

    pub fn pal_entry(&self) {
        self.pal_entries.incr();
    }

    pub fn stall(&self) {
        self.stalls.incr();
    }

    /// Render an immutable, serializable snapshot for host tooling
    /// (a debugger UI, a regression harness comparing counter deltas).
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycles: self.cycles.get(),
            instructions_retired: self.instructions_retired.get(),
            branch_mispredicts: self.branch_mispredicts.get(),
            branches_resolved: self.branches_resolved.get(),
            tlb_misses: self.tlb_misses.get(),
            pal_entries: self.pal_entries.get(),
            stalls: self.stalls.get(),
        }
    }
}

/// Point-in-time, JSON-serializable view of a `PerfCounters` bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cycles: u64,
    pub instructions_retired: u64,
    pub branch_mispredicts: u64,
    pub branches_resolved: u64,
    pub tlb_misses: u64,
    pub pal_entries: u64,
    pub stalls: u64,
}

impl Snapshot {
    /// Instructions-per-cycle, `0.0` when no cycles have elapsed yet
    /// rather than dividing by zero.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instructions_retired as f64 / self.cycles as f64
        }
    }

    pub fn branch_misprediction_rate(&self) -> f64 {
        if self.branches_resolved == 0 {
            0.0
        } else {
            self.branch_mispredicts as f64 / self.branches_resolved as f64
        }
    }
}
