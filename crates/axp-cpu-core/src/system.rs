//! Top-level facade tying one shared `Translator`/`SmpCoherence` pair to
//! a set of per-CPU `ProcessorContext`s plus per-CPU pipelines
//! shared cleanly across them.

use crate::context::ProcessorContext;
use crate::pipeline::{Pipeline, StepOutcome};
use axp_mmu::Translator;
use axp_smp::SmpCoherence;
use axp_types::{Console, CpuId};

/// Errors that can only be detected at system construction time, before
/// any `ProcessorContext` exists to carry a `PendingEvent` instead.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemError {
    #[error("a CpuSystem needs at least one CPU")]
    NoCpus,
}

pub struct CpuSystem {
    pub translator: Translator,
    pub smp: SmpCoherence,
    pub cpus: Vec<ProcessorContext>,
    pub pipelines: Vec<Pipeline>,
    /// The one console shared by every CPU in the system, reachable via
    /// `CALL_PAL CSERVE`. `None` until the embedding application attaches
    /// one with `set_console`.
    pub console: Option<Box<dyn Console>>,
}

impl CpuSystem {
    pub fn new(num_cpus: usize, ram_size: usize, kseg_base: u64, kseg_size: u64) -> Self {
        Self::try_new(num_cpus, ram_size, kseg_base, kseg_size).expect("num_cpus must be nonzero")
    }

    pub fn try_new(num_cpus: usize, ram_size: usize, kseg_base: u64, kseg_size: u64) -> Result<Self, SystemError> {
        if num_cpus == 0 {
            return Err(SystemError::NoCpus);
        }
        let cpus = (0..num_cpus).map(|i| ProcessorContext::new(CpuId(i as u32))).collect();
        let pipelines = (0..num_cpus).map(|_| Pipeline::new(kseg_base, kseg_size)).collect();
        Ok(CpuSystem {
            translator: Translator::new(num_cpus),
            smp: SmpCoherence::new(num_cpus, ram_size),
            cpus,
            pipelines,
            console: None,
        })
    }

    pub fn set_console(&mut self, console: Box<dyn Console>) {
        self.console = Some(console);
    }

    /// Step one CPU by exactly one instruction. The translator and SMP
    /// coherence state are shared (`&self`-only methods); only the
    /// indexed `ProcessorContext`/`Pipeline` pair needs a
    /// mutable borrow, which destructuring lets the borrow checker see.
    pub fn step_cpu(&mut self, idx: usize) -> StepOutcome {
        let CpuSystem {
            translator,
            smp,
            cpus,
            pipelines,
            console,
        } = self;
        let mut bus: &axp_smp::PhysicalRouter = &smp.router;
        pipelines[idx].step_cycle(&mut cpus[idx], translator, smp, &mut bus, console.as_deref_mut())
    }

    /// `SWPCTX` side effect the PAL grain doesn't own directly: a
    /// context switch drops this CPU's LL/SC
    /// reservation so a stale reservation can never survive into the
    /// next process.
    pub fn context_switch(&mut self, idx: usize) {
        self.smp.reservations.invalidate(CpuId(idx as u32));
    }

    pub fn reset(&mut self) {
        for cpu in &mut self.cpus {
            cpu.reset();
        }
        for pipeline in &mut self.pipelines {
            pipeline.reset();
        }
    }
}
