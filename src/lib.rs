//! Workspace facade: re-exports the public API of the member crates so
//! a consumer can depend on a single package instead of wiring up each
//! crate individually.

pub use axp_cpu_core::{CpuSystem, Pipeline, ProcessorContext, StepOutcome};
pub use axp_interrupts::InterruptController;
pub use axp_mmu::{TranslateResult, Translator};
pub use axp_perf::{PerfCounters, Snapshot};
pub use axp_smp::{PhysicalRouter, SmpCoherence};
pub use axp_types::{CpuId, ExceptionClass, MemoryBus, PendingEvent};
