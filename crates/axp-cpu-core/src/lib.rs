//! The staged pipeline executor, instruction grain set, and PAL
//! dispatch for one emulated Alpha AXP processor. This crate ties
//! together `axp-types`, `axp-cpu-decoder`,
//! `axp-mmu`, `axp-interrupts`, and `axp-smp` into a runnable CPU core.

pub mod bht;
pub mod context;
pub mod grains;
pub mod pal;
pub mod pipeline;
pub mod slot;
pub mod system;

pub use context::ProcessorContext;
pub use pipeline::{Pipeline, StepOutcome};
pub use system::CpuSystem;
