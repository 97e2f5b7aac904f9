//! MMU / Translator and TLB Shard Manager.
//!
//! The `MemoryBus` trait the page walker reads PTEs through lives in
//! `axp_types` rather than here, since `axp-smp`'s RAM/MMIO router also
//! implements it and must not depend back on this crate.

pub mod tlb;
pub mod translate;

pub use axp_types::MemoryBus;
pub use tlb::{TlbEntry, TlbHit, TlbShardManager};
pub use translate::{SlotMicroCache, TranslateContext, TranslateResult, Translator};
