//! Core data types shared across the Alpha AXP CPU core crates: PS/PTE
//! bit layouts, the IPR bank, pending-event model, HWPCB, and register
//! files. No subsystem logic lives here, only core architectural types
//! plus the conversions between their wire and in-memory forms.

pub mod bus;
pub mod console;
pub mod event;
pub mod ipr;
pub mod ps;
pub mod pte;
pub mod regs;

pub use bus::{FlatTestBus, MemoryBus};
pub use console::{Console, LoopbackConsole};
pub use event::{ExceptionClass, PendingEvent, PendingEventKind};
pub use ipr::{ColdIprBank, CpuId, HotIprBank, Hwpcb, IprBank};
pub use ps::{CurrentMode, Ps, PsFlags};
pub use pte::{AccessKind, GranularityHint, Pte, PteFault, PteFlags};
pub use regs::{FpRegFile, IntRegFile};

/// Realm a translation/TLB lookup belongs to: instruction stream or data
/// stream. Each realm has its own TLB shards.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Realm {
    Instruction,
    Data,
}

/// Bus-level failure from the physical routing layer, distinct
/// from the architectural `PendingEvent` taxonomy: this is what a
/// `MemoryBus` implementation returns, and callers translate it into a
/// `PendingEvent`/machine check at the boundary that owns that policy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, thiserror::Error)]
pub enum BusFault {
    #[error("physical address out of range")]
    OutOfRange,
    #[error("unsupported access width")]
    WidthFault,
    #[error("device returned a bus error")]
    DeviceError,
}
