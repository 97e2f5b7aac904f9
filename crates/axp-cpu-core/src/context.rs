//! Per-CPU architectural context: register files, the IPR bank, the
//! active HWPCB, and this CPU's interrupt controller and translation
//! micro-caches.

use axp_interrupts::InterruptController;
use axp_mmu::SlotMicroCache;
use axp_types::{CpuId, FpRegFile, Hwpcb, IntRegFile, IprBank};

/// Everything owned by one emulated CPU. The TLB shard manager and the
/// physical router are *not* here: they're shared across every
/// `ProcessorContext` via `CpuSystem`.
pub struct ProcessorContext {
    pub cpu: CpuId,
    pub int_regs: IntRegFile,
    pub fp_regs: FpRegFile,
    pub iprs: IprBank,
    /// The HWPCB currently active for this CPU (the one `SWPCTX` reads
    /// from and writes to). A real emulator keeps a pool of these
    /// indexed by guest physical address; this core only needs the
    /// currently-active one plus whatever the guest swaps in.
    pub hwpcb: Hwpcb,
    pub interrupts: InterruptController,
    /// Micro-cache of the last resolved (VA page, realm) translation,
    /// one per realm, consulted before the TLB proper.
    pub insn_slot_cache: SlotMicroCache,
    pub data_slot_cache: SlotMicroCache,
}

impl ProcessorContext {
    pub fn new(cpu: CpuId) -> Self {
        ProcessorContext {
            cpu,
            int_regs: IntRegFile::default(),
            fp_regs: FpRegFile::default(),
            iprs: IprBank::default(),
            hwpcb: Hwpcb::default(),
            interrupts: InterruptController::new(),
            insn_slot_cache: SlotMicroCache::default(),
            data_slot_cache: SlotMicroCache::default(),
        }
    }

    /// Reset to the architectural reset state: PAL mode at `PAL_BASE`,
    /// IPL 31 (all interrupts masked), every cache invalidated.
    pub fn reset(&mut self) {
        self.int_regs = IntRegFile::default();
        self.fp_regs = FpRegFile::default();
        let pal_base = self.iprs.cold.pal_base;
        self.iprs.hot = Default::default();
        self.iprs.hot.pc = pal_base | 1;
        self.iprs.hot.ps = self.iprs.hot.ps.with_ipl(31);
        self.insn_slot_cache.invalidate();
        self.data_slot_cache.invalidate();
    }
}
