//! Virtual-to-physical translator: three-layer pipeline of slot
//! micro-cache, TLB shard manager, and three-level page walk.

use crate::tlb::{TlbHit, TlbShardManager};
use axp_types::{AccessKind, CpuId, GranularityHint, HotIprBank, MemoryBus, Pte, PteFault, Realm};

/// Translation outcome. `Success` carries the physical address and the
/// satisfying PTE's raw permission byte; every other variant is a
/// classification the caller turns into a `PendingEvent`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TranslateResult {
    Success { pa: u64, perm: u8 },
    NonCanonical,
    NotKseg,
    TlbMiss,
    DtbMiss,
    ItbMiss,
    AccessViolation,
    FaultOnRead,
    FaultOnWrite,
    FaultOnExecute,
    PageNotPresent,
    Unaligned,
    BusError,
}

impl From<PteFault> for TranslateResult {
    fn from(f: PteFault) -> Self {
        match f {
            PteFault::NotPresent => TranslateResult::PageNotPresent,
            PteFault::FaultOnRead => TranslateResult::FaultOnRead,
            PteFault::FaultOnWrite => TranslateResult::FaultOnWrite,
            PteFault::FaultOnExecute => TranslateResult::FaultOnExecute,
            PteFault::AccessViolation => TranslateResult::AccessViolation,
        }
    }
}

/// The architectural inputs a translation needs beyond the VA itself.
/// Borrowed, never owned: the translator reads IPR state, it doesn't
/// hold it.
pub struct TranslateContext<'a> {
    pub cpu: CpuId,
    pub hot: &'a HotIprBank,
    pub mode: axp_types::CurrentMode,
    pub kseg_base: u64,
    pub kseg_size: u64,
}

const L1_SHIFT: u32 = 22;
const L2_SHIFT: u32 = 13;
const IDX_MASK: u64 = 0x3FF; // 10 bits per level below L1's 8-bit span handled via shift
const PTE_SIZE: u64 = 8;

/// Single-entry direct-mapped cache of the last resolved (VA page,
/// realm) pair for one pipeline slot. Cheapest possible hit path,
/// consulted before the TLB proper.
#[derive(Clone, Copy, Default)]
pub struct SlotMicroCache {
    valid: bool,
    realm: Option<Realm>,
    vpage: u64,
    pa_base: u64,
    perm: u8,
}

impl SlotMicroCache {
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    fn try_hit(&self, realm: Realm, va: u64) -> Option<(u64, u8)> {
        if !self.valid || self.realm != Some(realm) {
            return None;
        }
        let page_shift = GranularityHint::Base.page_shift();
        if (va >> page_shift) != self.vpage {
            return None;
        }
        let offset = va & (GranularityHint::Base.page_size() - 1);
        Some((self.pa_base + offset, self.perm))
    }

    fn fill(&mut self, realm: Realm, va: u64, pa: u64, perm: u8, size_class: GranularityHint) {
        let page_shift = size_class.page_shift();
        self.valid = true;
        self.realm = Some(realm);
        self.vpage = va >> page_shift;
        self.pa_base = pa - (va & (size_class.page_size() - 1));
        self.perm = perm;
    }
}

pub struct Translator {
    tlb: TlbShardManager,
}

impl Translator {
    pub fn new(num_cpus: usize) -> Self {
        Translator {
            tlb: TlbShardManager::new(num_cpus),
        }
    }

    pub fn tlb(&self) -> &TlbShardManager {
        &self.tlb
    }

    fn is_canonical(va: u64, va48: bool) -> bool {
        let bits = if va48 { 48 } else { 43 };
        let sign_bit = 1u64 << (bits - 1);
        let high_mask = !((1u64 << bits) - 1);
        let top = va & high_mask;
        if va & sign_bit != 0 {
            top == high_mask
        } else {
            top == 0
        }
    }

    fn in_kseg(ctx: &TranslateContext, va: u64) -> bool {
        ctx.kseg_size != 0
            && va >= ctx.kseg_base
            && va < ctx.kseg_base.wrapping_add(ctx.kseg_size)
    }

    /// KSEG is identity-mapped only for kernel-mode accesses; any other
    /// current mode reaching into the KSEG window is an access violation,
    /// not a translation the walker should ever attempt.
    fn kseg_allowed(ctx: &TranslateContext) -> bool {
        ctx.mode == axp_types::CurrentMode::Kernel
    }

    /// Translate `va` for `access` under `ctx`, consulting `slot` first,
    /// then the TLB, then walking the page tables via `bus`.
    pub fn translate(
        &self,
        ctx: &TranslateContext,
        slot: &mut SlotMicroCache,
        realm: Realm,
        va: u64,
        size: u32,
        access: AccessKind,
        bus: &mut dyn MemoryBus,
    ) -> TranslateResult {
        if size > 1 && (va % (size as u64)) != 0 {
            return TranslateResult::Unaligned;
        }

        if ctx.hot.pc & 1 != 0 || ctx.hot.physical_mode() {
            return TranslateResult::Success { pa: va, perm: 0xFF };
        }

        if Self::in_kseg(ctx, va) {
            return if Self::kseg_allowed(ctx) {
                TranslateResult::Success { pa: va, perm: 0xFF }
            } else {
                TranslateResult::NotKseg
            };
        }

        if !Self::is_canonical(va, ctx.hot.va_is_48bit()) {
            return TranslateResult::NonCanonical;
        }

        if let Some((pa, perm)) = slot.try_hit(realm, va) {
            return TranslateResult::Success { pa, perm };
        }

        if let Some(hit) = self.tlb.lookup_any_size(ctx.cpu, realm, va, ctx.hot.asn) {
            slot.fill(realm, va, Self::pa_for(hit, va), hit.perm, hit.size_class);
            return TranslateResult::Success {
                pa: Self::pa_for(hit, va),
                perm: hit.perm,
            };
        }

        tracing::trace!(cpu = ctx.cpu.0, ?realm, va, "tlb miss, walking page tables");
        self.page_walk(ctx, slot, realm, va, access, bus)
    }

    fn pa_for(hit: TlbHit, va: u64) -> u64 {
        let offset = va & (hit.size_class.page_size() - 1);
        (hit.pfn << hit.size_class.page_shift()) + offset
    }

    fn page_walk(
        &self,
        ctx: &TranslateContext,
        slot: &mut SlotMicroCache,
        realm: Realm,
        va: u64,
        access: AccessKind,
        bus: &mut dyn MemoryBus,
    ) -> TranslateResult {
        let vpn = va >> GranularityHint::Base.page_shift();
        let idx_l1 = (vpn >> (L1_SHIFT - GranularityHint::Base.page_shift())) & IDX_MASK;
        let idx_l2 = (vpn >> (L2_SHIFT - GranularityHint::Base.page_shift())) & IDX_MASK;
        let idx_l3 = vpn & IDX_MASK;

        let l1_pte_addr = ctx.hot.ptbr + idx_l1 * PTE_SIZE;
        let l1 = match Self::read_pte(bus, l1_pte_addr) {
            Ok(p) => p,
            Err(_) => return TranslateResult::BusError,
        };
        if !l1.valid() {
            tracing::debug!(cpu = ctx.cpu.0, va, level = 1, "page walk: invalid PTE");
            return miss_for(realm);
        }

        let l2_pte_addr = (l1.pfn() << GranularityHint::Base.page_shift()) + idx_l2 * PTE_SIZE;
        let l2 = match Self::read_pte(bus, l2_pte_addr) {
            Ok(p) => p,
            Err(_) => return TranslateResult::BusError,
        };
        if !l2.valid() {
            tracing::debug!(cpu = ctx.cpu.0, va, level = 2, "page walk: invalid PTE");
            return miss_for(realm);
        }

        let l3_pte_addr = (l2.pfn() << GranularityHint::Base.page_shift()) + idx_l3 * PTE_SIZE;
        let leaf = match Self::read_pte(bus, l3_pte_addr) {
            Ok(p) => p,
            Err(_) => return TranslateResult::BusError,
        };
        if !leaf.valid() {
            tracing::debug!(cpu = ctx.cpu.0, va, level = 3, "page walk: invalid PTE");
            return miss_for(realm);
        }

        if let Err(fault) = leaf.check_access(ctx.mode, access) {
            return fault.into();
        }

        let size_class = leaf.granularity_hint();
        let pa = (leaf.pfn() << size_class.page_shift()) + (va & (size_class.page_size() - 1));
        let perm = leaf.flags().bits() as u8;

        self.tlb.insert(
            ctx.cpu,
            realm,
            va,
            ctx.hot.asn,
            leaf.pfn(),
            perm,
            size_class,
            leaf.global(),
            false,
        );
        slot.fill(realm, va, pa, perm, size_class);

        TranslateResult::Success { pa, perm }
    }

    fn read_pte(bus: &mut dyn MemoryBus, addr: u64) -> Result<Pte, axp_types::BusFault> {
        bus.read_u64(addr).map(Pte::from_raw)
    }

    /// Stack push: pre-decrement `sp` by 8, translate for `WRITE`, write
    /// the quadword. On failure `sp` still reflects the pre-decrement —
    /// a deliberate choice, matching how a real pre-decrement store
    /// leaves the base register updated even if the store itself faults.
    pub fn push(
        &self,
        ctx: &TranslateContext,
        slot: &mut SlotMicroCache,
        sp: &mut u64,
        value: u64,
        bus: &mut dyn MemoryBus,
    ) -> TranslateResult {
        *sp = sp.wrapping_sub(8);
        match self.translate(ctx, slot, Realm::Data, *sp, 8, AccessKind::Write, bus) {
            TranslateResult::Success { pa, .. } => match bus.write_u64(pa, value) {
                Ok(()) => TranslateResult::Success { pa, perm: 0xFF },
                Err(_) => TranslateResult::BusError,
            },
            other => other,
        }
    }

    /// Stack pop: translate for `READ`, read the quadword, post-increment
    /// `sp` by 8 only on success.
    pub fn pop(
        &self,
        ctx: &TranslateContext,
        slot: &mut SlotMicroCache,
        sp: &mut u64,
        bus: &mut dyn MemoryBus,
    ) -> Result<u64, TranslateResult> {
        match self.translate(ctx, slot, Realm::Data, *sp, 8, AccessKind::Read, bus) {
            TranslateResult::Success { pa, .. } => match bus.read_u64(pa) {
                Ok(v) => {
                    *sp = sp.wrapping_add(8);
                    Ok(v)
                }
                Err(_) => Err(TranslateResult::BusError),
            },
            other => Err(other),
        }
    }
}

fn miss_for(realm: Realm) -> TranslateResult {
    match realm {
        Realm::Instruction => TranslateResult::ItbMiss,
        Realm::Data => TranslateResult::DtbMiss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axp_types::{CurrentMode, FlatTestBus, PteFlags};

    fn write_pte(bus: &mut FlatTestBus, addr: u64, pte: Pte) {
        bus.write_raw(addr, &pte.to_raw().to_le_bytes());
    }

    fn ctx(hot: &HotIprBank) -> TranslateContext {
        TranslateContext {
            cpu: CpuId(0),
            hot,
            mode: CurrentMode::Kernel,
            kseg_base: 0xFFFF_FC00_0000_0000,
            kseg_size: 1 << 30,
        }
    }

    #[test]
    fn physical_mode_identity_maps() {
        let mut hot = HotIprBank::default();
        hot.va_ctl = 0; // bit1 clear => physical mode
        let translator = Translator::new(1);
        let mut slot = SlotMicroCache::default();
        let mut bus = FlatTestBus::new(0x1000);
        let res = translator.translate(
            &ctx(&hot),
            &mut slot,
            Realm::Data,
            0x100,
            8,
            AccessKind::Read,
            &mut bus,
        );
        assert_eq!(res, TranslateResult::Success { pa: 0x100, perm: 0xFF });
    }

    #[test]
    fn unaligned_access_detected_before_tlb() {
        let mut hot = HotIprBank::default();
        hot.va_ctl = HotIprBank::VA_CTL_PHYSICAL_MODE_BIT;
        let translator = Translator::new(1);
        let mut slot = SlotMicroCache::default();
        let mut bus = FlatTestBus::new(0x1000);
        let res = translator.translate(
            &ctx(&hot),
            &mut slot,
            Realm::Data,
            0x103,
            8,
            AccessKind::Read,
            &mut bus,
        );
        assert_eq!(res, TranslateResult::Unaligned);
    }

    #[test]
    fn three_level_walk_then_tlb_hit_on_second_access() {
        let mut hot = HotIprBank::default();
        hot.va_ctl = HotIprBank::VA_CTL_PHYSICAL_MODE_BIT | HotIprBank::VA_CTL_VA48_BIT;
        hot.ptbr = 0x0;
        hot.asn = 0;
        let translator = Translator::new(1);
        let mut slot = SlotMicroCache::default();
        let mut bus = FlatTestBus::new(1 << 20);

        let va = 0x10_0000u64;
        let page_shift = GranularityHint::Base.page_shift();
        let vpn = va >> page_shift;
        let idx_l1 = (vpn >> (L1_SHIFT - page_shift)) & IDX_MASK;
        let idx_l2 = (vpn >> (L2_SHIFT - page_shift)) & IDX_MASK;
        let idx_l3 = vpn & IDX_MASK;

        let l2_table_pa = 0x2000u64;
        let l3_table_pa = 0x3000u64;
        let leaf_pfn = 0x55u64;

        write_pte(
            &mut bus,
            hot.ptbr + idx_l1 * PTE_SIZE,
            Pte::from_raw(PteFlags::V.bits() | ((l2_table_pa >> page_shift) << 32)),
        );
        write_pte(
            &mut bus,
            l2_table_pa + idx_l2 * PTE_SIZE,
            Pte::from_raw(PteFlags::V.bits() | ((l3_table_pa >> page_shift) << 32)),
        );
        write_pte(
            &mut bus,
            l3_table_pa + idx_l3 * PTE_SIZE,
            Pte::from_raw(PteFlags::V.bits() | PteFlags::KRE.bits() | (leaf_pfn << 32)),
        );

        let res1 = translator.translate(
            &ctx(&hot),
            &mut slot,
            Realm::Data,
            va,
            8,
            AccessKind::Read,
            &mut bus,
        );
        let expected_pa = (leaf_pfn << page_shift) + (va & (GranularityHint::Base.page_size() - 1));
        assert_eq!(
            res1,
            TranslateResult::Success {
                pa: expected_pa,
                perm: (PteFlags::V.bits() | PteFlags::KRE.bits()) as u8
            }
        );

        // TLB now holds the mapping; a second lookup must hit via the
        // shard manager without walking (the slot cache would also hit,
        // so invalidate it to force the TLB path).
        slot.invalidate();
        let res2 = translator.translate(
            &ctx(&hot),
            &mut slot,
            Realm::Data,
            va,
            8,
            AccessKind::Read,
            &mut bus,
        );
        assert_eq!(res1, res2);
    }

    #[test]
    fn non_canonical_address_rejected() {
        let mut hot = HotIprBank::default();
        hot.va_ctl = HotIprBank::VA_CTL_PHYSICAL_MODE_BIT; // virtual, 43-bit VA
        let translator = Translator::new(1);
        let mut slot = SlotMicroCache::default();
        let mut bus = FlatTestBus::new(0x1000);
        let res = translator.translate(
            &ctx(&hot),
            &mut slot,
            Realm::Data,
            1u64 << 50,
            8,
            AccessKind::Read,
            &mut bus,
        );
        assert_eq!(res, TranslateResult::NonCanonical);
    }
}
