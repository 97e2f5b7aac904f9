//! Page Table Entry: canonical 64-bit memory layout and access-rights check.

use crate::ps::CurrentMode;
use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    pub struct PteFlags: u64 {
        const V   = 1 << 0;
        const FOR = 1 << 1;
        const FOW = 1 << 2;
        const FOE = 1 << 3;
        const ASM = 1 << 4;
        const KRE = 1 << 8;
        const ERE = 1 << 9;
        const SRE = 1 << 10;
        const URE = 1 << 11;
        const KWE = 1 << 12;
        const EWE = 1 << 13;
        const SWE = 1 << 14;
        const UWE = 1 << 15;
    }
}

const GH_SHIFT: u32 = 5;
const GH_MASK: u64 = 0b11;
const PFN_SHIFT: u32 = 32;
const PFN_MASK: u64 = (1 << 21) - 1; // bits 32..=52

/// Granularity hint: page size is `8 KiB << (3 * gh)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GranularityHint {
    Base = 0,
    Block8 = 1,
    Block64 = 2,
    Block512 = 3,
}

impl GranularityHint {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => GranularityHint::Base,
            1 => GranularityHint::Block8,
            2 => GranularityHint::Block64,
            _ => GranularityHint::Block512,
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Page-size shift in bits: 13, 16, 19, or 22.
    pub const fn page_shift(self) -> u32 {
        13 + 3 * (self as u32)
    }

    pub const fn page_size(self) -> u64 {
        1u64 << self.page_shift()
    }
}

/// Kind of access being checked against a PTE's permission bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum AccessKind {
    Read,
    Write,
    Execute,
}

/// Canonical in-memory PTE, decoded from the raw 64-bit descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Pte {
    flags: PteFlags,
    gh: GranularityHint,
    pfn: u64,
}

/// The specific fault class produced by a failed access-rights or
/// validity check against a PTE. Named the same way the translator's
/// `TranslateFault` enum names them (see `axp-mmu`), so callers can map
/// 1:1 without re-deriving the reason.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PteFault {
    NotPresent,
    FaultOnRead,
    FaultOnWrite,
    FaultOnExecute,
    AccessViolation,
}

impl Pte {
    pub const fn from_raw(raw: u64) -> Self {
        Pte {
            flags: PteFlags::from_bits_truncate(raw),
            gh: GranularityHint::from_bits(((raw >> GH_SHIFT) & GH_MASK) as u8),
            pfn: (raw >> PFN_SHIFT) & PFN_MASK,
        }
    }

    pub const fn to_raw(self) -> u64 {
        self.flags.bits() | ((self.gh.bits() as u64) << GH_SHIFT) | (self.pfn << PFN_SHIFT)
    }

    pub const fn valid(self) -> bool {
        self.flags.contains(PteFlags::V)
    }

    pub const fn global(self) -> bool {
        self.flags.contains(PteFlags::ASM)
    }

    pub const fn granularity_hint(self) -> GranularityHint {
        self.gh
    }

    pub const fn pfn(self) -> u64 {
        self.pfn
    }

    pub const fn flags(self) -> PteFlags {
        self.flags
    }

    fn read_enable(self, mode: CurrentMode) -> bool {
        match mode {
            CurrentMode::Kernel => self.flags.contains(PteFlags::KRE),
            CurrentMode::Executive => self.flags.contains(PteFlags::ERE),
            CurrentMode::Supervisor => self.flags.contains(PteFlags::SRE),
            CurrentMode::User => self.flags.contains(PteFlags::URE),
        }
    }

    fn write_enable(self, mode: CurrentMode) -> bool {
        match mode {
            CurrentMode::Kernel => self.flags.contains(PteFlags::KWE),
            CurrentMode::Executive => self.flags.contains(PteFlags::EWE),
            CurrentMode::Supervisor => self.flags.contains(PteFlags::SWE),
            CurrentMode::User => self.flags.contains(PteFlags::UWE),
        }
    }

    /// Access-rights matrix: fault bits take precedence over missing
    /// enable bits, and a clear V bit always
    /// yields `NotPresent` regardless of access kind.
    pub fn check_access(self, mode: CurrentMode, access: AccessKind) -> Result<(), PteFault> {
        if !self.valid() {
            return Err(PteFault::NotPresent);
        }
        match access {
            AccessKind::Read => {
                if self.flags.contains(PteFlags::FOR) {
                    return Err(PteFault::FaultOnRead);
                }
                if !self.read_enable(mode) {
                    return Err(PteFault::AccessViolation);
                }
            }
            AccessKind::Write => {
                if self.flags.contains(PteFlags::FOW) {
                    return Err(PteFault::FaultOnWrite);
                }
                if !self.write_enable(mode) {
                    return Err(PteFault::AccessViolation);
                }
            }
            AccessKind::Execute => {
                if self.flags.contains(PteFlags::FOE) {
                    return Err(PteFault::FaultOnExecute);
                }
                if !self.read_enable(mode) {
                    return Err(PteFault::AccessViolation);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pte_never_grants_any_access() {
        let pte = Pte::from_raw(0);
        for access in [AccessKind::Read, AccessKind::Write, AccessKind::Execute] {
            assert_eq!(
                pte.check_access(CurrentMode::Kernel, access),
                Err(PteFault::NotPresent)
            );
        }
    }

    #[test]
    fn fault_bit_wins_over_enable_bit() {
        let raw = PteFlags::V.bits() | PteFlags::FOR.bits() | PteFlags::KRE.bits();
        let pte = Pte::from_raw(raw);
        assert_eq!(
            pte.check_access(CurrentMode::Kernel, AccessKind::Read),
            Err(PteFault::FaultOnRead)
        );
    }

    #[test]
    fn granularity_hint_page_shifts() {
        assert_eq!(GranularityHint::Base.page_shift(), 13);
        assert_eq!(GranularityHint::Block8.page_shift(), 16);
        assert_eq!(GranularityHint::Block64.page_shift(), 19);
        assert_eq!(GranularityHint::Block512.page_shift(), 22);
    }

    #[test]
    fn round_trip_raw() {
        let raw = PteFlags::V.bits()
            | PteFlags::KRE.bits()
            | PteFlags::ASM.bits()
            | (0b10u64 << GH_SHIFT)
            | (0x1234u64 << PFN_SHIFT);
        let pte = Pte::from_raw(raw);
        assert_eq!(pte.to_raw(), raw);
        assert_eq!(pte.pfn(), 0x1234);
        assert_eq!(pte.granularity_hint(), GranularityHint::Block64);
        assert!(pte.global());
    }
}
