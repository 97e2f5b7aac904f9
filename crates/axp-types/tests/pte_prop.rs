#![cfg(not(target_arch = "wasm32"))]

use axp_types::{AccessKind, CurrentMode, GranularityHint, Pte, PteFault, PteFlags};
use proptest::prelude::*;

const KNOWN_FLAG_BITS: u64 = PteFlags::all().bits();
const GH_SHIFT: u32 = 5;
const PFN_SHIFT: u32 = 32;
const PFN_MASK: u64 = (1 << 21) - 1;

fn modes() -> impl Strategy<Value = CurrentMode> {
    (0u64..4).prop_map(CurrentMode::from_bits)
}

fn accesses() -> impl Strategy<Value = AccessKind> {
    prop_oneof![
        Just(AccessKind::Read),
        Just(AccessKind::Write),
        Just(AccessKind::Execute),
    ]
}

proptest! {
    /// A raw descriptor built from normalized flag/gh/pfn fields survives
    /// `from_raw` -> `to_raw` unchanged, for any combination of those fields.
    #[test]
    fn from_raw_to_raw_round_trips(
        flag_bits in 0u64..=KNOWN_FLAG_BITS,
        gh_bits in 0u8..4,
        pfn in 0u64..=PFN_MASK,
    ) {
        let raw = (flag_bits & KNOWN_FLAG_BITS)
            | ((gh_bits as u64 & 0b11) << GH_SHIFT)
            | (pfn << PFN_SHIFT);
        let pte = Pte::from_raw(raw);
        prop_assert_eq!(pte.to_raw(), raw);
        prop_assert_eq!(pte.pfn(), pfn);
        prop_assert_eq!(pte.granularity_hint(), GranularityHint::from_bits(gh_bits));
    }

    /// Fault-on-{read,write,execute} bits always win over the matching
    /// enable bit, no matter which mode or which of the other flag bits
    /// happen to be set alongside them.
    #[test]
    fn fault_bit_always_wins_over_enable_bit(
        extra_bits in 0u64..=KNOWN_FLAG_BITS,
        mode in modes(),
        access in accesses(),
    ) {
        let fault_bit = match access {
            AccessKind::Read => PteFlags::FOR,
            AccessKind::Write => PteFlags::FOW,
            AccessKind::Execute => PteFlags::FOE,
        };
        let raw = PteFlags::V.bits() | fault_bit.bits() | (extra_bits & KNOWN_FLAG_BITS);
        let pte = Pte::from_raw(raw);
        let expected = match access {
            AccessKind::Read => PteFault::FaultOnRead,
            AccessKind::Write => PteFault::FaultOnWrite,
            AccessKind::Execute => PteFault::FaultOnExecute,
        };
        prop_assert_eq!(pte.check_access(mode, access), Err(expected));
    }

    /// Clearing the valid bit always yields `NotPresent`, regardless of
    /// which other flag bits, mode, or access kind are fuzzed alongside it.
    #[test]
    fn invalid_bit_always_wins(
        other_bits in 0u64..=KNOWN_FLAG_BITS,
        mode in modes(),
        access in accesses(),
    ) {
        let raw = (other_bits & KNOWN_FLAG_BITS) & !PteFlags::V.bits();
        let pte = Pte::from_raw(raw);
        prop_assert_eq!(pte.check_access(mode, access), Err(PteFault::NotPresent));
    }
}
