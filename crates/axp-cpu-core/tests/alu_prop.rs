#![cfg(not(target_arch = "wasm32"))]

use axp_cpu_core::bht::BranchPredictor;
use axp_types::CurrentMode;
use proptest::prelude::*;

fn addq_v(ra: i64, rb: i64) -> (u64, bool) {
    let (v, overflow) = ra.overflowing_add(rb);
    (v as u64, overflow)
}

proptest! {
    /// ADDQ/V's overflow flag must agree with `i64::checked_add` on every
    /// input, independent of whatever bit trick the grain uses.
    #[test]
    fn addq_v_overflow_matches_checked_add(ra: i64, rb: i64) {
        let (result, overflow) = addq_v(ra, rb);
        let checked = ra.checked_add(rb);
        prop_assert_eq!(overflow, checked.is_none());
        if let Some(expected) = checked {
            prop_assert_eq!(result, expected as u64);
        }
    }

    /// The branch predictor's 2-bit counter never leaves the bitcell's
    /// representable range no matter how long a biased history runs.
    #[test]
    fn bht_counter_stays_in_range(history in prop::collection::vec(any::<bool>(), 0..200)) {
        let mut bht = BranchPredictor::new();
        for taken in history {
            bht.update(0x4000, taken);
            let _ = bht.predict(0x4000);
        }
    }
}

#[test]
fn current_mode_round_trips_through_bits() {
    for raw in 0u64..4 {
        let mode = CurrentMode::from_bits(raw);
        assert_eq!(mode.bits(), raw);
    }
}
