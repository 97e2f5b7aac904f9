//! Branch grains: conditional/unconditional branches and `JMP`/`JSR`/
//! `RET`. Resolution here feeds both the
//! branch predictor update and the pipeline's flush decision.

use axp_cpu_decoder::opcode::{self, jsr_kind};

/// `target = PC + 4 + disp21 * 4` for every `Branch`-format opcode.
pub fn branch_target(pc: u64, disp21: i32) -> u64 {
    (pc.wrapping_add(4) as i64).wrapping_add((disp21 as i64) * 4) as u64
}

/// Evaluate whether a conditional branch is taken. `BR`/`BSR` are always
/// taken; `JMP`/`JSR`/`RET`/`JSR_COROUTINE` aren't `Branch`-format and
/// are resolved by `jsr_target` instead.
pub fn is_taken(op: u8, ra_val: u64, fa_val: u64) -> bool {
    match op {
        opcode::BR | opcode::BSR => true,
        opcode::BEQ => ra_val == 0,
        opcode::BNE => ra_val != 0,
        opcode::BLT => (ra_val as i64) < 0,
        opcode::BLE => (ra_val as i64) <= 0,
        opcode::BGT => (ra_val as i64) > 0,
        opcode::BGE => (ra_val as i64) >= 0,
        opcode::BLBC => ra_val & 1 == 0,
        opcode::BLBS => ra_val & 1 != 0,
        opcode::FBEQ => f64::from_bits(fa_val) == 0.0,
        opcode::FBNE => f64::from_bits(fa_val) != 0.0,
        opcode::FBLT => f64::from_bits(fa_val) < 0.0,
        opcode::FBLE => f64::from_bits(fa_val) <= 0.0,
        opcode::FBGT => f64::from_bits(fa_val) > 0.0,
        opcode::FBGE => f64::from_bits(fa_val) >= 0.0,
        _ => false,
    }
}

/// `JMP`/`JSR`/`RET`/`JSR_COROUTINE` share opcode `0x1A` (`JSR`) and a
/// memory-like encoding; the sub-kind lives in disp16 bits 15:14. The
/// target is always `R[Rb] & ~3` regardless of sub-kind; what differs
/// is only whether the low two bits of the target feed return-address
/// stack prediction (not modeled here).
pub fn jsr_target(rb_val: u64) -> u64 {
    rb_val & !3
}

pub fn jsr_kind_of(disp16: i16) -> u8 {
    ((disp16 as u16 >> 14) & 0b11) as u8
}

pub const _JMP: u8 = jsr_kind::JMP;
pub const _JSR: u8 = jsr_kind::JSR;
pub const _RET: u8 = jsr_kind::RET;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_follows_pc_plus_4_plus_disp_times_4() {
        assert_eq!(branch_target(0x1000, 1), 0x1008);
        assert_eq!(branch_target(0x1000, -1), 0x1000);
    }

    #[test]
    fn beq_taken_iff_zero() {
        assert!(is_taken(opcode::BEQ, 0, 0));
        assert!(!is_taken(opcode::BEQ, 1, 0));
    }

    #[test]
    fn jsr_target_clears_low_bits() {
        assert_eq!(jsr_target(0x2003), 0x2000);
    }
}
