//! Integer ALU grains: ADD/SUB/CMP/logical/shift/CMOV families.

use crate::slot::{Slot, WriteBack};
use axp_cpu_decoder::opcode::{inta, intl, intm, ints};
use axp_types::{ExceptionClass, PendingEvent};

fn low32(v: u64) -> u32 {
    v as u32
}

fn sext32(v: u32) -> u64 {
    v as i32 as i64 as u64
}

/// Execute an `INTA`/`INTL`/`INTS`/`INTM` operate-format instruction.
/// `rb_val` is already resolved to either the register value or the
/// zero-extended 8-bit literal by the caller (IS stage), per the
/// decode contract's `uses_literal` bit.
pub fn execute(
    function: u32,
    opcode: u8,
    ra: u64,
    rb: u64,
    slot: &mut Slot,
    rc: u8,
    iv_enabled: bool,
    mode: axp_types::CurrentMode,
) {
    let mut overflow = false;
    let result: u64 = match opcode {
        op if op == axp_cpu_decoder::opcode::INTA => match function {
            inta::ADDL => sext32(low32(ra).wrapping_add(low32(rb))),
            inta::SUBL => sext32(low32(ra).wrapping_sub(low32(rb))),
            inta::CMPBGE => cmpbge(ra, rb),
            inta::CMPULT => (ra < rb) as u64,
            inta::ADDQ => ra.wrapping_add(rb),
            inta::SUBQ => ra.wrapping_sub(rb),
            inta::CMPEQ => (ra == rb) as u64,
            inta::CMPULE => (ra <= rb) as u64,
            inta::ADDL_V => {
                let (v, ovf) = (low32(ra) as i32).overflowing_add(low32(rb) as i32);
                overflow = ovf;
                sext32(v as u32)
            }
            inta::SUBL_V => {
                let (v, ovf) = (low32(ra) as i32).overflowing_sub(low32(rb) as i32);
                overflow = ovf;
                sext32(v as u32)
            }
            inta::CMPLT => ((ra as i64) < (rb as i64)) as u64,
            inta::ADDQ_V => {
                let (v, ovf) = (ra as i64).overflowing_add(rb as i64);
                overflow = ovf;
                v as u64
            }
            inta::SUBQ_V => {
                let (v, ovf) = (ra as i64).overflowing_sub(rb as i64);
                overflow = ovf;
                v as u64
            }
            inta::CMPLE => ((ra as i64) <= (rb as i64)) as u64,
            _ => 0,
        },
        op if op == axp_cpu_decoder::opcode::INTL => match function {
            intl::AND => ra & rb,
            intl::BIC => ra & !rb,
            intl::CMOVLBS => {
                if ra & 1 != 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::CMOVLBC => {
                if ra & 1 == 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::BIS => ra | rb,
            intl::CMOVEQ => {
                if ra == 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::CMOVNE => {
                if ra != 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::ORNOT => ra | !rb,
            intl::XOR => ra ^ rb,
            intl::CMOVLT => {
                if (ra as i64) < 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::CMOVGE => {
                if (ra as i64) >= 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::EQV => !(ra ^ rb),
            intl::CMOVLE => {
                if (ra as i64) <= 0 {
                    rb
                } else {
                    return;
                }
            }
            intl::CMOVGT => {
                if (ra as i64) > 0 {
                    rb
                } else {
                    return;
                }
            }
            _ => 0,
        },
        op if op == axp_cpu_decoder::opcode::INTS => match function {
            ints::SLL => ra.wrapping_shl((rb & 0x3F) as u32),
            ints::SRL => ra.wrapping_shr((rb & 0x3F) as u32),
            ints::SRA => ((ra as i64) >> (rb & 0x3F)) as u64,
            ints::EXTBL => (ra >> ((rb & 7) * 8)) & 0xFF,
            ints::EXTQL => ra >> ((rb & 7) * 8),
            ints::MSKBL => ra & !(0xFFu64 << ((rb & 7) * 8)),
            ints::INSBL => (ra & 0xFF) << ((rb & 7) * 8),
            _ => 0,
        },
        op if op == axp_cpu_decoder::opcode::INTM => match function {
            intm::MULL => sext32(low32(ra).wrapping_mul(low32(rb))),
            intm::MULQ => ra.wrapping_mul(rb),
            intm::UMULH => (((ra as u128) * (rb as u128)) >> 64) as u64,
            intm::MULL_V => {
                let (v, ovf) = (low32(ra) as i32).overflowing_mul(low32(rb) as i32);
                overflow = ovf;
                sext32(v as u32)
            }
            intm::MULQ_V => {
                let (v, ovf) = (ra as i64).overflowing_mul(rb as i64);
                overflow = ovf;
                v as u64
            }
            _ => 0,
        },
        _ => 0,
    };

    slot.writeback = Some(WriteBack { reg: rc, value: result, is_fp: false });

    if overflow && iv_enabled {
        slot.fault = Some(
            PendingEvent::exception(ExceptionClass::ArithmeticOverflow, slot.pc, mode)
                .with_raw_instruction(slot.raw),
        );
    }
}

fn cmpbge(ra: u64, rb: u64) -> u64 {
    let mut result = 0u64;
    for byte in 0..8 {
        let a = ((ra >> (byte * 8)) & 0xFF) as u8;
        let b = ((rb >> (byte * 8)) & 0xFF) as u8;
        if a >= b {
            result |= 1 << byte;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addq_v_overflow_sets_fault_when_iv_enabled() {
        let mut slot = Slot::new(0x1000, 0);
        execute(
            inta::ADDQ_V,
            axp_cpu_decoder::opcode::INTA,
            0x7FFF_FFFF_FFFF_FFFF,
            1,
            &mut slot,
            3,
            true,
            axp_types::CurrentMode::Kernel,
        );
        assert_eq!(slot.writeback.unwrap().value, 0x8000_0000_0000_0000);
        assert!(slot.fault.is_some());
    }

    #[test]
    fn addq_v_overflow_suppressed_without_iv() {
        let mut slot = Slot::new(0x1000, 0);
        execute(
            inta::ADDQ_V,
            axp_cpu_decoder::opcode::INTA,
            0x7FFF_FFFF_FFFF_FFFF,
            1,
            &mut slot,
            3,
            false,
            axp_types::CurrentMode::Kernel,
        );
        assert!(slot.fault.is_none());
    }

    #[test]
    fn addq_no_overflow_check() {
        let mut slot = Slot::new(0x1000, 0);
        execute(
            inta::ADDQ,
            axp_cpu_decoder::opcode::INTA,
            1,
            2,
            &mut slot,
            3,
            true,
            axp_types::CurrentMode::Kernel,
        );
        assert_eq!(slot.writeback.unwrap().value, 3);
        assert!(slot.fault.is_none());
    }
}
