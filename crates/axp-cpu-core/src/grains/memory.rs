//! Memory grains: aligned/byte/word loads and stores, and the LL/SC
//! pair. `EA = R[Rb] + sign_extend16(disp)`
//! for every opcode in this family.

use crate::slot::{Slot, WriteBack};
use axp_cpu_decoder::opcode;
use axp_mmu::{SlotMicroCache, TranslateContext, TranslateResult, Translator};
use axp_smp::SmpCoherence;
use axp_types::{AccessKind, CpuId, MemoryBus, Realm};

/// Access width in bytes for a given memory-format opcode. `0` marks
/// opcodes this grain doesn't own (unaligned `_U` forms are handled by
/// the caller via a fixed quadword-aligned-down access).
fn width_of(op: u8) -> u32 {
    match op {
        opcode::LDBU | opcode::STB => 1,
        opcode::LDWU | opcode::STW => 2,
        opcode::LDL | opcode::STL | opcode::LDL_L | opcode::STL_C => 4,
        opcode::LDQ | opcode::STQ | opcode::LDQ_L | opcode::STQ_C | opcode::LDQ_U | opcode::STQ_U | opcode::LDA => 8,
        _ => 8,
    }
}

pub(crate) fn is_store(op: u8) -> bool {
    matches!(
        op,
        opcode::STB | opcode::STW | opcode::STL | opcode::STQ | opcode::STL_C | opcode::STQ_C | opcode::STQ_U
    )
}

fn is_locked(op: u8) -> bool {
    matches!(op, opcode::LDL_L | opcode::LDQ_L | opcode::STL_C | opcode::STQ_C)
}

/// Translate `slot.ea`, then perform the load or store. Faults land in
/// `slot.fault`; LL/SC outcomes and plain loads land in
/// `slot.load_result` (1/0 for a conditional store's success flag,
/// matching `STQ_C`'s architectural convention).
#[allow(clippy::too_many_arguments)]
pub fn execute(
    op: u8,
    ea: u64,
    slot: &mut Slot,
    translator: &Translator,
    ctx: &TranslateContext,
    micro_cache: &mut SlotMicroCache,
    smp: &SmpCoherence,
    cpu: CpuId,
    bus: &mut dyn MemoryBus,
) {
    let width = width_of(op);
    let access = if is_store(op) { AccessKind::Write } else { AccessKind::Read };

    let ea = if op == opcode::LDQ_U || op == opcode::STQ_U {
        ea & !7
    } else {
        ea
    };

    let translated = translator.translate(ctx, micro_cache, Realm::Data, ea, width, access, bus);
    let pa = match translated {
        TranslateResult::Success { pa, .. } => pa,
        other => {
            slot.fault = Some(crate::pipeline::fault_for_translate(other, ea, op, ctx.mode, slot.pc, slot.raw));
            return;
        }
    };
    slot.pa = pa;

    if is_locked(op) && !is_store(op) {
        let result = match width {
            4 => smp.load_locked_u32(cpu, pa).map(|v| v as u64),
            _ => smp.load_locked_u64(cpu, pa),
        };
        match result {
            Ok(v) => slot.load_result = v,
            Err(_) => slot.fault = Some(crate::pipeline::bus_fault(slot.pc, slot.raw, ctx.mode)),
        }
        return;
    }

    if op == opcode::STL_C || op == opcode::STQ_C {
        let ok = match width {
            4 => smp.store_conditional_u32(cpu, pa, slot.store_data as u32),
            _ => smp.store_conditional_u64(cpu, pa, slot.store_data),
        };
        match ok {
            Ok(success) => slot.load_result = success as u64,
            Err(_) => slot.fault = Some(crate::pipeline::bus_fault(slot.pc, slot.raw, ctx.mode)),
        }
        return;
    }

    if is_store(op) {
        let result = match width {
            1 => bus.write_u8(pa, slot.store_data as u8),
            2 => bus.write_u16(pa, slot.store_data as u16),
            4 => bus.write_u32(pa, slot.store_data as u32),
            _ => bus.write_u64(pa, slot.store_data),
        };
        if result.is_err() {
            slot.fault = Some(crate::pipeline::bus_fault(slot.pc, slot.raw, ctx.mode));
        } else {
            smp.reservations.invalidate_line(pa);
        }
        return;
    }

    let loaded = match width {
        1 => bus.read_u8(pa).map(|v| v as u64),
        2 => bus.read_u16(pa).map(|v| v as u64),
        4 => bus.read_u32(pa).map(|v| v as u64),
        _ => bus.read_u64(pa),
    };
    match loaded {
        Ok(v) => {
            slot.load_result = v;
            slot.writeback = Some(WriteBack {
                reg: ra_of(slot),
                value: sign_or_zero_extend(op, v),
                is_fp: false,
            });
        }
        Err(_) => slot.fault = Some(crate::pipeline::bus_fault(slot.pc, slot.raw, ctx.mode)),
    }
}

fn ra_of(slot: &Slot) -> u8 {
    match slot.decoded {
        Some(axp_cpu_decoder::DecodedInstr {
            form: axp_cpu_decoder::InstrFormat::Memory { ra, .. },
            ..
        }) => ra,
        _ => 31,
    }
}

fn sign_or_zero_extend(op: u8, v: u64) -> u64 {
    match op {
        opcode::LDBU | opcode::LDWU => v,
        opcode::LDL | opcode::LDL_L => v as u32 as i32 as i64 as u64,
        _ => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_matches_opcode_family() {
        assert_eq!(width_of(opcode::LDBU), 1);
        assert_eq!(width_of(opcode::LDWU), 2);
        assert_eq!(width_of(opcode::LDL), 4);
        assert_eq!(width_of(opcode::LDQ), 8);
    }

    #[test]
    fn stores_are_classified_correctly() {
        assert!(is_store(opcode::STQ));
        assert!(!is_store(opcode::LDQ));
        assert!(is_locked(opcode::STQ_C));
        assert!(!is_locked(opcode::STQ));
    }
}
