//! State-save sequence, PAL exit, and context switch.

use crate::priority::{select, take, Selected};
use crate::queue::PendingEventQueue;
use axp_types::{ColdIprBank, CurrentMode, ExceptionClass, HotIprBank, Hwpcb, PendingEvent, PendingEventKind, Ps};

/// Outcome of one recognition-point delivery attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeliverOutcome {
    NoPendingEvent,
    Delivered { class: ExceptionClass, entry_pc: u64 },
    /// The nested-PAL-frame cap was hit; state was left untouched and the
    /// caller must treat this like a machine check (fail closed rather
    /// than risk corrupting IPR state mid-save).
    FrameCapExceeded,
}

/// 14-bit offset within the PAL image for each exception class. This is
/// an internal numbering scheme for this emulator, not a claim of
/// bit-exact compatibility with any real PALcode image.
const fn entry_offset(class: ExceptionClass) -> u16 {
    match class {
        ExceptionClass::ItbMiss => 0x100,
        ExceptionClass::ItbAccessViolation => 0x108,
        ExceptionClass::FaultOnExecute => 0x110,
        ExceptionClass::IllegalOpcode => 0x118,
        ExceptionClass::OpcodeDecodeError => 0x120,
        ExceptionClass::UnalignedFetch => 0x128,
        ExceptionClass::DtbMissSingle => 0x200,
        ExceptionClass::DtbMissDouble => 0x208,
        ExceptionClass::DtbAccessViolation => 0x210,
        ExceptionClass::FaultOnRead => 0x218,
        ExceptionClass::FaultOnWrite => 0x220,
        ExceptionClass::UnalignedData => 0x228,
        ExceptionClass::DStreamError => 0x230,
        ExceptionClass::ArithmeticOverflow
        | ExceptionClass::FpInvalid
        | ExceptionClass::FpDivByZero
        | ExceptionClass::FpOverflow
        | ExceptionClass::FpUnderflow
        | ExceptionClass::FpInexact
        | ExceptionClass::FloatingDisabled => 0x300,
        ExceptionClass::PrivilegedInstruction | ExceptionClass::InvalidIprAccess => 0x308,
        ExceptionClass::HardwareInterrupt => 0x400,
        ExceptionClass::TimerInterrupt => 0x408,
        ExceptionClass::InterProcessorInterrupt => 0x410,
        ExceptionClass::PerfCounterOverflow => 0x418,
        ExceptionClass::PassiveRelease => 0x420,
        ExceptionClass::Console => 0x428,
        ExceptionClass::PowerFail => 0x430,
        ExceptionClass::AstKernel => 0x500,
        ExceptionClass::AstExecutive => 0x508,
        ExceptionClass::AstSupervisor => 0x510,
        ExceptionClass::AstUser => 0x518,
        ExceptionClass::MachineCheckCorrectable => 0x000,
        ExceptionClass::MachineCheckUncorrectable => 0x008,
        ExceptionClass::Breakpoint => 0x600,
        ExceptionClass::BugCheck => 0x608,
        ExceptionClass::ChmKernel => 0x610,
        ExceptionClass::ChmExecutive => 0x618,
        ExceptionClass::ChmSupervisor => 0x620,
        ExceptionClass::ChmUser => 0x628,
        ExceptionClass::GenTrap => 0x630,
        ExceptionClass::CallSys => 0x638,
        ExceptionClass::CallPal(_) => 0x700,
    }
}

/// Per-CPU interrupt/exception controller: owns the pending-event queue
/// and the delivery/exit/context-switch operations that act on it.
#[derive(Default)]
pub struct InterruptController {
    queue: PendingEventQueue,
}

impl InterruptController {
    pub fn new() -> Self {
        InterruptController::default()
    }

    pub fn queue(&self) -> &PendingEventQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut PendingEventQueue {
        &mut self.queue
    }

    /// File a new event into the queue slot matching its `kind`.
    pub fn raise(&mut self, event: PendingEvent) {
        match event.kind {
            PendingEventKind::MachineCheck => self.queue.raise_machine_check(event),
            PendingEventKind::Reset => self.queue.raise_reset(event),
            PendingEventKind::Exception => self.queue.raise_sync_fault(event),
            PendingEventKind::Interrupt => self.queue.raise_external_interrupt(event),
            PendingEventKind::Ast => self.queue.raise_ast(event),
            PendingEventKind::PalCall => self.queue.raise_sync_fault(event),
        }
    }

    /// Attempt to deliver the highest-priority pending event, performing
    /// the full state-save sequence against `hot`/`cold`/`hwpcb`.
    pub fn deliver(&mut self, hot: &mut HotIprBank, cold: &ColdIprBank, hwpcb: &mut Hwpcb) -> DeliverOutcome {
        let selected = match select(&self.queue, hot, cold) {
            Some(s) => s,
            None => return DeliverOutcome::NoPendingEvent,
        };

        if !self.queue.try_enter_frame() {
            return DeliverOutcome::FrameCapExceeded;
        }

        let clear_ast_bit = matches!(selected, Selected::Ast(_));
        let event = take(&mut self.queue, selected);

        // 1-2. Save PC and PS into EXC_ADDR and the active HWPCB.
        hot.exc_addr = event.pc;
        hwpcb.pc = event.pc;
        hwpcb.ps = hot.ps;

        // 3. Update EXC_SUM.
        if let Some(bit) = event.class.exc_sum_bit() {
            hot.exc_sum |= 1u64 << bit;
        }
        hot.exc_sum |= ((event.extra_info as u64) & 0xFFFF) << 16;

        // 4. Update MM_STAT for memory faults.
        if event.class.is_memory_fault() {
            hot.mm_stat = event.mm_stat();
        }

        // 5. Write fault VA if non-zero.
        if let Some(va) = event.fault_va {
            if va != 0 {
                hot.va = va;
            }
        }

        // 6. Set PS: CM = kernel, IPL = event's class-specified level,
        // VMM/IP cleared; SP_ALIGN and SW preserved.
        let preserved_sp_align = hot.ps.sp_align();
        let preserved_sw = hot.ps.sw();
        hot.ps = Ps::from_raw(0)
            .with_current_mode(CurrentMode::Kernel)
            .with_ipl(event.ipl)
            .with_sp_align(preserved_sp_align)
            .with_sw(preserved_sw);

        // 7. Switch stack to KSP.
        // (KSP is already the architectural register; nothing to copy,
        // the kernel-mode SP read path now resolves through it.)

        // 8. Set PC = PAL_BASE + entry_offset, PAL-mode bit set.
        let entry_pc = cold.pal_base + entry_offset(event.class) as u64;
        hot.pc = entry_pc | 1;

        // 10. Clear ASTSR bit for delivered ASTs.
        if clear_ast_bit {
            hot.astsr &= !(1u8 << (event.source_bit & 7));
        }

        tracing::debug!(class = ?event.class, entry_pc, "delivering pending event");

        DeliverOutcome::Delivered {
            class: event.class,
            entry_pc,
        }
    }

    /// PAL exit (REI/RTI/RETSYS): restore PS/PC from the saved-context
    /// slot, clear the PAL-mode bit, and drop one nesting level.
    pub fn pal_exit(&mut self, hot: &mut HotIprBank, hwpcb: &Hwpcb) {
        hot.ps = hwpcb.ps;
        hot.pc = hwpcb.pc & !1;
        self.queue.exit_frame();
    }

    /// SWPCTX: atomically move architectural state between HWPCBs. The
    /// caller is responsible for invalidating the LL/SC reservation
    /// (`axp-smp`'s reservation table), since this crate has no
    /// visibility into SMP state.
    pub fn swpctx(hot: &mut HotIprBank, outbound: &mut Hwpcb, inbound: &Hwpcb) {
        outbound.ptbr = hot.ptbr;
        outbound.asn = hot.asn;
        outbound.ksp = hot.ksp;
        outbound.esp = hot.esp;
        outbound.ssp = hot.ssp;
        outbound.usp = hot.usp;
        outbound.pc = hot.pc;
        outbound.ps = hot.ps;

        hot.ptbr = inbound.ptbr;
        hot.asn = inbound.asn;
        hot.ksp = inbound.ksp;
        hot.esp = inbound.esp;
        hot.ssp = inbound.ssp;
        hot.usp = inbound.usp;
        hot.pc = inbound.pc;
        hot.ps = inbound.ps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axp_types::CurrentMode;

    fn make_hot() -> HotIprBank {
        let mut hot = HotIprBank::default();
        hot.ps = Ps::from_raw(0).with_current_mode(CurrentMode::User).with_ipl(0);
        hot
    }

    #[test]
    fn deliver_with_no_pending_event_is_a_no_op() {
        let mut ctrl = InterruptController::new();
        let mut hot = make_hot();
        let cold = ColdIprBank::default();
        let mut hwpcb = Hwpcb::default();
        assert_eq!(ctrl.deliver(&mut hot, &cold, &mut hwpcb), DeliverOutcome::NoPendingEvent);
    }

    #[test]
    fn sync_fault_delivery_saves_pc_ps_and_vectors_to_pal() {
        let mut ctrl = InterruptController::new();
        let mut hot = make_hot();
        let mut cold = ColdIprBank::default();
        cold.pal_base = 0x1_0000;
        let mut hwpcb = Hwpcb::default();

        let event = PendingEvent::exception(ExceptionClass::DtbMissSingle, 0x4000, CurrentMode::User)
            .with_fault_va(0x8000)
            .with_access(false, false);
        ctrl.raise(event);

        let outcome = ctrl.deliver(&mut hot, &cold, &mut hwpcb);
        assert_eq!(
            outcome,
            DeliverOutcome::Delivered {
                class: ExceptionClass::DtbMissSingle,
                entry_pc: 0x1_0000 + 0x200,
            }
        );
        assert_eq!(hot.exc_addr, 0x4000);
        assert_eq!(hwpcb.pc, 0x4000);
        assert_eq!(hot.va, 0x8000);
        assert_eq!(hot.ps.current_mode(), CurrentMode::Kernel);
        assert_eq!(hot.pc, 0x1_0000 + 0x200 + 1);
        assert_eq!(hot.exc_sum & 1, 1);
    }

    #[test]
    fn pal_exit_restores_saved_state_and_clears_pal_mode_bit() {
        let mut ctrl = InterruptController::new();
        let mut hot = make_hot();
        let hwpcb = Hwpcb {
            pc: 0x2000 | 1,
            ps: Ps::from_raw(0).with_current_mode(CurrentMode::User),
            ..Hwpcb::default()
        };
        ctrl.pal_exit(&mut hot, &hwpcb);
        assert_eq!(hot.pc, 0x2000);
        assert_eq!(hot.ps.current_mode(), CurrentMode::User);
    }

    #[test]
    fn frame_cap_exceeded_fails_closed_without_mutating_state() {
        let mut ctrl = InterruptController::new();
        let mut hot = make_hot();
        let cold = ColdIprBank::default();
        let mut hwpcb = Hwpcb::default();

        for _ in 0..crate::queue::MAX_NESTED_PAL_FRAMES {
            ctrl.raise(PendingEvent::exception(ExceptionClass::DtbMissSingle, 0x10, CurrentMode::User));
            ctrl.deliver(&mut hot, &cold, &mut hwpcb);
        }

        ctrl.raise(PendingEvent::exception(ExceptionClass::DtbMissSingle, 0x20, CurrentMode::User));
        let pc_before = hot.pc;
        let outcome = ctrl.deliver(&mut hot, &cold, &mut hwpcb);
        assert_eq!(outcome, DeliverOutcome::FrameCapExceeded);
        assert_eq!(hot.pc, pc_before);
    }
}
