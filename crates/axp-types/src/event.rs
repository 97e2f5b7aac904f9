//! Pending Event model: tagged records describing a deliverable exception
//! or interrupt, queued at detection and consumed at the architectural
//! recognition point.

use crate::ps::CurrentMode;

/// Top-level classification of a pending event, used for priority
/// ordering.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub enum PendingEventKind {
    MachineCheck,
    Reset,
    Exception,
    Interrupt,
    Ast,
    PalCall,
}

/// Fine-grained exception/interrupt class. Drives EXC_SUM/MM_STAT bit
/// assignment and PAL entry-offset selection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ExceptionClass {
    ItbMiss,
    ItbAccessViolation,
    FaultOnExecute,
    IllegalOpcode,
    OpcodeDecodeError,
    UnalignedFetch,
    DtbMissSingle,
    DtbMissDouble,
    DtbAccessViolation,
    FaultOnRead,
    FaultOnWrite,
    UnalignedData,
    DStreamError,
    ArithmeticOverflow,
    FpInvalid,
    FpDivByZero,
    FpOverflow,
    FpUnderflow,
    FpInexact,
    FloatingDisabled,
    PrivilegedInstruction,
    InvalidIprAccess,
    HardwareInterrupt,
    TimerInterrupt,
    InterProcessorInterrupt,
    PerfCounterOverflow,
    PassiveRelease,
    Console,
    PowerFail,
    AstKernel,
    AstExecutive,
    AstSupervisor,
    AstUser,
    MachineCheckCorrectable,
    MachineCheckUncorrectable,
    Breakpoint,
    BugCheck,
    ChmKernel,
    ChmExecutive,
    ChmSupervisor,
    ChmUser,
    GenTrap,
    CallSys,
    CallPal(u32),
}

impl ExceptionClass {
    /// EXC_SUM bit assignment. Not every class
    /// sets an EXC_SUM bit; those return `None`.
    pub const fn exc_sum_bit(self) -> Option<u32> {
        match self {
            ExceptionClass::ItbMiss | ExceptionClass::DtbMissSingle | ExceptionClass::DtbMissDouble => Some(0),
            ExceptionClass::ItbAccessViolation | ExceptionClass::DtbAccessViolation => Some(1),
            ExceptionClass::UnalignedFetch | ExceptionClass::UnalignedData => Some(2),
            ExceptionClass::DStreamError => Some(3),
            ExceptionClass::IllegalOpcode | ExceptionClass::OpcodeDecodeError => Some(4),
            _ => None,
        }
    }

    /// Whether this class carries a memory access (drives MM_STAT).
    pub const fn is_memory_fault(self) -> bool {
        matches!(
            self,
            ExceptionClass::ItbMiss
                | ExceptionClass::ItbAccessViolation
                | ExceptionClass::FaultOnExecute
                | ExceptionClass::UnalignedFetch
                | ExceptionClass::DtbMissSingle
                | ExceptionClass::DtbMissDouble
                | ExceptionClass::DtbAccessViolation
                | ExceptionClass::FaultOnRead
                | ExceptionClass::FaultOnWrite
                | ExceptionClass::UnalignedData
                | ExceptionClass::DStreamError
        )
    }

    pub const fn is_itb(self) -> bool {
        matches!(
            self,
            ExceptionClass::ItbMiss
                | ExceptionClass::ItbAccessViolation
                | ExceptionClass::FaultOnExecute
                | ExceptionClass::UnalignedFetch
        )
    }
}

/// A deliverable exception or interrupt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEvent {
    pub kind: PendingEventKind,
    pub class: ExceptionClass,
    pub fault_va: Option<u64>,
    pub fault_pa: Option<u64>,
    pub mode: CurrentMode,
    pub is_write: bool,
    pub is_execute: bool,
    pub raw_instruction: Option<u32>,
    /// FP exception summary bits / other per-class extra info.
    pub extra_info: u32,
    /// PC of the instruction this event is attached to.
    pub pc: u64,
    /// IPL this event is delivered at. Meaningless for synchronous
    /// faults (always delivered at the instruction boundary); required
    /// for interrupts and ASTs to apply `PS.IPL` masking.
    pub ipl: u8,
    /// Bit index into the owning queue's enable mask (EIEN for
    /// hardware interrupts, SIEN for software interrupts, ASTEN/ASTSR
    /// for ASTs). Unused for synchronous faults.
    pub source_bit: u8,
}

impl PendingEvent {
    pub fn exception(class: ExceptionClass, pc: u64, mode: CurrentMode) -> Self {
        PendingEvent {
            kind: PendingEventKind::Exception,
            class,
            fault_va: None,
            fault_pa: None,
            mode,
            is_write: false,
            is_execute: false,
            raw_instruction: None,
            extra_info: 0,
            pc,
            ipl: 0,
            source_bit: 0,
        }
    }

    pub fn with_kind(mut self, kind: PendingEventKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_ipl(mut self, ipl: u8) -> Self {
        self.ipl = ipl;
        self
    }

    pub fn with_source_bit(mut self, bit: u8) -> Self {
        self.source_bit = bit;
        self
    }

    pub fn with_fault_va(mut self, va: u64) -> Self {
        self.fault_va = Some(va);
        self
    }

    pub fn with_fault_pa(mut self, pa: u64) -> Self {
        self.fault_pa = Some(pa);
        self
    }

    pub fn with_access(mut self, is_write: bool, is_execute: bool) -> Self {
        self.is_write = is_write;
        self.is_execute = is_execute;
        self
    }

    pub fn with_raw_instruction(mut self, raw: u32) -> Self {
        self.raw_instruction = Some(raw);
        self
    }

    pub fn with_extra_info(mut self, extra: u32) -> Self {
        self.extra_info = extra;
        self
    }

    /// MM_STAT bit assignment: bit 0 isWrite, bit 1
    /// isExecute, bits 7:4 fault-type code, bit 8 ITB-vs-DTB.
    pub fn mm_stat(&self) -> u32 {
        let mut v = 0u32;
        if self.is_write {
            v |= 1 << 0;
        }
        if self.is_execute {
            v |= 1 << 1;
        }
        v |= (fault_type_code(self.class) as u32 & 0xF) << 4;
        if self.class.is_itb() {
            v |= 1 << 8;
        }
        v
    }
}

/// 4-bit fault-type code used in MM_STAT bits 7:4.
const fn fault_type_code(class: ExceptionClass) -> u8 {
    match class {
        ExceptionClass::ItbMiss | ExceptionClass::DtbMissSingle => 0,
        ExceptionClass::DtbMissDouble => 1,
        ExceptionClass::ItbAccessViolation | ExceptionClass::DtbAccessViolation => 2,
        ExceptionClass::FaultOnRead => 3,
        ExceptionClass::FaultOnWrite => 4,
        ExceptionClass::FaultOnExecute => 5,
        ExceptionClass::UnalignedFetch | ExceptionClass::UnalignedData => 6,
        ExceptionClass::DStreamError => 7,
        _ => 0xF,
    }
}
