//! Pipeline Slot: the state one in-flight instruction carries through
//! IF/DE/IS/EX/MEM/WB.

use axp_cpu_decoder::DecodedInstr;
use axp_types::PendingEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Stage {
    If,
    De,
    Is,
    Ex,
    Mem,
    Wb,
}

/// What a stage handler tells the pipeline driver to do next.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StageOutcome {
    Continue,
    Stall,
    Fault,
    EnterPal,
    Complete,
}

/// A pending register commit, applied at WB. `is_fp` selects which
/// register file; R31/F31 destinations are legal to construct but
/// `IntRegFile`/`FpRegFile::write` silently discard them.
#[derive(Clone, Copy, Debug)]
pub struct WriteBack {
    pub reg: u8,
    pub value: u64,
    pub is_fp: bool,
}

/// One in-flight instruction. Constructed fresh by IF, mutated in place
/// as it's shifted through later stages, then dropped at retirement.
pub struct Slot {
    pub stage: Stage,
    pub pc: u64,
    pub raw: u32,
    pub decoded: Option<DecodedInstr>,

    /// Source operand values, resolved at IS (with bypass applied).
    pub ra_val: u64,
    pub rb_val: u64,

    /// Effective address for memory grains, computed at EX.
    pub ea: u64,
    /// Physical address, resolved at MEM after translation.
    pub pa: u64,
    pub access_width: u8,
    pub is_store: bool,
    pub store_data: u64,
    pub load_result: u64,

    /// ALU / PAL scalar result, available starting at EX.
    pub writeback: Option<WriteBack>,

    pub predicted_taken: bool,
    pub branch_target: u64,
    pub actual_taken: Option<bool>,
    pub is_branch: bool,

    /// Set by any stage that detects a fault; once set, later stages
    /// skip their real work and the instruction never retires at WB
    /// for any later stage that would otherwise touch it.
    pub fault: Option<PendingEvent>,

    pub is_barrier: bool,
    pub is_pal: bool,
}

impl Slot {
    pub fn new(pc: u64, raw: u32) -> Self {
        Slot {
            stage: Stage::If,
            pc,
            raw,
            decoded: None,
            ra_val: 0,
            rb_val: 0,
            ea: 0,
            pa: 0,
            access_width: 0,
            is_store: false,
            store_data: 0,
            load_result: 0,
            writeback: None,
            predicted_taken: false,
            branch_target: 0,
            actual_taken: None,
            is_branch: false,
            fault: None,
            is_barrier: false,
            is_pal: false,
        }
    }

    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }
}
