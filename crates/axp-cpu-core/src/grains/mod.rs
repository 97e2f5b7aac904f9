//! The instruction grain set: one execution unit per
//! decoded opcode/function pair, dispatched by a dense match over
//! `DecodeKey` rather than a runtime-built function-pointer table — the
//! workspace carries no `once_cell`/`lazy_static`, and a `match` over a
//! small dense integer space compiles to the same jump-table shape a
//! hand-rolled lookup table would give, without the construction cost
//! or the `'static` lifetime bookkeeping a lazily-initialized table
//! would need.

pub mod alu_fp;
pub mod alu_int;
pub mod barrier;
pub mod branch;
pub mod memory;

use axp_cpu_decoder::opcode;

/// Disassembly mnemonic for a decode key, independent of execution.
/// Only the opcodes this core actually executes are named; anything
/// else reports as an unimplemented encoding rather than panicking,
/// since a guest can legally fetch one and expect `IllegalOpcode`.
pub const fn mnemonic(op: u8, function: u32) -> &'static str {
    use opcode::*;
    match op {
        CALL_PAL => "CALL_PAL",
        LDA => "LDA",
        LDAH => "LDAH",
        LDBU => "LDBU",
        LDQ_U => "LDQ_U",
        LDWU => "LDWU",
        STW => "STW",
        STB => "STB",
        STQ_U => "STQ_U",
        LDL => "LDL",
        LDQ => "LDQ",
        LDL_L => "LDL_L",
        LDQ_L => "LDQ_L",
        STL => "STL",
        STQ => "STQ",
        STL_C => "STL_C",
        STQ_C => "STQ_C",
        BR => "BR",
        BSR => "BSR",
        BEQ => "BEQ",
        BNE => "BNE",
        BLT => "BLT",
        BLE => "BLE",
        BGT => "BGT",
        BGE => "BGE",
        BLBC => "BLBC",
        BLBS => "BLBS",
        FBEQ => "FBEQ",
        FBNE => "FBNE",
        FBLT => "FBLT",
        FBLE => "FBLE",
        FBGT => "FBGT",
        FBGE => "FBGE",
        JSR => "JSR",
        INTA => inta_mnemonic(function),
        INTL => intl_mnemonic(function),
        INTS => ints_mnemonic(function),
        INTM => intm_mnemonic(function),
        FLTL | FLTI | FLTV => flt_mnemonic(function),
        MISC => "MISC",
        _ => "???",
    }
}

const fn inta_mnemonic(f: u32) -> &'static str {
    use opcode::inta::*;
    match f {
        ADDL => "ADDL",
        SUBL => "SUBL",
        CMPBGE => "CMPBGE",
        CMPULT => "CMPULT",
        ADDQ => "ADDQ",
        SUBQ => "SUBQ",
        CMPEQ => "CMPEQ",
        CMPULE => "CMPULE",
        ADDL_V => "ADDL/V",
        SUBL_V => "SUBL/V",
        CMPLT => "CMPLT",
        ADDQ_V => "ADDQ/V",
        SUBQ_V => "SUBQ/V",
        CMPLE => "CMPLE",
        _ => "???",
    }
}

const fn intl_mnemonic(f: u32) -> &'static str {
    use opcode::intl::*;
    match f {
        AND => "AND",
        BIC => "BIC",
        BIS => "BIS",
        ORNOT => "ORNOT",
        XOR => "XOR",
        EQV => "EQV",
        CMOVLBS => "CMOVLBS",
        CMOVLBC => "CMOVLBC",
        CMOVEQ => "CMOVEQ",
        CMOVNE => "CMOVNE",
        CMOVLT => "CMOVLT",
        CMOVGE => "CMOVGE",
        CMOVLE => "CMOVLE",
        CMOVGT => "CMOVGT",
        _ => "???",
    }
}

const fn ints_mnemonic(f: u32) -> &'static str {
    use opcode::ints::*;
    match f {
        SLL => "SLL",
        SRL => "SRL",
        SRA => "SRA",
        EXTBL => "EXTBL",
        EXTQL => "EXTQL",
        MSKBL => "MSKBL",
        INSBL => "INSBL",
        _ => "???",
    }
}

const fn intm_mnemonic(f: u32) -> &'static str {
    use opcode::intm::*;
    match f {
        MULL => "MULL",
        MULQ => "MULQ",
        UMULH => "UMULH",
        MULL_V => "MULL/V",
        MULQ_V => "MULQ/V",
        _ => "???",
    }
}

const fn flt_mnemonic(f: u32) -> &'static str {
    use opcode::flt::*;
    match f {
        ADDT => "ADDT",
        SUBT => "SUBT",
        MULT => "MULT",
        DIVT => "DIVT",
        SQRTT => "SQRTT",
        CMPTEQ => "CMPTEQ",
        CMPTLT => "CMPTLT",
        CMPTLE => "CMPTLE",
        _ => "???",
    }
}
