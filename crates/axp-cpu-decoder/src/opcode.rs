//! Opcode and function-code constants, as laid out in the Alpha
//! architecture manual. Only the opcodes this core's instruction grains
//! actually execute are named; this is a representative subset of the
//! full ISA, not an exhaustive encoding of every Alpha instruction.

pub const CALL_PAL: u8 = 0x00;

pub const LDA: u8 = 0x08;
pub const LDAH: u8 = 0x09;
pub const LDBU: u8 = 0x0A;
pub const LDQ_U: u8 = 0x0B;
pub const LDWU: u8 = 0x0C;
pub const STW: u8 = 0x0D;
pub const STB: u8 = 0x0E;
pub const STQ_U: u8 = 0x0F;

pub const INTA: u8 = 0x10; // ADD/SUB/CMP family
pub const INTL: u8 = 0x11; // AND/OR/XOR/CMOVxx family
pub const INTS: u8 = 0x12; // shift/mask/extract/insert family
pub const INTM: u8 = 0x13; // MUL family

pub const ITFP: u8 = 0x14;
pub const FLTV: u8 = 0x15;
pub const FLTI: u8 = 0x16;
pub const FLTL: u8 = 0x17;

pub const MISC: u8 = 0x18; // TRAPB/EXCB/MB/WMB/FETCH/FETCH_M/RS/ECB
pub const HW_MFPR: u8 = 0x19;
pub const JSR: u8 = 0x1A; // JMP/JSR/RET/JSR_COROUTINE share this opcode
pub const HW_LD: u8 = 0x1B;
pub const FPTI: u8 = 0x1C;
pub const HW_MTPR: u8 = 0x1D;
pub const HW_REI: u8 = 0x1E;
pub const HW_ST: u8 = 0x1F;

pub const LDF: u8 = 0x20;
pub const LDG: u8 = 0x21;
pub const LDS: u8 = 0x22;
pub const LDT: u8 = 0x23;
pub const STF: u8 = 0x24;
pub const STG: u8 = 0x25;
pub const STS: u8 = 0x26;
pub const STT: u8 = 0x27;

pub const LDL: u8 = 0x28;
pub const LDQ: u8 = 0x29;
pub const LDL_L: u8 = 0x2A;
pub const LDQ_L: u8 = 0x2B;
pub const STL: u8 = 0x2C;
pub const STQ: u8 = 0x2D;
pub const STL_C: u8 = 0x2E;
pub const STQ_C: u8 = 0x2F;

pub const BR: u8 = 0x30;
pub const FBEQ: u8 = 0x31;
pub const FBLT: u8 = 0x32;
pub const FBLE: u8 = 0x33;
pub const BSR: u8 = 0x34;
pub const FBNE: u8 = 0x35;
pub const FBGE: u8 = 0x36;
pub const FBGT: u8 = 0x37;
pub const BLBC: u8 = 0x38;
pub const BEQ: u8 = 0x39;
pub const BLT: u8 = 0x3A;
pub const BLE: u8 = 0x3B;
pub const BNE: u8 = 0x3C;
pub const BGE: u8 = 0x3D;
pub const BGT: u8 = 0x3E;
pub const BLBS: u8 = 0x3F;

/// Function codes under `INTA` (0x10): add/subtract/compare.
pub mod inta {
    pub const ADDL: u32 = 0x00;
    pub const SUBL: u32 = 0x09;
    pub const CMPBGE: u32 = 0x0F;
    pub const CMPULT: u32 = 0x1D;
    pub const ADDQ: u32 = 0x20;
    pub const SUBQ: u32 = 0x29;
    pub const CMPEQ: u32 = 0x2D;
    pub const CMPULE: u32 = 0x3D;
    pub const ADDL_V: u32 = 0x40;
    pub const SUBL_V: u32 = 0x49;
    pub const CMPLT: u32 = 0x4D;
    pub const ADDQ_V: u32 = 0x60;
    pub const SUBQ_V: u32 = 0x69;
    pub const CMPLE: u32 = 0x6D;
}

/// Function codes under `INTL` (0x11): logical and conditional move.
pub mod intl {
    pub const AND: u32 = 0x00;
    pub const BIC: u32 = 0x08;
    pub const CMOVLBS: u32 = 0x14;
    pub const CMOVLBC: u32 = 0x16;
    pub const BIS: u32 = 0x20; // OR
    pub const CMOVEQ: u32 = 0x24;
    pub const CMOVNE: u32 = 0x26;
    pub const ORNOT: u32 = 0x28;
    pub const XOR: u32 = 0x40;
    pub const CMOVLT: u32 = 0x44;
    pub const CMOVGE: u32 = 0x46;
    pub const EQV: u32 = 0x48; // XORNOT / NAND-adjacent
    pub const CMOVLE: u32 = 0x64;
    pub const CMOVGT: u32 = 0x66;
}

/// Function codes under `INTS` (0x12): shift/mask/extract/insert.
pub mod ints {
    pub const MSKBL: u32 = 0x02;
    pub const EXTBL: u32 = 0x06;
    pub const INSBL: u32 = 0x0B;
    pub const SRL: u32 = 0x34;
    pub const EXTQL: u32 = 0x36;
    pub const SLL: u32 = 0x39;
    pub const SRA: u32 = 0x3C;
}

/// Function codes under `INTM` (0x13): multiply.
pub mod intm {
    pub const MULL: u32 = 0x00;
    pub const MULQ: u32 = 0x20;
    pub const UMULH: u32 = 0x30;
    pub const MULL_V: u32 = 0x40;
    pub const MULQ_V: u32 = 0x60;
}

/// Function codes under `FLTL`/`FLTV`/`FLTI` for IEEE binary64 ops
/// (subset: the arithmetic family commonly gated by FPCR trap enables).
pub mod flt {
    pub const ADDT: u32 = 0x0A0;
    pub const SUBT: u32 = 0x0A1;
    pub const MULT: u32 = 0x0A2;
    pub const DIVT: u32 = 0x0A3;
    pub const CMPTEQ: u32 = 0x0A5;
    pub const CMPTLT: u32 = 0x0A6;
    pub const CMPTLE: u32 = 0x0A7;
    pub const SQRTT: u32 = 0x02A;
}

/// Function codes under `MISC` (0x18): memory/trap barriers and cache
/// hints.
pub mod misc {
    pub const TRAPB: u32 = 0x0000;
    pub const EXCB: u32 = 0x0400;
    pub const MB: u32 = 0x4000;
    pub const WMB: u32 = 0x4400;
    pub const FETCH: u32 = 0x8000;
    pub const FETCH_M: u32 = 0xA000;
    pub const RPCC: u32 = 0xC000;
    pub const RC: u32 = 0xE000;
    pub const ECB: u32 = 0xE800;
    pub const RS: u32 = 0xF000;
    pub const WH64: u32 = 0xF800;
}

/// `JSR` (0x1A) sub-kind, selected by bits 15:14 of the memory-format word.
pub mod jsr_kind {
    pub const JMP: u8 = 0b00;
    pub const JSR: u8 = 0b01;
    pub const RET: u8 = 0b10;
    pub const JSR_COROUTINE: u8 = 0b11;
}

/// `CALL_PAL` function codes (26-bit space; only the subset this core
/// dispatches is enumerated). This emulator hosts a single merged
/// PAL universe rather than distinct OSF/1 and VMS PALcode images, so
/// function numbers here are a self-consistent internal assignment, not
/// a claim of bit-exact silicon PALcode compatibility.
pub mod call_pal {
    pub const HALT: u32 = 0x00;
    pub const CFLUSH: u32 = 0x01;
    pub const DRAINA: u32 = 0x02;
    pub const LDQP: u32 = 0x03;
    pub const STQP: u32 = 0x04;
    pub const CSERVE: u32 = 0x09;

    pub const SWPCTX: u32 = 0x10;
    pub const WRVALPTPTR: u32 = 0x11;
    pub const WRMCES: u32 = 0x12;
    pub const TBIA: u32 = 0x13;
    pub const TBIS: u32 = 0x14;
    pub const TBISI: u32 = 0x15;
    pub const TBISD: u32 = 0x16;
    pub const WRENT: u32 = 0x17;
    pub const SWPIPL: u32 = 0x18;
    pub const RDPS: u32 = 0x19;
    pub const WRKGP: u32 = 0x1A;
    pub const WRPS: u32 = 0x1B;
    pub const RDUSP: u32 = 0x1C;
    pub const WRUSP: u32 = 0x1D;
    pub const RDIPL: u32 = 0x1E;
    pub const REI: u32 = 0x1F;

    pub const BPT: u32 = 0x80;
    pub const BUGCHK: u32 = 0x81;
    pub const CALLSYS: u32 = 0x83;
    pub const IMB: u32 = 0x86;
    pub const RDUNIQUE: u32 = 0x9E;
    pub const WRUNIQUE: u32 = 0x9F;
    pub const GENTRAP: u32 = 0xAA;

    pub const CHMK: u32 = 0xA0;
    pub const CHME: u32 = 0xA1;
    pub const CHMS: u32 = 0xA2;
    pub const CHMU: u32 = 0xA3;
    pub const RETSYS: u32 = 0xA4;
}
