//! Opcode decode table: raw instruction word -> structured decoded form
//! plus the dispatch key used by `axp-cpu-core`'s grain registry.

pub mod decode;
pub mod opcode;

pub use decode::{decode, DecodeKey, DecodedInstr, InstrFormat};
