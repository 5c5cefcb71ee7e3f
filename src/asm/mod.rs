//! Assembler and listings for accumulator programs.
//!
//! This module provides:
//! - A line assembler (text → instructions and initial data)
//! - A disassembler and program listing (instructions → text)

pub mod assembler;
pub mod disasm;

pub use assembler::{assemble, Assembly, AssemblerError};
pub use disasm::{disassemble, listing};
