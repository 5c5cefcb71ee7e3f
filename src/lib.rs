//! # Accumulator Emulator
//!
//! A minimal single-accumulator machine for teaching how a CPU core works.
//!
//! The machine has a word-addressed memory, one accumulator and three
//! supporting registers. Programs run through an explicit decode/execute
//! cycle so every intermediate state can be observed.

pub mod error;
pub mod word;
pub mod cpu;
pub mod program;
pub mod asm;
pub mod config;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use error::ErrorKind;
pub use word::{Word, WordError};
pub use cpu::{
    Machine, MachineError, MachinePhase, MachineSnapshot, Memory, MemoryError, Instruction,
    Operation, DecodeError, ObserverId,
};
pub use program::{Program, ProgramError, ProgramSnapshot, StepOutcome, StepPhase, PlayOutcome, StopHandle};
pub use asm::{assemble, disassemble, listing, Assembly, AssemblerError};
pub use config::{MachineConfig, ConfigError};
