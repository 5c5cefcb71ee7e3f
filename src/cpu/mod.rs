//! The accumulator machine.
//!
//! - word-addressed memory of fixed-width cells
//! - 4 registers: accumulator, address, data, instruction
//! - 8 operations, run through a split decode/execute cycle

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod observer;

pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use decode::{Instruction, Operation, DecodeError};
pub use execute::{Machine, MachineError, MachinePhase, MachineSnapshot};
pub use observer::{ObserverId, Observers};
