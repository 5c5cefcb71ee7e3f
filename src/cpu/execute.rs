//! The accumulator machine and its decode/execute cycle.
//!
//! Decode and execute are separate calls so a caller can look at the
//! machine between them: after `decode` the address and data registers
//! already show the operand, but the accumulator is untouched.

use crate::cpu::decode::{DecodeError, Instruction, Operation};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::observer::{ObserverId, Observers};
use crate::cpu::registers::Registers;
use crate::error::ErrorKind;
use crate::word::{Word, WordError};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Where the machine is in the micro-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachinePhase {
    /// No operation pending.
    Idle,
    /// An instruction has been decoded and awaits `execute`.
    Decoded,
}

/// Read-only copy of the machine state handed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub word_size: u32,
    pub accumulator: u64,
    pub address_register: usize,
    pub data_register: u64,
    pub instruction_register: Option<Instruction>,
    pub phase: MachinePhase,
    pub cycles: u64,
    pub memory: Vec<u64>,
}

/// A single-accumulator machine with its own memory.
pub struct Machine {
    regs: Registers,
    mem: Memory,
    pending: Option<Operation>,
    cycles: u64,
    observers: Observers<MachineSnapshot>,
}

impl Machine {
    /// Create a machine with `memory_size` cells of `word_size` bits.
    pub fn new(word_size: u32, memory_size: usize) -> Result<Self, MachineError> {
        let mem = Memory::new(word_size, memory_size)?;
        Ok(Self {
            regs: Registers::new(mem.word_size()),
            mem,
            pending: None,
            cycles: 0,
            observers: Observers::new(),
        })
    }

    /// Clear registers and memory. Subscribers stay registered.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.pending = None;
        self.cycles = 0;
        self.notify();
    }

    // ==================== Accessors ====================

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn word_size(&self) -> u32 {
        self.mem.word_size()
    }

    pub fn accumulator(&self) -> Word {
        self.regs.accumulator
    }

    pub fn address_register(&self) -> usize {
        self.regs.address
    }

    pub fn data_register(&self) -> Word {
        self.regs.data
    }

    pub fn instruction_register(&self) -> Option<Instruction> {
        self.regs.instruction
    }

    pub fn phase(&self) -> MachinePhase {
        match self.pending {
            Some(_) => MachinePhase::Decoded,
            None => MachinePhase::Idle,
        }
    }

    /// Number of instructions executed since creation or reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            word_size: self.mem.word_size(),
            accumulator: self.regs.accumulator.value(),
            address_register: self.regs.address,
            data_register: self.regs.data.value(),
            instruction_register: self.regs.instruction,
            phase: self.phase(),
            cycles: self.cycles,
            memory: self.mem.cells().to_vec(),
        }
    }

    // ==================== Observers ====================

    /// Subscribe to snapshots. The subscriber is called once right away.
    pub fn register_observer<F>(&mut self, subscriber: F) -> ObserverId
    where
        F: FnMut(&MachineSnapshot) + Send + 'static,
    {
        let current = self.snapshot();
        self.observers.register(Box::new(subscriber), &current)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        trace!(subscribers = self.observers.len(), "machine notify");
        self.observers.notify(&snapshot);
    }

    // ==================== ALU ====================

    pub fn or(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::Or)
    }

    pub fn and(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::And)
    }

    pub fn xor(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::Xor)
    }

    pub fn not(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::Not)
    }

    pub fn lshift(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::LeftShift)
    }

    pub fn rshift(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::RightShift)
    }

    pub fn load(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::Load)
    }

    pub fn store(&mut self) -> Result<(), MachineError> {
        self.run_now(Operation::Store)
    }

    /// Write a memory cell directly, bypassing the accumulator.
    pub fn write(&mut self, value: u64, address: usize) -> Result<(), MachineError> {
        self.mem.write(value, address)?;
        self.refresh_data()?;
        self.notify();
        Ok(())
    }

    /// Copy a block of values into memory starting at `start`.
    pub fn load_memory(&mut self, start: usize, values: &[u64]) -> Result<(), MachineError> {
        self.mem.load(start, values)?;
        self.refresh_data()?;
        self.notify();
        Ok(())
    }

    fn run_now(&mut self, op: Operation) -> Result<(), MachineError> {
        self.apply(op)?;
        self.notify();
        Ok(())
    }

    /// Perform `op` against the registers. Fails before mutating anything.
    fn apply(&mut self, op: Operation) -> Result<(), MachineError> {
        let acc = self.regs.accumulator;
        let data = self.regs.data;

        let result = match op {
            Operation::Or => acc.or(&data)?,
            Operation::And => acc.and(&data)?,
            Operation::Xor => acc.xor(&data)?,
            Operation::Not => acc.not(),
            Operation::LeftShift => acc.left_shift(1),
            Operation::RightShift => acc.right_shift(1),
            Operation::Load => data,
            Operation::Store => {
                self.mem.write(acc.value(), self.regs.address)?;
                return self.refresh_data();
            }
        };

        self.regs.set_accumulator(result.value());
        Ok(())
    }

    /// Re-read the data register from the selected address.
    fn refresh_data(&mut self) -> Result<(), MachineError> {
        self.regs.data = self.mem.read_word(self.regs.address)?;
        Ok(())
    }

    // ==================== Micro-cycle ====================

    /// Load `instruction` into the registers without running it.
    ///
    /// If the instruction carries an address it becomes the address
    /// register; either way the data register is re-read from memory.
    pub fn decode(&mut self, instruction: &Instruction) -> Result<(), MachineError> {
        match instruction.address() {
            Some(address) => {
                let data = self.mem.read_word(address)?;
                self.regs.address = address;
                self.regs.data = data;
            }
            None => self.refresh_data()?,
        }

        self.regs.instruction = Some(*instruction);
        self.pending = Some(instruction.operation());

        debug!(
            %instruction,
            address = self.regs.address,
            data = self.regs.data.value(),
            "decoded"
        );
        self.notify();
        Ok(())
    }

    /// Decode an instruction given by operation name.
    pub fn decode_named(&mut self, name: &str, args: &[usize]) -> Result<(), MachineError> {
        let instruction = Instruction::named(name, args)?;
        self.decode(&instruction)
    }

    /// Run the operation recorded by the last `decode`.
    pub fn execute(&mut self) -> Result<(), MachineError> {
        let op = self.pending.ok_or(MachineError::NothingDecoded)?;
        self.apply(op)?;
        self.pending = None;
        self.cycles += 1;

        debug!(
            operation = %op,
            accumulator = self.regs.accumulator.value(),
            cycles = self.cycles,
            "executed"
        );
        self.notify();
        Ok(())
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("phase", &self.phase())
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur while driving the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("word error: {0}")]
    Word(#[from] WordError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("execute called with no decoded instruction")]
    NothingDecoded,
}

impl MachineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MachineError::Memory(e) => e.kind(),
            MachineError::Word(e) => e.kind(),
            MachineError::Decode(e) => e.kind(),
            MachineError::NothingDecoded => ErrorKind::InvalidState,
        }
    }
}
