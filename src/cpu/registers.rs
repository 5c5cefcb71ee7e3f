//! Machine registers.
//!
//! - accumulator: the only register the ALU writes
//! - address register: the memory cell selected by the last decode
//! - data register: mirror of `memory[address]`
//! - instruction register: the instruction most recently decoded

use crate::cpu::decode::Instruction;
use crate::word::Word;
use serde::Serialize;

/// The register file.
///
/// Fields are read-only from outside the crate; the machine owns every
/// write so the masking and data-mirror invariants cannot be bypassed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registers {
    pub(crate) accumulator: Word,
    pub(crate) address: usize,
    pub(crate) data: Word,
    pub(crate) instruction: Option<Instruction>,
}

impl Registers {
    /// A zeroed register file for `word_size`-bit words.
    ///
    /// `word_size` must already be validated.
    pub(crate) fn new(word_size: u32) -> Self {
        Self {
            accumulator: Word::truncate(0, word_size),
            address: 0,
            data: Word::truncate(0, word_size),
            instruction: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.accumulator.width());
    }

    /// Mask `raw` to the word width and store it in the accumulator.
    ///
    /// Every accumulator update goes through here.
    #[inline]
    pub(crate) fn set_accumulator(&mut self, raw: u64) {
        self.accumulator = Word::truncate(raw, self.accumulator.width());
    }

    pub fn accumulator(&self) -> Word {
        self.accumulator
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn data(&self) -> Word {
        self.data
    }

    pub fn instruction(&self) -> Option<Instruction> {
        self.instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Operation;

    #[test]
    fn test_set_accumulator_masks() {
        let mut regs = Registers::new(4);
        regs.set_accumulator(0xFF);
        assert_eq!(regs.accumulator().value(), 0xF);
        assert_eq!(regs.accumulator().width(), 4);
    }

    #[test]
    fn test_reset_keeps_width() {
        let mut regs = Registers::new(12);
        regs.set_accumulator(99);
        regs.address = 3;
        regs.instruction = Some(Instruction::op(Operation::Not));

        regs.reset();
        assert_eq!(regs, Registers::new(12));
    }
}
