//! Word-addressed main memory.
//!
//! Cells are plain `u64`s kept reduced by the word mask. Valid addresses
//! are `0..size`; `size` itself is out of range.

use crate::error::ErrorKind;
use crate::word::{self, Word, WordError};
use serde::Serialize;
use thiserror::Error;

/// Fixed-size memory of `word_size`-bit cells.
#[derive(Clone, Serialize)]
pub struct Memory {
    word_size: u32,
    word_mask: u64,
    cells: Vec<u64>,
}

impl Memory {
    /// Allocate a zeroed memory of `size` cells, each `word_size` bits wide.
    pub fn new(word_size: u32, size: usize) -> Result<Self, MemoryError> {
        let word_size = word::validate_width(word_size)?;
        if size == 0 {
            return Err(MemoryError::EmptyMemory);
        }
        Ok(Self {
            word_size,
            word_mask: word::mask_for(word_size),
            cells: vec![0; size],
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn word_size(&self) -> u32 {
        self.word_size
    }

    #[inline]
    pub fn word_mask(&self) -> u64 {
        self.word_mask
    }

    /// Read a cell.
    #[inline]
    pub fn read(&self, address: usize) -> Result<u64, MemoryError> {
        self.check_address(address)?;
        Ok(self.cells[address])
    }

    /// Read a cell as a [`Word`] of the memory's width.
    pub fn read_word(&self, address: usize) -> Result<Word, MemoryError> {
        let value = self.read(address)?;
        Ok(Word::truncate(value, self.word_size))
    }

    /// Write a cell, keeping only the low `word_size` bits of `value`.
    #[inline]
    pub fn write(&mut self, value: u64, address: usize) -> Result<(), MemoryError> {
        self.check_address(address)?;
        self.cells[address] = value & self.word_mask;
        Ok(())
    }

    /// Write a signed value. Negative values are rejected.
    pub fn write_signed(&mut self, value: i64, address: usize) -> Result<(), MemoryError> {
        self.check_address(address)?;
        if value < 0 {
            return Err(MemoryError::InvalidValue(WordError::Negative(value)));
        }
        self.write(value as u64, address)
    }

    /// Copy `values` into consecutive cells starting at `start`.
    ///
    /// Nothing is written unless the whole block fits.
    pub fn load(&mut self, start: usize, values: &[u64]) -> Result<(), MemoryError> {
        let end = start.checked_add(values.len()).unwrap_or(usize::MAX);
        if end > self.size() {
            return Err(MemoryError::BlockTooLarge {
                len: values.len(),
                available: self.size().saturating_sub(start),
            });
        }
        for (cell, value) in self.cells[start..end].iter_mut().zip(values) {
            *cell = value & self.word_mask;
        }
        Ok(())
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = 0);
    }

    /// All cells in address order.
    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// Dump a window of memory (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Word)> {
        let end = start.saturating_add(count).min(self.size());
        (start.min(end)..end)
            .map(|i| (i, Word::truncate(self.cells[i], self.word_size)))
            .collect()
    }

    fn check_address(&self, address: usize) -> Result<(), MemoryError> {
        if address >= self.cells.len() {
            return Err(MemoryError::AddressOutOfRange {
                address,
                size: self.cells.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|cell| **cell != 0).count();

        f.debug_struct("Memory")
            .field("word_size", &self.word_size)
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {address} out of range (0-{})", .size - 1)]
    AddressOutOfRange { address: usize, size: usize },

    #[error("block of {len} words exceeds available space {available}")]
    BlockTooLarge { len: usize, available: usize },

    #[error("memory must have at least one cell")]
    EmptyMemory,

    #[error("invalid value: {0}")]
    InvalidValue(#[from] WordError),
}

impl MemoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::AddressOutOfRange { .. } | MemoryError::BlockTooLarge { .. } => {
                ErrorKind::OutOfRange
            }
            MemoryError::EmptyMemory | MemoryError::InvalidValue(_) => ErrorKind::InvalidArgument,
        }
    }
}
