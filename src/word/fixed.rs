//! Fixed-width unsigned words.
//!
//! A `Word` carries its own bit width. Construction truncates anything above
//! that width; every operation returns a fresh word of the receiver's width.

use std::fmt;
use serde::Serialize;
use thiserror::Error;

use crate::error::ErrorKind;

/// Widest word the machine supports.
pub const MAX_WIDTH: u32 = 64;

/// Bit mask covering the low `width` bits.
///
/// `width` must already be validated to lie in `1..=MAX_WIDTH`.
#[inline]
pub const fn mask_for(width: u32) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Check that a width is usable for words and memory cells.
pub fn validate_width(width: u32) -> Result<u32, WordError> {
    if width == 0 || width > MAX_WIDTH {
        return Err(WordError::InvalidWidth(width));
    }
    Ok(width)
}

/// A fixed-width unsigned value.
///
/// Invariant: `value` never has bits set at or above `width`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Word {
    value: u64,
    width: u32,
}

impl Word {
    /// Build a word, silently dropping high-order bits beyond `width`.
    pub fn new(value: u64, width: u32) -> Result<Self, WordError> {
        let width = validate_width(width)?;
        Ok(Self::truncate(value, width))
    }

    /// Build a word from a signed integer. Negative values are rejected
    /// rather than reinterpreted.
    pub fn from_i64(value: i64, width: u32) -> Result<Self, WordError> {
        if value < 0 {
            return Err(WordError::Negative(value));
        }
        Self::new(value as u64, width)
    }

    /// Mask without width validation. Callers inside the crate hold widths
    /// that were validated when their owner was built.
    #[inline]
    pub(crate) const fn truncate(value: u64, width: u32) -> Self {
        Self { value: value & mask_for(width), width }
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.value
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn mask(&self) -> u64 {
        mask_for(self.width)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Bitwise AND with a word of the same width.
    pub fn and(&self, other: &Word) -> Result<Word, WordError> {
        self.check_width(other)?;
        Ok(Self::truncate(self.value & other.value, self.width))
    }

    /// Bitwise OR with a word of the same width.
    pub fn or(&self, other: &Word) -> Result<Word, WordError> {
        self.check_width(other)?;
        Ok(Self::truncate(self.value | other.value, self.width))
    }

    /// Bitwise XOR with a word of the same width.
    pub fn xor(&self, other: &Word) -> Result<Word, WordError> {
        self.check_width(other)?;
        Ok(Self::truncate(self.value ^ other.value, self.width))
    }

    /// Bitwise complement within the word's width.
    pub fn not(&self) -> Word {
        Self::truncate(!self.value, self.width)
    }

    /// Logical shift left; bits pushed past the width are lost.
    pub fn left_shift(&self, n: u32) -> Word {
        let shifted = self.value.checked_shl(n).unwrap_or(0);
        Self::truncate(shifted, self.width)
    }

    /// Logical shift right; vacated high bits are zero.
    pub fn right_shift(&self, n: u32) -> Word {
        let shifted = self.value.checked_shr(n).unwrap_or(0);
        Self::truncate(shifted, self.width)
    }

    /// Render as binary, zero-padded to the full width.
    pub fn to_binary_string(&self) -> String {
        format!("{:0width$b}", self.value, width = self.width as usize)
    }

    fn check_width(&self, other: &Word) -> Result<(), WordError> {
        if self.width != other.width {
            return Err(WordError::WidthMismatch {
                expected: self.width,
                got: other.width,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0b{} = {})", self.to_binary_string(), self.value)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_binary_string())
    }
}

impl From<Word> for u64 {
    fn from(word: Word) -> u64 {
        word.value
    }
}

/// Errors raised when building or combining words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordError {
    #[error("word width {0} is not in 1..=64")]
    InvalidWidth(u32),

    #[error("{0} is not a non-negative integer")]
    Negative(i64),

    #[error("operand width {got} does not match word width {expected}")]
    WidthMismatch { expected: u32, got: u32 },
}

impl WordError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}
