//! Operations and instructions.
//!
//! The machine has eight operations. Each reads its operands from the
//! registers only; an instruction's optional argument is an address that
//! decode moves into the address register.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Every operation the ALU implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// acc := acc | data
    Or,
    /// acc := acc & data
    And,
    /// acc := acc ^ data
    Xor,
    /// acc := !acc
    Not,
    /// acc := acc << 1
    #[serde(rename = "lshift")]
    LeftShift,
    /// acc := acc >> 1 (zero fill)
    #[serde(rename = "rshift")]
    RightShift,
    /// acc := data
    Load,
    /// memory[address] := acc
    Store,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Or,
        Operation::And,
        Operation::Xor,
        Operation::Not,
        Operation::LeftShift,
        Operation::RightShift,
        Operation::Load,
        Operation::Store,
    ];

    /// Canonical lowercase mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Or => "or",
            Operation::And => "and",
            Operation::Xor => "xor",
            Operation::Not => "not",
            Operation::LeftShift => "lshift",
            Operation::RightShift => "rshift",
            Operation::Load => "load",
            Operation::Store => "store",
        }
    }
}

impl FromStr for Operation {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "or" => Operation::Or,
            "and" => Operation::And,
            "xor" => Operation::Xor,
            "not" => Operation::Not,
            "lshift" | "leftshift" | "shl" => Operation::LeftShift,
            "rshift" | "rightshift" | "shr" => Operation::RightShift,
            "load" | "ld" => Operation::Load,
            "store" | "st" => Operation::Store,
            _ => return Err(DecodeError::UnknownOperation(s.trim().to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One program step: an operation and at most one address argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    operation: Operation,
    address: Option<usize>,
}

impl Instruction {
    /// An instruction with no argument.
    pub const fn op(operation: Operation) -> Self {
        Self { operation, address: None }
    }

    /// An instruction that selects `address` before its operation runs.
    pub const fn with_address(operation: Operation, address: usize) -> Self {
        Self { operation, address: Some(address) }
    }

    /// Build from an argument list of length zero or one.
    pub fn new(operation: Operation, args: &[usize]) -> Result<Self, DecodeError> {
        match args {
            [] => Ok(Self::op(operation)),
            [address] => Ok(Self::with_address(operation, *address)),
            _ => Err(DecodeError::TooManyArguments {
                operation,
                count: args.len(),
            }),
        }
    }

    /// Build from an operation name, as typed by a user.
    pub fn named(name: &str, args: &[usize]) -> Result<Self, DecodeError> {
        let operation = name.parse::<Operation>()?;
        Self::new(operation, args)
    }

    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[inline]
    pub fn address(&self) -> Option<usize> {
        self.address
    }

    /// The argument list, empty or a single address.
    pub fn args(&self) -> &[usize] {
        match &self.address {
            Some(address) => std::slice::from_ref(address),
            None => &[],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(address) => write!(f, "{}({})", self.operation, address),
            None => write!(f, "{}()", self.operation),
        }
    }
}

/// Errors that can occur while building an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),

    #[error("{operation} takes at most one argument, got {count}")]
    TooManyArguments { operation: Operation, count: usize },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnknownOperation(_) => ErrorKind::UnknownOperation,
            DecodeError::TooManyArguments { .. } => ErrorKind::InvalidArgument,
        }
    }
}
