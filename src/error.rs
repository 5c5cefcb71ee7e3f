//! Error classification shared by every module.
//!
//! Each module owns its own error enum; `ErrorKind` is the coarse
//! category a caller can branch on without matching every variant.

use serde::{Serialize, Deserialize};

/// The four ways a machine call can violate its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Wrong sign, wrong width or otherwise malformed operand.
    InvalidArgument,
    /// Address or insertion index outside its bounds.
    OutOfRange,
    /// An operation name the machine does not implement.
    UnknownOperation,
    /// Call made in the wrong phase (execute without decode, play when complete).
    InvalidState,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::UnknownOperation => "unknown operation",
            ErrorKind::InvalidState => "invalid state",
        };
        f.write_str(name)
    }
}
