//! Fixed-width binary words.
//!
//! - [`Word`] - an unsigned value with an explicit bit width
//! - [`mask_for`] - the mask every stored value is reduced by

mod fixed;

pub use fixed::{Word, WordError, MAX_WIDTH, mask_for, validate_width};
