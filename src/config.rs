//! Machine configuration.
//!
//! Defaults match a small teaching setup: 8-bit words, 256 cells and a
//! quarter-second pause between steps when playing.

use std::time::Duration;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::cpu::execute::{Machine, MachineError};
use crate::error::ErrorKind;
use crate::word::{self, WordError};

/// Geometry and pacing of a machine session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Bits per word, 1 to 64.
    pub word_size: u32,
    /// Number of memory cells.
    pub memory_size: usize,
    /// Pause between steps while playing, in milliseconds.
    pub step_delay_ms: u64,
}

impl MachineConfig {
    pub const DEFAULT_WORD_SIZE: u32 = 8;
    pub const DEFAULT_MEMORY_SIZE: usize = 256;
    pub const DEFAULT_STEP_DELAY_MS: u64 = 250;

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        word::validate_width(self.word_size)?;
        if self.memory_size == 0 {
            return Err(ConfigError::EmptyMemory);
        }
        Ok(())
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Build a zeroed machine with this geometry.
    pub fn build_machine(&self) -> Result<Machine, ConfigError> {
        self.validate()?;
        Ok(Machine::new(self.word_size, self.memory_size)?)
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            word_size: Self::DEFAULT_WORD_SIZE,
            memory_size: Self::DEFAULT_MEMORY_SIZE,
            step_delay_ms: Self::DEFAULT_STEP_DELAY_MS,
        }
    }
}

/// Errors in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid word size: {0}")]
    WordSize(#[from] WordError),

    #[error("memory size must be at least 1")]
    EmptyMemory,

    #[error("machine error: {0}")]
    Machine(#[from] MachineError),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Machine(e) => e.kind(),
            _ => ErrorKind::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.word_size, 8);
        assert_eq!(config.memory_size, 256);
        assert_eq!(config.step_delay(), Duration::from_millis(250));

        let machine = config.build_machine().unwrap();
        assert_eq!(machine.memory().size(), 256);
    }

    #[test]
    fn test_partial_json() {
        let config = MachineConfig::from_json(r#"{ "word_size": 4 }"#).unwrap();
        assert_eq!(config.word_size, 4);
        assert_eq!(config.memory_size, 256);
    }

    #[test]
    fn test_invalid_config() {
        let err = MachineConfig::from_json(r#"{ "word_size": 0 }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = MachineConfig::from_json(r#"{ "memory_size": 0 }"#).unwrap_err();
        assert_eq!(err, ConfigError::EmptyMemory);

        assert!(matches!(MachineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
