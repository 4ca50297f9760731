//! Bytecode errors

use thiserror::Error;

/// Errors that can occur while decoding or validating a program
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Invalid or reserved opcode number
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(u8),

    /// Operand list does not match the opcode's shape
    #[error("Invalid operand for {opcode} at instruction {pc}: {reason}")]
    InvalidOperand {
        /// Opcode mnemonic
        opcode: &'static str,
        /// Instruction index
        pc: usize,
        /// What was wrong
        reason: String,
    },

    /// Jump target past the end of the program
    #[error("Jump target PC{target} at instruction {pc} is out of range (program length {len})")]
    InvalidJumpTarget {
        /// Instruction index
        pc: usize,
        /// Offending target
        target: u32,
        /// Program length
        len: usize,
    },

    /// Constant operand outside the pool
    #[error("Constant k{index} at instruction {pc} is out of range (pool size {len})")]
    InvalidConstant {
        /// Instruction index
        pc: usize,
        /// Offending constant index
        index: u32,
        /// Pool size
        len: usize,
    },

    /// Number constant with no JSON form (infinite or NaN)
    #[error("Constant k{index} is not a finite number")]
    NonFiniteConstant {
        /// Constant index
        index: u32,
    },

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
