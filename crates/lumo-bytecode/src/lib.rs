//! # Lumo Bytecode
//!
//! This crate defines the program format emitted by the Lumo compiler.
//!
//! ## Design Principles
//!
//! - **Register-based**: Operations work on virtual registers, not a stack
//! - **Single assignment**: Every register is written by exactly one instruction
//! - **Flat**: One instruction sequence per program; the index is the program counter
//! - **Serializable**: Structured `{constants, instructions}` form for interpreters,
//!   plus a human-readable disassembly

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod disasm;
pub mod error;
pub mod instruction;
pub mod operand;
pub mod program;

pub use constant::{Constant, ConstantPool};
pub use disasm::disassemble;
pub use error::BytecodeError;
pub use instruction::{EncodedInstruction, Instruction, Opcode};
pub use operand::{ConstantIndex, JumpTarget, Operand, RawOperand, Register};
pub use program::Program;
