//! # Lumo Compiler
//!
//! Lowers a Lua-like syntax tree to Lumo register bytecode.
//!
//! ## Pipeline
//!
//! 1. Deserialize the parser's tree ([`ast::Chunk`])
//! 2. Walk statements and expressions, emitting instructions with symbolic labels
//! 3. Resolve labels and validate the finished [`Program`]

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod label;
pub mod scope;

pub use compiler::Compiler;
pub use error::{CompileError, CompileResult};
pub use label::Label;

use lumo_bytecode::Program;

/// Compile a chunk with a fresh compiler
pub fn compile(chunk: &ast::Chunk) -> CompileResult<Program> {
    Compiler::new().compile(chunk)
}
