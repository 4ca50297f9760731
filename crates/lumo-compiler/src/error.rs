//! Compilation errors

use thiserror::Error;

use crate::ast::Location;
use crate::label::Label;

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    /// Node kind (or operator) with no lowering rule
    #[error("Unsupported {kind} at {location}")]
    UnsupportedNode {
        /// Node kind or operator description
        kind: String,
        /// Source location, or `?` when the parser recorded none
        location: String,
    },

    /// A jump refers to a label that was never bound
    #[error("Internal error: unresolved label {0:?}")]
    UnresolvedLabel(Label),

    /// `break` outside of any loop
    #[error("'break' outside a loop at {location}")]
    InvalidBreak {
        /// Source location
        location: String,
    },

    /// Assignment or local declaration whose shape cannot be lowered
    #[error("Malformed assignment at {location}: {message}")]
    MalformedAssignment {
        /// What was wrong
        message: String,
        /// Source location
        location: String,
    },

    /// Register ids exhausted
    #[error("Too many registers (max 4294967295)")]
    TooManyRegisters,

    /// Constant pool full
    #[error("Too many constants (max 4294967295)")]
    TooManyConstants,

    /// Internal compiler error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn location(loc: Option<Location>) -> String {
    loc.map_or_else(|| "?".to_string(), |l| l.to_string())
}

impl CompileError {
    /// Create an unsupported-node error
    pub fn unsupported(kind: impl Into<String>, loc: Option<Location>) -> Self {
        Self::UnsupportedNode {
            kind: kind.into(),
            location: location(loc),
        }
    }

    /// Create an invalid-break error
    pub fn invalid_break(loc: Option<Location>) -> Self {
        Self::InvalidBreak {
            location: location(loc),
        }
    }

    /// Create a malformed-assignment error
    pub fn malformed_assignment(message: impl Into<String>, loc: Option<Location>) -> Self {
        Self::MalformedAssignment {
            message: message.into(),
            location: location(loc),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
