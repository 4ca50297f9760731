//! Bytecode operands

use std::fmt;

use serde::{Deserialize, Serialize};

/// Virtual register. Ids start at 1 and are never reused within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Register(pub u32);

impl Register {
    /// Create a new register
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for Register {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Index into constant pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantIndex(pub u32);

impl ConstantIndex {
    /// Get index value
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConstantIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// Absolute jump target (instruction index). A target equal to the program
/// length means "end of program".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JumpTarget(pub u32);

impl JumpTarget {
    /// Get the target instruction index
    #[inline]
    pub const fn pc(self) -> u32 {
        self.0
    }
}

impl fmt::Display for JumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PC{}", self.0)
    }
}

/// A typed instruction operand.
///
/// `T` is the jump target representation: [`JumpTarget`] in a finished
/// program, a compiler label while lowering is still in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand<T = JumpTarget> {
    /// Register id
    Register(Register),
    /// Constant pool index
    Constant(ConstantIndex),
    /// Register list (call arguments)
    Registers(Vec<Register>),
    /// Jump target
    Target(T),
}

impl Operand<JumpTarget> {
    /// Untyped wire form of this operand
    pub fn to_raw(&self) -> RawOperand {
        match self {
            Operand::Register(r) => RawOperand::Index(r.0),
            Operand::Constant(k) => RawOperand::Index(k.0),
            Operand::Target(t) => RawOperand::Index(t.0),
            Operand::Registers(regs) => RawOperand::List(regs.iter().map(|r| r.0).collect()),
        }
    }
}

impl fmt::Display for Operand<JumpTarget> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{r}"),
            Operand::Constant(k) => write!(f, "{k}"),
            Operand::Target(t) => write!(f, "{t}"),
            Operand::Registers(regs) => {
                f.write_str("[")?;
                for (i, r) in regs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{r}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Operand as it appears in the structured program: a bare integer, or a list
/// of integers for call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOperand {
    /// Register id, constant index or jump target
    Index(u32),
    /// Register list
    List(Vec<u32>),
}

#[cfg(test)]
mod tests {
    use super::*;

    type Op = Operand<JumpTarget>;

    #[test]
    fn test_register() {
        let r = Register::new(5);
        assert_eq!(r.index(), 5);
        assert_eq!(r.to_string(), "r5");
    }

    #[test]
    fn test_operand_display() {
        assert_eq!(Op::Constant(ConstantIndex(3)).to_string(), "k3");
        assert_eq!(Op::Target(JumpTarget(12)).to_string(), "PC12");
        assert_eq!(
            Op::Registers(vec![Register(4), Register(7)]).to_string(),
            "[r4 r7]"
        );
        assert_eq!(Op::Registers(vec![]).to_string(), "[]");
    }

    #[test]
    fn test_raw_operand_json() {
        let list = Op::Registers(vec![Register(1), Register(2)]).to_raw();
        assert_eq!(serde_json::to_string(&list).unwrap(), "[1,2]");

        let scalar: RawOperand = serde_json::from_str("9").unwrap();
        assert_eq!(scalar, RawOperand::Index(9));
    }
}
