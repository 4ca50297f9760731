//! Bytecode instructions (opcodes)

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};
use crate::operand::{ConstantIndex, JumpTarget, Operand, RawOperand, Register};

/// Bytecode opcodes
///
/// The numbering is the wire format of the structured program and must stay
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Loads / Variables ====================
    /// Load constant from pool: dst = constants\[idx\]
    Load = 1,
    /// Load global variable: dst = globals\[name\]
    GetVar = 2,
    /// Store global variable: globals\[name\] = src
    SetVar = 3,

    // ==================== Calls ====================
    /// Call function: dst = func(args...)
    Call = 4,

    // ==================== Control Flow ====================
    /// Jump if falsy
    JumpIfNot = 5,
    /// Jump if truthy
    JumpIf = 6,
    /// Unconditional jump
    Jump = 7,

    // ==================== Arithmetic / Comparison ====================
    /// Addition: dst = lhs + rhs
    Add = 8,
    /// Subtraction: dst = lhs - rhs
    Sub = 9,
    /// Division: dst = lhs / rhs
    Div = 10,
    /// Multiplication: dst = lhs * rhs
    Mul = 11,
    /// Exponentiation: dst = lhs ^ rhs
    Pow = 12,
    /// Modulo: dst = lhs % rhs
    Mod = 13,
    /// Value equality: dst = lhs == rhs
    Eq = 14,

    // ==================== Tables ====================
    /// Load nil: dst = nil
    SetNil = 15,
    /// Create empty table: dst = {}
    NewTable = 16,
    /// Set field by constant key: tbl\[k\] = val
    SetTableK = 17,
    /// Set field by register key: tbl\[key\] = val
    SetTable = 18,
    /// Append to the positional part: tbl\[#tbl + 1\] = val
    PushTable = 19,

    // 20 is reserved (GETTABLEK). It is never emitted and not decodable.

    // ==================== Scopes ====================
    /// Create runtime scope object, optionally linked to a parent scope
    NewScope = 21,
    /// Scoped read by name, walking the runtime scope chain
    ScopeGet = 22,
    /// Scoped write by name, walking the runtime scope chain
    ScopeSet = 23,

    /// Get field by constant key: dst = tbl\[k\]
    GetTable = 24,
}

impl Opcode {
    /// Reserved opcode number with no instruction behind it
    pub const RESERVED_GETTABLEK: u8 = 20;

    /// Convert from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Load,
            2 => Self::GetVar,
            3 => Self::SetVar,
            4 => Self::Call,
            5 => Self::JumpIfNot,
            6 => Self::JumpIf,
            7 => Self::Jump,
            8 => Self::Add,
            9 => Self::Sub,
            10 => Self::Div,
            11 => Self::Mul,
            12 => Self::Pow,
            13 => Self::Mod,
            14 => Self::Eq,
            15 => Self::SetNil,
            16 => Self::NewTable,
            17 => Self::SetTableK,
            18 => Self::SetTable,
            19 => Self::PushTable,
            21 => Self::NewScope,
            22 => Self::ScopeGet,
            23 => Self::ScopeSet,
            24 => Self::GetTable,
            _ => return None,
        })
    }

    /// Convert to byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Get the disassembly mnemonic of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::GetVar => "GETVAR",
            Self::SetVar => "SETVAR",
            Self::Call => "CALL",
            Self::JumpIfNot => "JUMPIFNOT",
            Self::JumpIf => "JUMPIF",
            Self::Jump => "JUMP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Div => "DIV",
            Self::Mul => "MUL",
            Self::Pow => "POW",
            Self::Mod => "MOD",
            Self::Eq => "EQ",
            Self::SetNil => "SETNIL",
            Self::NewTable => "NEWTABLE",
            Self::SetTableK => "SETTABLEK",
            Self::SetTable => "SETTABLE",
            Self::PushTable => "PUSHTABLE",
            Self::NewScope => "NEWSCOPE",
            Self::ScopeGet => "SCOPEGET",
            Self::ScopeSet => "SCOPESET",
            Self::GetTable => "GETTABLE",
        }
    }
}

/// A decoded instruction with its operands
///
/// `T` is the jump target type. Finished programs use [`JumpTarget`]; the
/// compiler emits instructions holding labels and resolves them with
/// [`Instruction::try_map_target`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Instruction<T = JumpTarget> {
    Load {
        idx: ConstantIndex,
        dst: Register,
    },
    GetVar {
        name: ConstantIndex,
        dst: Register,
    },
    SetVar {
        src: Register,
        name: ConstantIndex,
    },
    Call {
        func: Register,
        args: Vec<Register>,
        dst: Register,
    },
    JumpIfNot {
        cond: Register,
        target: T,
    },
    JumpIf {
        cond: Register,
        target: T,
    },
    Jump {
        target: T,
    },

    Add {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },
    Sub {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },
    Div {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },
    Mul {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },
    Pow {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },
    Mod {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },
    Eq {
        lhs: Register,
        rhs: Register,
        dst: Register,
    },

    SetNil {
        dst: Register,
    },
    NewTable {
        dst: Register,
    },
    SetTableK {
        table: Register,
        key: ConstantIndex,
        src: Register,
    },
    SetTable {
        table: Register,
        key: Register,
        src: Register,
    },
    PushTable {
        table: Register,
        src: Register,
    },

    NewScope {
        dst: Register,
        parent: Option<Register>,
    },
    ScopeGet {
        scope: Register,
        name: ConstantIndex,
        dst: Register,
    },
    ScopeSet {
        scope: Register,
        name: ConstantIndex,
        src: Register,
    },
    GetTable {
        table: Register,
        key: ConstantIndex,
        dst: Register,
    },
}

impl<T: Clone> Instruction<T> {
    /// Opcode of this instruction
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Load { .. } => Opcode::Load,
            Self::GetVar { .. } => Opcode::GetVar,
            Self::SetVar { .. } => Opcode::SetVar,
            Self::Call { .. } => Opcode::Call,
            Self::JumpIfNot { .. } => Opcode::JumpIfNot,
            Self::JumpIf { .. } => Opcode::JumpIf,
            Self::Jump { .. } => Opcode::Jump,
            Self::Add { .. } => Opcode::Add,
            Self::Sub { .. } => Opcode::Sub,
            Self::Div { .. } => Opcode::Div,
            Self::Mul { .. } => Opcode::Mul,
            Self::Pow { .. } => Opcode::Pow,
            Self::Mod { .. } => Opcode::Mod,
            Self::Eq { .. } => Opcode::Eq,
            Self::SetNil { .. } => Opcode::SetNil,
            Self::NewTable { .. } => Opcode::NewTable,
            Self::SetTableK { .. } => Opcode::SetTableK,
            Self::SetTable { .. } => Opcode::SetTable,
            Self::PushTable { .. } => Opcode::PushTable,
            Self::NewScope { .. } => Opcode::NewScope,
            Self::ScopeGet { .. } => Opcode::ScopeGet,
            Self::ScopeSet { .. } => Opcode::ScopeSet,
            Self::GetTable { .. } => Opcode::GetTable,
        }
    }

    /// Operands in wire order
    pub fn operands(&self) -> Vec<Operand<T>> {
        use Operand::{Constant as K, Register as R, Registers, Target};

        match self {
            Self::Load { idx, dst } => vec![K(*idx), R(*dst)],
            Self::GetVar { name, dst } => vec![K(*name), R(*dst)],
            Self::SetVar { src, name } => vec![R(*src), K(*name)],
            Self::Call { func, args, dst } => vec![R(*func), Registers(args.clone()), R(*dst)],
            Self::JumpIfNot { cond, target } | Self::JumpIf { cond, target } => {
                vec![R(*cond), Target(target.clone())]
            }
            Self::Jump { target } => vec![Target(target.clone())],
            Self::Add { lhs, rhs, dst }
            | Self::Sub { lhs, rhs, dst }
            | Self::Div { lhs, rhs, dst }
            | Self::Mul { lhs, rhs, dst }
            | Self::Pow { lhs, rhs, dst }
            | Self::Mod { lhs, rhs, dst }
            | Self::Eq { lhs, rhs, dst } => vec![R(*lhs), R(*rhs), R(*dst)],
            Self::SetNil { dst } | Self::NewTable { dst } => vec![R(*dst)],
            Self::SetTableK { table, key, src } => vec![R(*table), K(*key), R(*src)],
            Self::SetTable { table, key, src } => vec![R(*table), R(*key), R(*src)],
            Self::PushTable { table, src } => vec![R(*table), R(*src)],
            Self::NewScope { dst, parent } => match parent {
                Some(parent) => vec![R(*dst), R(*parent)],
                None => vec![R(*dst)],
            },
            Self::ScopeGet { scope, name, dst } => vec![R(*scope), K(*name), R(*dst)],
            Self::ScopeSet { scope, name, src } => vec![R(*scope), K(*name), R(*src)],
            Self::GetTable { table, key, dst } => vec![R(*table), K(*key), R(*dst)],
        }
    }

    /// Jump target held by this instruction, if it is a jump
    pub fn target(&self) -> Option<&T> {
        match self {
            Self::Jump { target } | Self::JumpIf { target, .. } | Self::JumpIfNot { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    /// Register written by this instruction, if any
    pub fn dst(&self) -> Option<Register> {
        match self {
            Self::Load { dst, .. }
            | Self::GetVar { dst, .. }
            | Self::Call { dst, .. }
            | Self::Add { dst, .. }
            | Self::Sub { dst, .. }
            | Self::Div { dst, .. }
            | Self::Mul { dst, .. }
            | Self::Pow { dst, .. }
            | Self::Mod { dst, .. }
            | Self::Eq { dst, .. }
            | Self::SetNil { dst }
            | Self::NewTable { dst }
            | Self::NewScope { dst, .. }
            | Self::ScopeGet { dst, .. }
            | Self::GetTable { dst, .. } => Some(*dst),
            _ => None,
        }
    }

    /// Replace the jump target (if any) through a fallible mapping
    pub fn try_map_target<U, E>(
        self,
        mut f: impl FnMut(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Instruction<U>, E> {
        Ok(match self {
            Self::Jump { target } => Instruction::Jump { target: f(target)? },
            Self::JumpIf { cond, target } => Instruction::JumpIf {
                cond,
                target: f(target)?,
            },
            Self::JumpIfNot { cond, target } => Instruction::JumpIfNot {
                cond,
                target: f(target)?,
            },
            Self::Load { idx, dst } => Instruction::Load { idx, dst },
            Self::GetVar { name, dst } => Instruction::GetVar { name, dst },
            Self::SetVar { src, name } => Instruction::SetVar { src, name },
            Self::Call { func, args, dst } => Instruction::Call { func, args, dst },
            Self::Add { lhs, rhs, dst } => Instruction::Add { lhs, rhs, dst },
            Self::Sub { lhs, rhs, dst } => Instruction::Sub { lhs, rhs, dst },
            Self::Div { lhs, rhs, dst } => Instruction::Div { lhs, rhs, dst },
            Self::Mul { lhs, rhs, dst } => Instruction::Mul { lhs, rhs, dst },
            Self::Pow { lhs, rhs, dst } => Instruction::Pow { lhs, rhs, dst },
            Self::Mod { lhs, rhs, dst } => Instruction::Mod { lhs, rhs, dst },
            Self::Eq { lhs, rhs, dst } => Instruction::Eq { lhs, rhs, dst },
            Self::SetNil { dst } => Instruction::SetNil { dst },
            Self::NewTable { dst } => Instruction::NewTable { dst },
            Self::SetTableK { table, key, src } => Instruction::SetTableK { table, key, src },
            Self::SetTable { table, key, src } => Instruction::SetTable { table, key, src },
            Self::PushTable { table, src } => Instruction::PushTable { table, src },
            Self::NewScope { dst, parent } => Instruction::NewScope { dst, parent },
            Self::ScopeGet { scope, name, dst } => Instruction::ScopeGet { scope, name, dst },
            Self::ScopeSet { scope, name, src } => Instruction::ScopeSet { scope, name, src },
            Self::GetTable { table, key, dst } => Instruction::GetTable { table, key, dst },
        })
    }
}

/// Instruction in the structured program: `{ "code": n, "data": [...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedInstruction {
    /// Opcode number
    pub code: u8,
    /// Operands in wire order
    pub data: Vec<RawOperand>,
}

impl Instruction<JumpTarget> {
    /// Encode into the structured wire form
    pub fn encode(&self) -> EncodedInstruction {
        EncodedInstruction {
            code: self.opcode().to_byte(),
            data: self.operands().iter().map(Operand::to_raw).collect(),
        }
    }

    /// Decode from the structured wire form. `pc` is only used for error reporting.
    pub fn decode(encoded: &EncodedInstruction, pc: usize) -> Result<Self> {
        let opcode =
            Opcode::from_byte(encoded.code).ok_or(BytecodeError::InvalidOpcode(encoded.code))?;
        let ops = OperandReader {
            opcode,
            pc,
            data: &encoded.data,
        };

        let instruction = match opcode {
            Opcode::Load => {
                ops.arity(2)?;
                Self::Load {
                    idx: ops.constant(0)?,
                    dst: ops.register(1)?,
                }
            }
            Opcode::GetVar => {
                ops.arity(2)?;
                Self::GetVar {
                    name: ops.constant(0)?,
                    dst: ops.register(1)?,
                }
            }
            Opcode::SetVar => {
                ops.arity(2)?;
                Self::SetVar {
                    src: ops.register(0)?,
                    name: ops.constant(1)?,
                }
            }
            Opcode::Call => {
                ops.arity(3)?;
                Self::Call {
                    func: ops.register(0)?,
                    args: ops.registers(1)?,
                    dst: ops.register(2)?,
                }
            }
            Opcode::JumpIfNot => {
                ops.arity(2)?;
                Self::JumpIfNot {
                    cond: ops.register(0)?,
                    target: ops.target(1)?,
                }
            }
            Opcode::JumpIf => {
                ops.arity(2)?;
                Self::JumpIf {
                    cond: ops.register(0)?,
                    target: ops.target(1)?,
                }
            }
            Opcode::Jump => {
                ops.arity(1)?;
                Self::Jump {
                    target: ops.target(0)?,
                }
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::Div
            | Opcode::Mul
            | Opcode::Pow
            | Opcode::Mod
            | Opcode::Eq => {
                ops.arity(3)?;
                let (lhs, rhs, dst) = (ops.register(0)?, ops.register(1)?, ops.register(2)?);
                match opcode {
                    Opcode::Add => Self::Add { lhs, rhs, dst },
                    Opcode::Sub => Self::Sub { lhs, rhs, dst },
                    Opcode::Div => Self::Div { lhs, rhs, dst },
                    Opcode::Mul => Self::Mul { lhs, rhs, dst },
                    Opcode::Pow => Self::Pow { lhs, rhs, dst },
                    Opcode::Mod => Self::Mod { lhs, rhs, dst },
                    _ => Self::Eq { lhs, rhs, dst },
                }
            }
            Opcode::SetNil => {
                ops.arity(1)?;
                Self::SetNil {
                    dst: ops.register(0)?,
                }
            }
            Opcode::NewTable => {
                ops.arity(1)?;
                Self::NewTable {
                    dst: ops.register(0)?,
                }
            }
            Opcode::SetTableK => {
                ops.arity(3)?;
                Self::SetTableK {
                    table: ops.register(0)?,
                    key: ops.constant(1)?,
                    src: ops.register(2)?,
                }
            }
            Opcode::SetTable => {
                ops.arity(3)?;
                Self::SetTable {
                    table: ops.register(0)?,
                    key: ops.register(1)?,
                    src: ops.register(2)?,
                }
            }
            Opcode::PushTable => {
                ops.arity(2)?;
                Self::PushTable {
                    table: ops.register(0)?,
                    src: ops.register(1)?,
                }
            }
            Opcode::NewScope => match encoded.data.len() {
                1 => Self::NewScope {
                    dst: ops.register(0)?,
                    parent: None,
                },
                2 => Self::NewScope {
                    dst: ops.register(0)?,
                    parent: Some(ops.register(1)?),
                },
                n => return Err(ops.invalid(format!("expected 1 or 2 operands, found {n}"))),
            },
            Opcode::ScopeGet => {
                ops.arity(3)?;
                Self::ScopeGet {
                    scope: ops.register(0)?,
                    name: ops.constant(1)?,
                    dst: ops.register(2)?,
                }
            }
            Opcode::ScopeSet => {
                ops.arity(3)?;
                Self::ScopeSet {
                    scope: ops.register(0)?,
                    name: ops.constant(1)?,
                    src: ops.register(2)?,
                }
            }
            Opcode::GetTable => {
                ops.arity(3)?;
                Self::GetTable {
                    table: ops.register(0)?,
                    key: ops.constant(1)?,
                    dst: ops.register(2)?,
                }
            }
        };

        Ok(instruction)
    }
}

/// Positional access to a raw operand list while decoding
struct OperandReader<'a> {
    opcode: Opcode,
    pc: usize,
    data: &'a [RawOperand],
}

impl OperandReader<'_> {
    fn invalid(&self, reason: impl Into<String>) -> BytecodeError {
        BytecodeError::InvalidOperand {
            opcode: self.opcode.name(),
            pc: self.pc,
            reason: reason.into(),
        }
    }

    fn arity(&self, expected: usize) -> Result<()> {
        if self.data.len() != expected {
            return Err(self.invalid(format!(
                "expected {expected} operands, found {}",
                self.data.len()
            )));
        }
        Ok(())
    }

    fn index(&self, slot: usize) -> Result<u32> {
        match self.data.get(slot) {
            Some(RawOperand::Index(value)) => Ok(*value),
            Some(RawOperand::List(_)) => {
                Err(self.invalid(format!("operand {slot} must be an integer")))
            }
            None => Err(self.invalid(format!("missing operand {slot}"))),
        }
    }

    fn register(&self, slot: usize) -> Result<Register> {
        self.index(slot).map(Register)
    }

    fn constant(&self, slot: usize) -> Result<ConstantIndex> {
        self.index(slot).map(ConstantIndex)
    }

    fn target(&self, slot: usize) -> Result<JumpTarget> {
        self.index(slot).map(JumpTarget)
    }

    fn registers(&self, slot: usize) -> Result<Vec<Register>> {
        match self.data.get(slot) {
            Some(RawOperand::List(values)) => Ok(values.iter().copied().map(Register).collect()),
            Some(RawOperand::Index(_)) => {
                Err(self.invalid(format!("operand {slot} must be a register list")))
            }
            None => Err(self.invalid(format!("missing operand {slot}"))),
        }
    }
}
