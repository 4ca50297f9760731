//! Compiled program format

use serde::{Deserialize, Serialize};

use crate::constant::ConstantPool;
use crate::error::{BytecodeError, Result};
use crate::instruction::{EncodedInstruction, Instruction};
use crate::operand::Operand;

/// A compiled program: one flat instruction sequence plus its constant pool.
///
/// Serializes to the structured form consumed by an interpreter:
/// `{"constants": [...], "instructions": [{"code": n, "data": [...]}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "ProgramRepr", try_from = "ProgramRepr")]
pub struct Program {
    /// Constant pool
    pub constants: ConstantPool,
    /// Instructions; the index is the program counter
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Create a program from its parts
    pub fn new(constants: ConstantPool, instructions: Vec<Instruction>) -> Self {
        Self {
            constants,
            instructions,
        }
    }

    /// Number of instructions
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program has no instructions
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Check that every number constant is finite, every jump lands inside
    /// the program (or exactly at its end) and every constant operand indexes
    /// the pool.
    pub fn validate(&self) -> Result<()> {
        let len = self.instructions.len();

        if let Some(index) = self.constants.iter().position(|c| !c.is_encodable()) {
            return Err(BytecodeError::NonFiniteConstant {
                index: index as u32,
            });
        }

        for (pc, instruction) in self.instructions.iter().enumerate() {
            for operand in instruction.operands() {
                match operand {
                    Operand::Target(target) if target.pc() as usize > len => {
                        return Err(BytecodeError::InvalidJumpTarget {
                            pc,
                            target: target.pc(),
                            len,
                        });
                    }
                    Operand::Constant(k) if self.constants.get(k.index()).is_none() => {
                        return Err(BytecodeError::InvalidConstant {
                            pc,
                            index: k.index(),
                            len: self.constants.len(),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Render the human-readable disassembly
    pub fn disassemble(&self) -> String {
        crate::disasm::disassemble(self)
    }

    /// Validate, then encode to compact structured JSON
    pub fn to_json(&self) -> Result<String> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Validate, then encode to indented structured JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode and validate a program from structured JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let program: Self = serde_json::from_str(json)?;
        program.validate()?;
        Ok(program)
    }
}

/// Wire shape of [`Program`]
#[derive(Serialize, Deserialize)]
struct ProgramRepr {
    constants: ConstantPool,
    instructions: Vec<EncodedInstruction>,
}

impl From<Program> for ProgramRepr {
    fn from(program: Program) -> Self {
        Self {
            instructions: program.instructions.iter().map(Instruction::encode).collect(),
            constants: program.constants,
        }
    }
}

impl TryFrom<ProgramRepr> for Program {
    type Error = BytecodeError;

    fn try_from(repr: ProgramRepr) -> Result<Self> {
        let instructions = repr
            .instructions
            .iter()
            .enumerate()
            .map(|(pc, encoded)| Instruction::decode(encoded, pc))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            constants: repr.constants,
            instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{ConstantIndex, JumpTarget, Register};

    fn sample() -> Program {
        let mut constants = ConstantPool::new();
        let one = ConstantIndex(constants.add_number(1.0));

        Program::new(
            constants,
            vec![
                Instruction::NewScope {
                    dst: Register(1),
                    parent: None,
                },
                Instruction::Load {
                    idx: one,
                    dst: Register(2),
                },
                Instruction::JumpIf {
                    cond: Register(2),
                    target: JumpTarget(3),
                },
            ],
        )
    }

    #[test]
    fn test_structured_json_shape() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"constants":[1.0],"instructions":[{"code":21,"data":[1]},{"code":1,"data":[0,2]},{"code":6,"data":[2,3]}]}"#
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let program = sample();
        let back = Program::from_json(&program.to_json().unwrap()).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn test_validate_end_of_program_target() {
        // PC3 == len is the end of the program
        assert!(sample().validate().is_ok());

        let mut program = sample();
        program.instructions.push(Instruction::Jump {
            target: JumpTarget(10),
        });
        assert!(matches!(
            program.validate(),
            Err(BytecodeError::InvalidJumpTarget { pc: 3, target: 10, len: 4 })
        ));
    }

    #[test]
    fn test_validate_constant_range() {
        let mut program = sample();
        program.instructions.push(Instruction::GetVar {
            name: ConstantIndex(5),
            dst: Register(3),
        });
        assert!(matches!(
            program.validate(),
            Err(BytecodeError::InvalidConstant { index: 5, .. })
        ));
    }

    #[test]
    fn test_non_finite_constant_is_not_encoded() {
        let mut program = sample();
        program.constants.add_number(f64::INFINITY);

        assert!(matches!(
            program.validate(),
            Err(BytecodeError::NonFiniteConstant { index: 1 })
        ));
        assert!(matches!(
            program.to_json(),
            Err(BytecodeError::NonFiniteConstant { index: 1 })
        ));
        assert!(program.to_json_pretty().is_err());

        // `null` in place of a number never decodes as a constant
        assert!(Program::from_json(r#"{"constants":[null],"instructions":[]}"#).is_err());
    }
}
