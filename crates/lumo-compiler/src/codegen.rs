//! Bytecode generation state

use lumo_bytecode::{Constant, ConstantIndex, ConstantPool, Instruction, Program, Register};
use tracing::{debug, trace};

use crate::error::{CompileError, CompileResult};
use crate::label::{Label, LabelTable};
use crate::scope::{ResolvedBinding, ScopeChain};

/// Register allocator
///
/// Ids grow monotonically from 1 and are never freed, so every value in a
/// program has its own register.
#[derive(Debug, Default)]
pub struct RegisterAllocator {
    /// Last register handed out (0 = none yet)
    last: u32,
}

impl RegisterAllocator {
    /// Create a new register allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh register
    pub fn alloc(&mut self) -> CompileResult<Register> {
        self.last = self
            .last
            .checked_add(1)
            .ok_or(CompileError::TooManyRegisters)?;
        Ok(Register(self.last))
    }

    /// Number of registers allocated so far
    pub fn allocated(&self) -> u32 {
        self.last
    }
}

/// Code generator state for one compilation
#[derive(Debug, Default)]
pub struct CodeGen {
    /// Constant pool
    pub constants: ConstantPool,
    /// Register allocator
    pub registers: RegisterAllocator,
    /// Emitted instructions; jumps still hold labels
    pub instructions: Vec<Instruction<Label>>,
    /// Jump target slots
    pub labels: LabelTable,
    /// Compile-time scope chain
    pub scopes: ScopeChain,
}

impl CodeGen {
    /// Create a new code generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a constant
    pub fn add_constant(&mut self, constant: Constant) -> CompileResult<ConstantIndex> {
        let full = self.constants.len() > u32::MAX as usize;
        if full && self.constants.find(&constant).is_none() {
            return Err(CompileError::TooManyConstants);
        }
        Ok(ConstantIndex(self.constants.add(constant)))
    }

    /// Intern a string constant
    pub fn add_string(&mut self, s: &str) -> CompileResult<ConstantIndex> {
        self.add_constant(Constant::string(s))
    }

    /// Allocate a register
    pub fn alloc_reg(&mut self) -> CompileResult<Register> {
        self.registers.alloc()
    }

    /// Emit an instruction, returning its index
    pub fn emit(&mut self, instruction: Instruction<Label>) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Position the next emitted instruction will occupy
    pub fn current_index(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Create a label that is bound later
    pub fn new_label(&mut self) -> Label {
        self.labels.create()
    }

    /// Create a label bound to the current position
    pub fn label_here(&mut self) -> Label {
        let pc = self.current_index();
        self.labels.create_at(pc)
    }

    /// Bind (or rebind) a label to the current position
    pub fn bind_label(&mut self, label: Label) {
        let pc = self.current_index();
        trace!(label = label.id(), pc, "bind label");
        self.labels.bind(label, pc);
    }

    /// Enter a block scope, emitting its runtime scope object
    pub fn enter_scope(&mut self) -> CompileResult<Register> {
        let dst = self.alloc_reg()?;
        let parent = self.scopes.current_register();
        self.emit(Instruction::NewScope { dst, parent });
        self.scopes.enter(dst);
        trace!(register = dst.index(), depth = self.scopes.depth(), "enter scope");
        Ok(dst)
    }

    /// Exit the current block scope
    pub fn exit_scope(&mut self) {
        self.scopes.exit();
    }

    /// Register of the innermost runtime scope object
    pub fn scope_register(&self) -> CompileResult<Register> {
        self.scopes
            .current_register()
            .ok_or_else(|| CompileError::internal("no scope entered"))
    }

    /// Resolve a name against the scope chain
    pub fn resolve_variable(&self, name: &str) -> Option<ResolvedBinding> {
        self.scopes.lookup(name)
    }

    /// Bind a name in the scope chain
    pub fn define_variable(&mut self, name: &str, register: Register) -> CompileResult<()> {
        self.scopes
            .define(name, register)
            .map(|_| ())
            .ok_or_else(|| CompileError::internal("no scope entered"))
    }

    /// Resolve every label and produce the finished program
    pub fn finish(self) -> CompileResult<Program> {
        let Self {
            constants,
            registers,
            instructions,
            labels,
            ..
        } = self;

        let instructions = instructions
            .into_iter()
            .map(|instruction| instruction.try_map_target(|label| labels.resolve(label)))
            .collect::<CompileResult<Vec<_>>>()?;

        let program = Program::new(constants, instructions);
        program
            .validate()
            .map_err(|e| CompileError::internal(e.to_string()))?;

        debug!(
            instructions = program.len(),
            constants = program.constants.len(),
            registers = registers.allocated(),
            labels = labels.len(),
            "program finished"
        );

        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_bytecode::JumpTarget;

    #[test]
    fn test_register_allocator() {
        let mut alloc = RegisterAllocator::new();

        let r1 = alloc.alloc().unwrap();
        let r2 = alloc.alloc().unwrap();
        let r3 = alloc.alloc().unwrap();

        assert_eq!(r1, Register(1));
        assert_eq!(r2, Register(2));
        assert_eq!(r3, Register(3));
        assert_eq!(alloc.allocated(), 3);
    }

    #[test]
    fn test_register_exhaustion() {
        let mut alloc = RegisterAllocator { last: u32::MAX - 1 };
        assert_eq!(alloc.alloc().unwrap(), Register(u32::MAX));
        assert!(matches!(alloc.alloc(), Err(CompileError::TooManyRegisters)));
    }

    #[test]
    fn test_scope_emits_newscope() {
        let mut cg = CodeGen::new();

        let root = cg.enter_scope().unwrap();
        let child = cg.enter_scope().unwrap();
        cg.exit_scope();

        assert_eq!(cg.scope_register().unwrap(), root);
        assert_eq!(
            cg.instructions,
            vec![
                Instruction::NewScope {
                    dst: root,
                    parent: None
                },
                Instruction::NewScope {
                    dst: child,
                    parent: Some(root)
                },
            ]
        );
    }

    #[test]
    fn test_forward_jump_resolution() {
        let mut cg = CodeGen::new();
        let end = cg.new_label();

        cg.emit(Instruction::Jump { target: end });
        let dst = cg.alloc_reg().unwrap();
        cg.emit(Instruction::NewTable { dst });
        cg.bind_label(end);

        let program = cg.finish().unwrap();
        assert_eq!(
            program.instructions[0],
            Instruction::Jump {
                target: JumpTarget(2)
            }
        );
    }

    #[test]
    fn test_finish_rejects_unbound_label() {
        let mut cg = CodeGen::new();
        let dangling = cg.new_label();
        cg.emit(Instruction::Jump { target: dangling });

        assert!(matches!(
            cg.finish(),
            Err(CompileError::UnresolvedLabel(l)) if l == dangling
        ));
    }

    #[test]
    fn test_constants_dedup_through_codegen() {
        let mut cg = CodeGen::new();
        let a = cg.add_string("x").unwrap();
        let b = cg.add_constant(Constant::number(1.0)).unwrap();
        let c = cg.add_string("x").unwrap();

        assert_eq!(a, c);
        assert_ne!(a, b);
    }
}
