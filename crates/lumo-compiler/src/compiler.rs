//! Main compiler implementation

use lumo_bytecode::{Constant, ConstantIndex, Instruction, Program, Register};
use tracing::{debug, trace};

use crate::ast::*;
use crate::codegen::CodeGen;
use crate::error::{CompileError, CompileResult};
use crate::label::Label;

/// Left-hand side of an assignment, checked before anything is lowered
enum AssignTarget<'a> {
    Name(&'a Identifier),
    Member(&'a MemberExpression),
}

/// The compiler
pub struct Compiler {
    /// Code generator
    codegen: CodeGen,
    /// Break labels of the enclosing loops, innermost last
    loops: Vec<Label>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Create a new compiler
    pub fn new() -> Self {
        Self {
            codegen: CodeGen::new(),
            loops: Vec::new(),
        }
    }

    /// Compile a chunk to a program
    pub fn compile(mut self, chunk: &Chunk) -> CompileResult<Program> {
        debug!(statements = chunk.body.len(), "compiling chunk");

        // Root scope; every top-level local lives here
        self.codegen.enter_scope()?;
        self.compile_block(&chunk.body)?;
        self.codegen.exit_scope();

        self.codegen.finish()
    }

    /// Compile a statement list in order
    fn compile_block(&mut self, body: &[Statement]) -> CompileResult<()> {
        for stmt in body {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// Compile a statement
    fn compile_statement(&mut self, stmt: &Statement) -> CompileResult<()> {
        trace!(kind = stmt.kind(), pc = self.codegen.current_index(), "statement");

        match stmt {
            Statement::Local(local) => self.compile_local_statement(local),

            Statement::Assignment(assign) => self.compile_assignment_statement(assign),

            Statement::Call(call) => {
                // Result register is simply never read
                self.compile_expression(&call.expression)?;
                Ok(())
            }

            Statement::If(if_stmt) => self.compile_if_statement(if_stmt),

            Statement::While(while_stmt) => self.compile_while_statement(while_stmt),

            Statement::Break(brk) => {
                let target = *self
                    .loops
                    .last()
                    .ok_or_else(|| CompileError::invalid_break(brk.loc))?;
                self.codegen.emit(Instruction::Jump { target });
                Ok(())
            }

            Statement::Function(_)
            | Statement::NumericFor(_)
            | Statement::GenericFor(_)
            | Statement::Repeat(_)
            | Statement::Do(_)
            | Statement::Return(_)
            | Statement::Goto(_)
            | Statement::Label(_) => Err(CompileError::unsupported(stmt.kind(), stmt.loc())),
        }
    }

    /// Compile a `local` declaration
    fn compile_local_statement(&mut self, local: &LocalStatement) -> CompileResult<()> {
        if local.variables.is_empty() {
            return Err(CompileError::malformed_assignment(
                "no names declared",
                local.loc,
            ));
        }
        if local.init.len() > local.variables.len() {
            return Err(CompileError::malformed_assignment(
                format!(
                    "{} values for {} names",
                    local.init.len(),
                    local.variables.len()
                ),
                local.loc,
            ));
        }

        // Names past the last initializer are left unbound
        for (variable, init) in local.variables.iter().zip(&local.init) {
            let src = self.compile_expression(init)?;
            let name = self.codegen.add_string(&variable.name)?;
            let scope = self.codegen.scope_register()?;

            self.codegen.define_variable(&variable.name, src)?;
            self.codegen.emit(Instruction::ScopeSet { scope, name, src });
        }

        Ok(())
    }

    /// Compile an assignment statement
    fn compile_assignment_statement(&mut self, assign: &AssignmentStatement) -> CompileResult<()> {
        if assign.variables.is_empty() {
            return Err(CompileError::malformed_assignment(
                "no assignment targets",
                assign.loc,
            ));
        }
        if assign.init.len() > assign.variables.len() {
            return Err(CompileError::malformed_assignment(
                format!(
                    "{} values for {} targets",
                    assign.init.len(),
                    assign.variables.len()
                ),
                assign.loc,
            ));
        }

        let targets = assign
            .variables
            .iter()
            .map(|target| Self::assign_target(target, assign.loc))
            .collect::<CompileResult<Vec<_>>>()?;

        for (target, init) in targets.into_iter().zip(&assign.init) {
            let src = self.compile_expression(init)?;

            match target {
                AssignTarget::Member(member) => {
                    let (table, key) = self.compile_member_chain(member)?;
                    self.codegen.emit(Instruction::SetTableK { table, key, src });
                }
                AssignTarget::Name(ident) => {
                    let name = self.codegen.add_string(&ident.name)?;
                    let resolved = self.codegen.resolve_variable(&ident.name);

                    if resolved.is_some() {
                        let scope = self.codegen.scope_register()?;
                        self.codegen.define_variable(&ident.name, src)?;
                        self.codegen.emit(Instruction::ScopeSet { scope, name, src });
                    } else {
                        self.codegen.emit(Instruction::SetVar { src, name });
                    }
                }
            }
        }

        Ok(())
    }

    /// Classify an assignment target
    fn assign_target(target: &Expression, loc: Option<Location>) -> CompileResult<AssignTarget<'_>> {
        match target {
            Expression::Identifier(ident) => Ok(AssignTarget::Name(ident)),
            Expression::MemberExpression(member) => Ok(AssignTarget::Member(member)),
            Expression::IndexExpression(index) => Err(CompileError::unsupported(
                "IndexExpression assignment target",
                index.loc.or(loc),
            )),
            other => Err(CompileError::malformed_assignment(
                format!("cannot assign to {}", other.kind()),
                other.loc().or(loc),
            )),
        }
    }

    /// Compile an if statement
    ///
    /// All conditions are tested up front, each jumping to its clause body;
    /// the bodies follow in source order and each jumps to the shared end.
    fn compile_if_statement(&mut self, if_stmt: &IfStatement) -> CompileResult<()> {
        if let Some(pos) = if_stmt
            .clauses
            .iter()
            .position(|clause| matches!(clause, Clause::Else(_)))
            && pos + 1 != if_stmt.clauses.len()
        {
            return Err(CompileError::unsupported(
                "ElseClause before the last clause",
                if_stmt.loc,
            ));
        }

        self.codegen.enter_scope()?;

        let end = self.codegen.new_label();
        let labels: Vec<Label> = if_stmt
            .clauses
            .iter()
            .map(|_| self.codegen.new_label())
            .collect();

        // Condition tests
        for (clause, &label) in if_stmt.clauses.iter().zip(&labels) {
            match clause {
                Clause::If(cond_clause) | Clause::ElseIf(cond_clause) => {
                    let cond = self.compile_expression(&cond_clause.condition)?;
                    self.codegen.emit(Instruction::JumpIf {
                        cond,
                        target: label,
                    });
                }
                Clause::Else(_) => {
                    self.codegen.emit(Instruction::Jump { target: label });
                }
            }
        }
        // No clause matched (unreachable behind an else clause)
        self.codegen.emit(Instruction::Jump { target: end });

        // Bodies
        for (clause, &label) in if_stmt.clauses.iter().zip(&labels) {
            self.codegen.bind_label(label);
            self.compile_block(clause.body())?;

            if !matches!(clause, Clause::Else(_)) {
                self.codegen.emit(Instruction::Jump { target: end });
            }
        }

        self.codegen.bind_label(end);
        self.codegen.exit_scope();

        Ok(())
    }

    /// Compile a while statement
    ///
    /// ```text
    ///       <cond>
    ///       JUMPIFNOT cond, exit
    /// body: <body>
    ///       <cond>
    ///       JUMPIF cond, body
    /// exit:
    /// ```
    ///
    /// The back edge targets `body`, not the entry test, so the condition
    /// runs once per iteration.
    fn compile_while_statement(&mut self, while_stmt: &WhileStatement) -> CompileResult<()> {
        self.codegen.enter_scope()?;

        let exit = self.codegen.new_label();

        // Entry test
        let cond = self.compile_expression(&while_stmt.condition)?;
        self.codegen.emit(Instruction::JumpIfNot { cond, target: exit });

        let body = self.codegen.label_here();
        self.loops.push(exit);
        self.compile_block(&while_stmt.body)?;
        self.loops.pop();

        // Re-test with fresh registers before looping back
        let cond = self.compile_expression(&while_stmt.condition)?;
        self.codegen.emit(Instruction::JumpIf { cond, target: body });

        self.codegen.bind_label(exit);
        self.codegen.exit_scope();

        Ok(())
    }

    // ==================== Expressions ====================

    /// Compile an expression into a fresh register
    fn compile_expression(&mut self, expr: &Expression) -> CompileResult<Register> {
        match expr {
            Expression::NilLiteral(_) => {
                let dst = self.codegen.alloc_reg()?;
                self.codegen.emit(Instruction::SetNil { dst });
                Ok(dst)
            }

            Expression::NumericLiteral(lit) if !lit.value.is_finite() => Err(
                CompileError::unsupported(format!("non-finite number {}", lit.value), lit.loc),
            ),

            Expression::NumericLiteral(lit) => self.compile_constant(Constant::number(lit.value)),

            Expression::StringLiteral(lit) => {
                self.compile_constant(Constant::string(lit.value.as_str()))
            }

            Expression::BooleanLiteral(lit) => self.compile_constant(Constant::boolean(lit.value)),

            Expression::Identifier(ident) => self.compile_identifier(ident),

            Expression::BinaryExpression(binary) => self.compile_binary_expression(binary),

            Expression::CallExpression(call) => self.compile_call(&call.base, &call.arguments),

            Expression::StringCallExpression(call) => {
                self.compile_call(&call.base, std::slice::from_ref(call.argument.as_ref()))
            }

            Expression::TableCallExpression(call) => {
                self.compile_call(&call.base, std::slice::from_ref(call.arguments.as_ref()))
            }

            Expression::TableConstructorExpression(table) => self.compile_table_constructor(table),

            Expression::MemberExpression(member) => {
                let (table, key) = self.compile_member_chain(member)?;
                let dst = self.codegen.alloc_reg()?;
                self.codegen.emit(Instruction::GetTable { table, key, dst });
                Ok(dst)
            }

            Expression::Function(_)
            | Expression::VarargLiteral(_)
            | Expression::UnaryExpression(_)
            | Expression::LogicalExpression(_)
            | Expression::IndexExpression(_) => {
                Err(CompileError::unsupported(expr.kind(), expr.loc()))
            }
        }
    }

    /// Load a literal through the constant pool
    fn compile_constant(&mut self, constant: Constant) -> CompileResult<Register> {
        let idx = self.codegen.add_constant(constant)?;
        let dst = self.codegen.alloc_reg()?;
        self.codegen.emit(Instruction::Load { idx, dst });
        Ok(dst)
    }

    /// Read a variable: scoped if any enclosing scope binds it, global otherwise
    fn compile_identifier(&mut self, ident: &Identifier) -> CompileResult<Register> {
        let name = self.codegen.add_string(&ident.name)?;

        match self.codegen.resolve_variable(&ident.name) {
            Some(resolved) => {
                trace!(name = %ident.name, hops = resolved.hops, "scoped read");
                let scope = self.codegen.scope_register()?;
                let dst = self.codegen.alloc_reg()?;
                self.codegen.emit(Instruction::ScopeGet { scope, name, dst });
                Ok(dst)
            }
            None => {
                let dst = self.codegen.alloc_reg()?;
                self.codegen.emit(Instruction::GetVar { name, dst });
                Ok(dst)
            }
        }
    }

    /// Compile a binary expression
    fn compile_binary_expression(&mut self, binary: &BinaryExpression) -> CompileResult<Register> {
        type MakeBinary = fn(Register, Register, Register) -> Instruction<Label>;

        let make: MakeBinary = match binary.operator {
            BinaryOperator::Add => |lhs, rhs, dst| Instruction::Add { lhs, rhs, dst },
            BinaryOperator::Sub => |lhs, rhs, dst| Instruction::Sub { lhs, rhs, dst },
            BinaryOperator::Div => |lhs, rhs, dst| Instruction::Div { lhs, rhs, dst },
            BinaryOperator::Mul => |lhs, rhs, dst| Instruction::Mul { lhs, rhs, dst },
            BinaryOperator::Pow => |lhs, rhs, dst| Instruction::Pow { lhs, rhs, dst },
            BinaryOperator::Mod => |lhs, rhs, dst| Instruction::Mod { lhs, rhs, dst },
            BinaryOperator::Eq => |lhs, rhs, dst| Instruction::Eq { lhs, rhs, dst },
            op => {
                return Err(CompileError::unsupported(
                    format!("operator '{}'", op.symbol()),
                    binary.loc,
                ));
            }
        };

        let lhs = self.compile_expression(&binary.left)?;
        let rhs = self.compile_expression(&binary.right)?;
        let dst = self.codegen.alloc_reg()?;
        self.codegen.emit(make(lhs, rhs, dst));

        Ok(dst)
    }

    /// Compile a call; the result register is allocated after the arguments
    fn compile_call(&mut self, base: &Expression, arguments: &[Expression]) -> CompileResult<Register> {
        let func = self.compile_expression(base)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.compile_expression(arg)?);
        }

        let dst = self.codegen.alloc_reg()?;
        self.codegen.emit(Instruction::Call { func, args, dst });
        Ok(dst)
    }

    /// Compile a table constructor
    fn compile_table_constructor(&mut self, table: &TableConstructor) -> CompileResult<Register> {
        let dst = self.codegen.alloc_reg()?;
        self.codegen.emit(Instruction::NewTable { dst });

        for field in &table.fields {
            match field {
                TableField::Named { key, value } => {
                    let key = self.codegen.add_string(&key.name)?;
                    let src = self.compile_expression(value)?;
                    self.codegen.emit(Instruction::SetTableK {
                        table: dst,
                        key,
                        src,
                    });
                }
                TableField::Keyed { key, value } => {
                    let key = self.compile_expression(key)?;
                    let src = self.compile_expression(value)?;
                    self.codegen.emit(Instruction::SetTable {
                        table: dst,
                        key,
                        src,
                    });
                }
                TableField::Positional { value } => {
                    let src = self.compile_expression(value)?;
                    self.codegen.emit(Instruction::PushTable { table: dst, src });
                }
            }
        }

        Ok(dst)
    }

    /// Resolve `a.b.c` to the register holding `a.b` and the constant `"c"`
    ///
    /// Intermediate links are read with `GETTABLE`; the final link is left to
    /// the caller, which either reads or writes it.
    fn compile_member_chain(
        &mut self,
        member: &MemberExpression,
    ) -> CompileResult<(Register, ConstantIndex)> {
        if member.indexer == Indexer::Colon {
            return Err(CompileError::unsupported(
                "method call indexer ':'",
                member.loc,
            ));
        }

        let table = match member.base.as_ref() {
            Expression::MemberExpression(inner) => {
                let (table, key) = self.compile_member_chain(inner)?;
                let dst = self.codegen.alloc_reg()?;
                self.codegen.emit(Instruction::GetTable { table, key, dst });
                dst
            }
            base => self.compile_expression(base)?,
        };

        let key = self.codegen.add_string(&member.identifier.name)?;
        Ok((table, key))
    }
}
