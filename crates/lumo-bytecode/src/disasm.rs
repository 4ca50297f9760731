//! Program disassembler.
//!
//! One line per instruction (`OPCODE operand...`), a blank line, then one
//! `k<index>: <value>` line per constant.

use std::fmt::Write;

use crate::program::Program;

/// Disassemble a complete program into a human-readable string.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();

    for instruction in &program.instructions {
        out.push_str(instruction.opcode().name());
        for operand in instruction.operands() {
            // Writing to a String never fails
            let _ = write!(out, " {operand}");
        }
        out.push('\n');
    }

    out.push('\n');

    for (i, constant) in program.constants.iter().enumerate() {
        let _ = writeln!(out, "k{i}: {constant}");
    }

    out
}
