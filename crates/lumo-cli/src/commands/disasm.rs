//! Disasm command - print a structured program as text.

use anyhow::{Context, Result};
use clap::Args;
use lumo_bytecode::Program;
use std::path::PathBuf;

#[derive(Args)]
pub struct DisasmCommand {
    /// Structured program (JSON) to disassemble
    pub input: PathBuf,
}

impl DisasmCommand {
    pub fn run(&self) -> Result<()> {
        let source = std::fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let program = Program::from_json(&source)
            .with_context(|| format!("Invalid program {}", self.input.display()))?;

        tracing::debug!(
            instructions = program.len(),
            constants = program.constants.len(),
            "decoded program"
        );
        print!("{}", program.disassemble());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disasm_rejects_reserved_opcode() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("program.json");
        std::fs::write(
            &input,
            r#"{"constants": ["x"], "instructions": [{"code": 20, "data": [0, 1]}]}"#,
        )
        .unwrap();

        let err = DisasmCommand { input }.run().unwrap_err();
        assert!(err.to_string().starts_with("Invalid program"));
    }

    #[test]
    fn test_disasm_valid_program() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("program.json");
        std::fs::write(
            &input,
            r#"{"constants": [], "instructions": [{"code": 21, "data": [1]}]}"#,
        )
        .unwrap();

        DisasmCommand { input }.run().unwrap();
    }
}
