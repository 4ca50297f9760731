//! Compile command - lower a syntax tree to bytecode.

use anyhow::{Context, Result};
use clap::Args;
use lumo_compiler::ast::Chunk;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct CompileCommand {
    /// Syntax tree to compile (luaparse JSON)
    pub input: PathBuf,

    /// Print the structured JSON program instead of disassembly
    #[arg(long)]
    pub structured: bool,

    /// Write output to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl CompileCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let source = std::fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;

        let structured = self.structured || config.output.structured_output;
        let rendered = compile_source(&source, structured)
            .with_context(|| format!("Failed to compile {}", self.input.display()))?;

        match &self.output {
            Some(path) => std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => print!("{rendered}"),
        }

        Ok(())
    }
}

/// Compile a luaparse JSON document and render it in the requested form.
pub fn compile_source(source: &str, structured: bool) -> Result<String> {
    let chunk: Chunk = serde_json::from_str(source).context("Invalid syntax tree")?;
    let program = lumo_compiler::compile(&chunk)?;

    if structured {
        let mut json = program.to_json_pretty()?;
        json.push('\n');
        Ok(json)
    } else {
        Ok(program.disassemble())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;

    const PRINT_CALL: &str = r#"{
        "type": "Chunk",
        "body": [{
            "type": "CallStatement",
            "expression": {
                "type": "StringCallExpression",
                "base": {"type": "Identifier", "name": "print"},
                "argument": {"type": "StringLiteral", "value": "hi", "raw": "\"hi\""}
            }
        }],
        "comments": []
    }"#;

    #[test]
    fn test_compile_to_disassembly() {
        let text = compile_source(PRINT_CALL, false).unwrap();
        assert_eq!(
            text,
            "NEWSCOPE r1\nGETVAR k0 r2\nLOAD k1 r3\nCALL r2 [r3] r4\n\nk0: print\nk1: hi\n"
        );
    }

    #[test]
    fn test_compile_to_structured() {
        let json = compile_source(PRINT_CALL, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["constants"], serde_json::json!(["print", "hi"]));
        assert_eq!(value["instructions"][3]["code"], 4);
        assert_eq!(value["instructions"][3]["data"], serde_json::json!([2, [3], 4]));
    }

    #[test]
    fn test_invalid_tree() {
        let err = compile_source(r#"{"type": "Chunk"}"#, false).unwrap_err();
        assert_eq!(err.to_string(), "Invalid syntax tree");
    }

    #[test]
    fn test_compile_error_propagates() {
        let source = r#"{"type": "Chunk", "body": [{"type": "BreakStatement"}]}"#;
        let err = compile_source(source, false).unwrap_err();
        assert_eq!(err.to_string(), "'break' outside a loop at ?");
    }

    #[test]
    fn test_run_writes_configured_form() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hello.json");
        let output = dir.path().join("hello.lumo.json");
        std::fs::write(&input, PRINT_CALL).unwrap();

        let cmd = CompileCommand {
            input,
            structured: false,
            output: Some(output.clone()),
        };
        let config = Config {
            output: OutputConfig {
                structured_output: true,
            },
        };
        cmd.run(&config).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let program = lumo_bytecode::Program::from_json(&written).unwrap();
        assert_eq!(program.len(), 4);
    }

    #[test]
    fn test_run_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CompileCommand {
            input: dir.path().join("missing.json"),
            structured: false,
            output: None,
        };

        let err = cmd.run(&Config::default()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }
}
