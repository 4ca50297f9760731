//! Lumo CLI - compile Lua-like syntax trees to register bytecode.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "lumo",
    version,
    about = "Compile Lua-like syntax trees to register bytecode",
    long_about = "Lumo lowers a luaparse-compatible JSON syntax tree to register bytecode.\n\n\
                  Compile a tree:      lumo compile tree.json\n\
                  Structured output:   lumo compile tree.json --structured -o out.json\n\
                  Inspect a program:   lumo disasm out.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a syntax tree to bytecode
    Compile(commands::compile::CompileCommand),

    /// Disassemble a structured program
    Disasm(commands::disasm::DisasmCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(cmd) => cmd.run(&config),
        Commands::Disasm(cmd) => cmd.run(),
    }
}
