mod ast;
mod env;
mod error;
mod eval;
mod lexer;
mod parser;
mod stdlib;
mod value;

use clap::{Parser, Subcommand};
use error::TlError;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::process::ExitCode;

/// A tree-walking interpreter for a small C-family imperative language
#[derive(Parser, Debug)]
#[command(name = "tlang")]
#[command(version)]
#[command(about = "Lex, parse, and run TL programs")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and execute a TL source file
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse a TL source file and print its AST as JSON
    Ast {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Start an interactive read-eval-print loop
    Repl,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let result = match args.command {
        Command::Run { file } => run_file(&file),
        Command::Ast { file } => print_ast(&file),
        Command::Repl => {
            repl();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_file(path: &PathBuf) -> Result<(), TlError> {
    let src = std::fs::read_to_string(path)?;
    eval::run_source(&src)?;
    Ok(())
}

fn print_ast(path: &PathBuf) -> Result<(), TlError> {
    let src = std::fs::read_to_string(path)?;
    let program = parser::parse(&src)?;
    let json = serde_json::to_string_pretty(&program)
        .expect("Program AST always serializes");
    println!("{json}");
    Ok(())
}

/// Buffers lines until one ends in `;` or `}`, then parses and evaluates the
/// accumulated chunk against a fresh `Evaluator` — each chunk starts from an
/// empty global environment and function table, matching the reference
/// implementation's per-chunk `Runtime()` (SPEC_FULL.md 9). On error the
/// buffer is discarded and the REPL keeps going.
fn repl() {
    println!("TL REPL. End a line with ';' or '}}' to evaluate. Ctrl-D to exit.");

    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), rustyline::history::DefaultHistory> =
        Editor::with_config(config).expect("failed to initialize line editor");
    let history_file = ".tlang_history";
    let _ = rl.load_history(history_file);

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "tl> " } else { "... " };
        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                let trimmed = line.trim_end();
                if trimmed.ends_with(';') || trimmed.ends_with('}') {
                    match eval::run_source(&buffer) {
                        Ok(_) => {}
                        Err(e) => eprintln!("Error: {e}"),
                    }
                    buffer.clear();
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
}
