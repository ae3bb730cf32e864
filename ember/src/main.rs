//! Ember CLI

use clap::{Parser, Subcommand};
use ember::analyzer::Analyzer;
use ember::ast::Program;
use ember::error::{report_error, report_warning, CompileError};
use ember::interp::{report_runtime_error, InterpConfig, Interpreter, DEFAULT_MAX_CALL_DEPTH};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ember", version, about = "Ember - a small dynamically scoped scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an Ember source file
    Run {
        /// Source file to run
        file: PathBuf,
        /// Skip the static checks before running
        #[arg(long)]
        no_check: bool,
        /// Maximum nesting of function calls
        #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
        max_depth: usize,
    },
    /// Statically check an Ember source file
    Check {
        /// Source file to check
        file: PathBuf,
    },
    /// Parse and dump AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Start an interactive session
    Repl,
}

/// The failure has already been rendered to stderr
struct Reported;

fn main() -> ExitCode {
    ember::logging::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            no_check,
            max_depth,
        } => run_file(&file, no_check, InterpConfig { max_call_depth: max_depth }),
        Command::Check { file } => check_file(&file),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Repl => start_repl(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Reported) => ExitCode::FAILURE,
    }
}

/// Source file loaded for the front end
struct SourceFile {
    name: String,
    text: String,
}

impl SourceFile {
    fn load(path: &Path) -> Result<Self, Reported> {
        let name = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(SourceFile { name, text }),
            Err(err) => {
                eprintln!("Error: cannot read {name}: {err}");
                Err(Reported)
            }
        }
    }

    fn report(&self, error: &CompileError) -> Reported {
        if let Err(err) = report_error(&self.name, &self.text, error) {
            eprintln!("Error: {error} (diagnostic rendering failed: {err})");
        }
        Reported
    }

    fn parse(&self) -> Result<Program, Reported> {
        let tokens = ember::lexer::tokenize(&self.text).map_err(|e| self.report(&e))?;
        ember::parser::parse(&self.name, &self.text, tokens).map_err(|e| self.report(&e))
    }

    /// Run the analyzer, printing its warnings; returns the warning count
    fn check(&self, program: &Program) -> Result<usize, Reported> {
        let mut analyzer = Analyzer::new();
        analyzer.check_program(program).map_err(|e| self.report(&e))?;
        let warnings = analyzer.take_warnings();
        for warning in &warnings {
            let _ = report_warning(&self.name, &self.text, warning);
        }
        Ok(warnings.len())
    }
}

fn run_file(path: &Path, no_check: bool, config: InterpConfig) -> Result<(), Reported> {
    let source = SourceFile::load(path)?;
    let program = source.parse()?;
    if !no_check {
        source.check(&program)?;
    }

    let mut interpreter = Interpreter::new().with_config(config);
    interpreter.run(&program).map_err(|err| {
        if report_runtime_error(&source.name, &source.text, &err).is_err() {
            eprintln!("{err}");
        }
        Reported
    })
}

fn check_file(path: &Path) -> Result<(), Reported> {
    let source = SourceFile::load(path)?;
    let program = source.parse()?;
    match source.check(&program)? {
        0 => println!("✓ {} checks successfully", source.name),
        n => println!("✓ {} checks successfully ({n} warning(s))", source.name),
    }
    Ok(())
}

fn parse_file(path: &Path) -> Result<(), Reported> {
    let source = SourceFile::load(path)?;
    let program = source.parse()?;
    match serde_json::to_string_pretty(&program) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(err) => {
            eprintln!("Error: cannot serialize AST: {err}");
            Err(Reported)
        }
    }
}

fn tokenize_file(path: &Path) -> Result<(), Reported> {
    let source = SourceFile::load(path)?;
    let tokens = ember::lexer::tokenize(&source.text).map_err(|e| source.report(&e))?;
    for (tok, span) in &tokens {
        println!("{tok:?} @ {span}");
    }
    Ok(())
}

fn start_repl() -> Result<(), Reported> {
    let result = ember::repl::Repl::new(Interpreter::new()).and_then(|mut repl| repl.run());
    result.map_err(|err| {
        eprintln!("Error: {err}");
        Reported
    })
}
