//! REPL (Read-Eval-Print Loop) for Ember

use crate::analyzer::Analyzer;
use crate::ast::{Program, Stmt};
use crate::error::{report_error, report_warning, CompileError, CompileWarning};
use crate::interp::{report_runtime_error, Interpreter, RuntimeError, Value};
use crate::lexer::tokenize;
use crate::parser::parse;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use thiserror::Error;

const PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".ember_history";
const REPL_FILENAME: &str = "<repl>";

/// Failure of a single REPL input; the session continues afterwards
#[derive(Debug, Error)]
pub enum ReplError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Interpreter state shared by every input of a REPL session
pub struct Session {
    interpreter: Interpreter,
    warnings: Vec<CompileWarning>,
}

impl Session {
    pub fn new(interpreter: Interpreter) -> Self {
        Session {
            interpreter,
            warnings: Vec::new(),
        }
    }

    /// Evaluate one input.
    ///
    /// A bare expression yields its value (`None` when it is nil); any other
    /// program runs in the persistent global frame and yields `None`.
    pub fn eval(&mut self, input: &str) -> Result<Option<Value>, ReplError> {
        let program = match compile(input) {
            Ok(program) => program,
            Err(err) => return self.eval_expression(input).ok_or(err)?,
        };

        let mut analyzer = Analyzer::new();
        analyzer.check_program(&program)?;
        self.warnings = analyzer.take_warnings();

        self.interpreter.run(&program)?;
        Ok(None)
    }

    /// Retry `input` as an expression missing its `;`.
    /// `None` means it is not one, so the original parse error stands.
    fn eval_expression(&mut self, input: &str) -> Option<Result<Option<Value>, ReplError>> {
        let program = compile(&format!("{input};")).ok()?;
        let [stmt] = program.body.as_slice() else {
            return None;
        };
        let Stmt::Expr(expr) = &stmt.node else {
            return None;
        };
        let result = self
            .interpreter
            .eval_expr(expr)
            .map(|value| (!matches!(value, Value::Nil)).then_some(value))
            .map_err(ReplError::from);
        Some(result)
    }

    /// Warnings produced by the last input
    pub fn take_warnings(&mut self) -> Vec<CompileWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn reset(&mut self) {
        self.interpreter.reset();
    }
}

fn compile(source: &str) -> crate::Result<Program> {
    let tokens = tokenize(source)?;
    parse(REPL_FILENAME, source, tokens)
}

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL
    pub fn new(interpreter: Interpreter) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;

        // Try to find history file in home directory
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session: Session::new(interpreter),
            history_path,
        };

        // Load history if available
        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("Ember REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands (starting with :); returns true to exit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":reset" => {
                self.session.reset();
                println!("Global bindings cleared.");
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn eval_input(&mut self, input: &str) {
        let result = self.session.eval(input);

        for warning in self.session.take_warnings() {
            let _ = report_warning(REPL_FILENAME, input, &warning);
        }

        match result {
            Ok(Some(value)) => println!("{value}"),
            Ok(None) => {}
            Err(ReplError::Compile(err)) => {
                let _ = report_error(REPL_FILENAME, input, &err);
            }
            Err(ReplError::Runtime(err)) => {
                let _ = report_runtime_error(REPL_FILENAME, input, &err);
            }
        }
    }
}

fn print_help() {
    println!("Ember REPL Commands:");
    println!("  :help, :h, :?   Show this help");
    println!("  :quit, :q       Exit the REPL");
    println!("  :clear          Clear the screen");
    println!("  :reset          Forget every binding except the natives");
    println!();
    println!("You can enter:");
    println!("  - Expressions: 1 + 2, xs[1:], typeof x");
    println!("  - Statements: x = [1, 2]; for i < 0 .. 3 {{ print(i); }}");
    println!("  - Functions: fn add(a, b) {{ return a + b; }}");
    println!();
    println!("Natives:");
    for native in crate::interp::NATIVES {
        println!("  {}", native.signature());
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{Capture, ErrorKind, Host};
    use std::io;

    fn session() -> (Session, Capture) {
        let capture = Capture::new();
        let interpreter = Interpreter::with_host(Host::new(capture.clone(), io::empty()));
        (Session::new(interpreter), capture)
    }

    #[test]
    fn test_bare_expression_yields_value() {
        let (mut session, _) = session();
        assert_eq!(session.eval("1 + 2").unwrap(), Some(Value::Float(3.0)));
    }

    #[test]
    fn test_nil_expression_yields_nothing() {
        let (mut session, capture) = session();
        assert_eq!(session.eval("print(\"hi\")").unwrap(), None);
        assert_eq!(capture.contents(), "hi\n");
    }

    #[test]
    fn test_statements_yield_nothing() {
        let (mut session, _) = session();
        assert_eq!(session.eval("x = 5;").unwrap(), None);
    }

    #[test]
    fn test_bindings_persist_between_inputs() {
        let (mut session, _) = session();
        session.eval("fn double(n) { return n * 2; }").unwrap();
        session.eval("x = double(21);").unwrap();
        assert_eq!(session.eval("x").unwrap(), Some(Value::Float(42.0)));
    }

    #[test]
    fn test_reset_forgets_bindings() {
        let (mut session, _) = session();
        session.eval("x = 1;").unwrap();
        session.reset();
        match session.eval("x") {
            Err(ReplError::Runtime(err)) => assert_eq!(err.kind, ErrorKind::UnboundVariable),
            other => panic!("Expected unbound variable, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_reports_original_input() {
        let (mut session, _) = session();
        match session.eval("x = ") {
            Err(ReplError::Compile(err)) => {
                assert_eq!(err.message(), "expected expression, found end of input");
            }
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_analyzer_runs_on_statements() {
        let (mut session, _) = session();
        assert!(matches!(session.eval("break;"), Err(ReplError::Compile(_))));
        session.eval("xs = [1]; xs[0] := 2;").unwrap_err();
        assert_eq!(session.take_warnings().len(), 1);
    }

    #[test]
    fn test_constants() {
        assert_eq!(PROMPT, "> ");
        assert_eq!(HISTORY_FILE, ".ember_history");
    }
}
