//! Tree-walking interpreter
//!
//! Executes a parsed [`Program`](crate::ast::Program) directly. Functions
//! resolve free names against the caller's frame chain at call time, and
//! arrays and strings are shared buffers that alias on assignment.

mod buffer;
mod env;
mod error;
mod eval;
mod native;
mod state;
mod value;

pub use buffer::Buffer;
pub use env::{child_env, global_of, lookup, parent_of, Binding, EnvRef, Environment, NoParent};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{InterpConfig, Interpreter, DEFAULT_MAX_CALL_DEPTH};
pub use native::{Arity, Capture, Host, NativeError, NativeFunction, NATIVES, VARIADIC};
pub use state::{ExecState, Flow};
pub use value::{Shared, Value};

use crate::error::Diagnostic;
use ariadne::ReportKind;

impl RuntimeError {
    pub(crate) fn diagnostic(&self) -> Diagnostic<'static> {
        Diagnostic {
            kind: ReportKind::Error,
            title: "runtime error".to_string(),
            label: Some((self.span, self.message.clone())),
        }
    }
}

/// Report a runtime fault with ariadne
pub fn report_runtime_error(filename: &str, source: &str, error: &RuntimeError) -> std::io::Result<()> {
    error.diagnostic().eprint(filename, source)
}

/// Render a runtime fault without colors
pub fn render_runtime_error(filename: &str, source: &str, error: &RuntimeError) -> String {
    error.diagnostic().render(filename, source)
}
