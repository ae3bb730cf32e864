//! Ember Interpreter Library
//!
//! A small imperative scripting language with dynamically scoped functions,
//! shared array/string buffers and a tree-walking evaluator.

pub mod analyzer;
pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod repl;
pub mod util;

pub use ast::Span;
pub use error::{CompileError, Result};
