//! Runtime errors for the interpreter

use crate::ast::Span;
use std::fmt;

/// Runtime error during interpretation. Every fault is terminal for the run.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Location of the offending token
    pub span: Span,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operator or subscript applied to unsupported types
    TypeMismatch,
    /// Unbound name, including `global` used at top level
    UnboundVariable,
    /// Assignment to a constant binding
    ConstantReassignment,
    /// `:=` through a subscript
    InvalidAssignment,
    /// Argument count mismatch
    ArityMismatch,
    /// Subscript or slice outside the sequence
    IndexOutOfBounds,
    /// Subscript that is not a non-negative integer
    InvalidIndex,
    /// Bad range-loop bounds or direction
    InvalidRange,
    /// `break`/`continue`/`return` outside their context
    ControlFlow,
    /// A native function rejected its arguments
    NativeArgument,
    /// Call depth exceeded
    StackOverflow,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String, span: Span) -> Self {
        RuntimeError {
            kind,
            message,
            span,
        }
    }

    pub fn binary_type_mismatch(op: &str, left: &str, right: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("unsupported operand types for `{op}`: {left} and {right}"),
            span,
        )
    }

    pub fn unary_type_mismatch(op: &str, operand: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("unsupported operand type for `{op}`: {operand}"),
            span,
        )
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::TypeMismatch, message.into(), span)
    }

    pub fn unbound_variable(name: &str, hint: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::UnboundVariable,
            format!("undefined variable `{name}`{hint}"),
            span,
        )
    }

    pub fn global_in_global_scope(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::UnboundVariable,
            format!("`global {name}` used in global scope"),
            span,
        )
    }

    pub fn constant_reassignment(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::ConstantReassignment,
            format!("cannot reassign constant `{name}`"),
            span,
        )
    }

    pub fn constant_index_assign(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::InvalidAssignment,
            format!("cannot use `:=` to assign an element of `{name}`"),
            span,
        )
    }

    pub fn arity_mismatch(name: &str, expected: impl fmt::Display, got: usize, span: Span) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("function {name} expects {expected} argument(s), got {got}"),
            span,
        )
    }

    pub fn index_out_of_bounds(index: usize, len: usize, span: Span) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
            span,
        )
    }

    pub fn slice_out_of_bounds(start: usize, end: usize, len: usize, span: Span) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("slice {start}:{end} out of bounds for length {len}"),
            span,
        )
    }

    pub fn invalid_index(got: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::InvalidIndex,
            format!("subscript must be a non-negative integer, got {got}"),
            span,
        )
    }

    pub fn invalid_range(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::InvalidRange, message.into(), span)
    }

    pub fn control_flow(keyword: &str, context: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::ControlFlow,
            format!("`{keyword}` outside of {context}"),
            span,
        )
    }

    pub fn native_argument(name: &str, message: &str, span: Span) -> Self {
        Self::new(ErrorKind::NativeArgument, format!("{name}: {message}"), span)
    }

    pub fn stack_overflow(limit: usize, span: Span) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {limit}"),
            span,
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
