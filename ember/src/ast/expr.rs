//! Expression AST nodes

use super::{Spanned, Stmt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Number literal (every number is a float)
    Number(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// `nil`
    Nil,

    /// Array literal: `[a, b, c]`
    Array(Vec<Spanned<Expr>>),

    /// Parenthesized expression
    Grouping(Box<Spanned<Expr>>),

    /// Variable reference, optionally `global`-qualified
    Var { name: String, global: bool },

    /// Binary operation (including short-circuit `and`/`or`)
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Conditional expression: `cond ? then_branch : else_branch`
    Conditional {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Box<Spanned<Expr>>,
    },

    /// Function call
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// Single-element subscript: `target[index]`
    Index {
        target: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    /// Range subscript: `target[start:end]`, either bound optional
    Slice {
        target: Box<Spanned<Expr>>,
        start: Option<Box<Spanned<Expr>>>,
        end: Option<Box<Spanned<Expr>>>,
    },

    /// Assignment to a name: `x = v` or `x := v`
    Assign {
        name: String,
        global: bool,
        constant: bool,
        value: Box<Spanned<Expr>>,
    },

    /// Assignment through a subscript: `x[i] = v`
    IndexAssign {
        name: String,
        global: bool,
        constant: bool,
        index: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    /// Function literal: `fn(a, b) { ... }`
    Function(Rc<FnDecl>),
}

/// Parameters and body of a function literal. Carries no environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub params: Vec<Spanned<String>>,
    pub body: Vec<Spanned<Stmt>>,
}

impl FnDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Ordering comparisons usable in a range-loop header
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        };
        write!(f, "{s}")
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Logical negation (`!` / `not`)
    Not,
    /// Numeric negation
    Neg,
    /// Numeric identity
    Pos,
    /// Type name of the operand as a string
    TypeOf,
    /// Human-readable rendering of the operand (`$x`)
    Stringify,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
            UnOp::Pos => "+",
            UnOp::TypeOf => "typeof",
            UnOp::Stringify => "$",
        };
        write!(f, "{s}")
    }
}
