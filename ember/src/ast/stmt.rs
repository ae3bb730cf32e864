//! Statement AST nodes

use super::{BinOp, Expr, Spanned};
use serde::{Deserialize, Serialize};

/// A sequence of statements sharing the enclosing scope frame
pub type Block = Vec<Spanned<Stmt>>;

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression evaluated for its side effects
    Expr(Spanned<Expr>),

    /// Bare `{ ... }` block (does not open a new frame)
    Block(Block),

    /// `if cond { ... } else { ... }`; `else if` nests another `If` in `else_branch`
    If {
        cond: Spanned<Expr>,
        then_branch: Block,
        else_branch: Option<Block>,
    },

    /// `while cond { ... }`
    While { cond: Spanned<Expr>, body: Block },

    /// Counted loop: `for var <cmp> start .. end { ... }`
    Range {
        var: Spanned<String>,
        cmp: Spanned<BinOp>,
        start: Spanned<Expr>,
        end: Spanned<Expr>,
        body: Block,
    },

    Break,
    Continue,
    Return(Option<Spanned<Expr>>),
}
