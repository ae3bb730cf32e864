//! Static checks run before execution
//!
//! A best-effort pass over the parsed tree. It rejects structural misuse that
//! is visible without running the program and collects warnings for code that
//! is legal but suspicious. The interpreter still validates everything again
//! at runtime.

use crate::ast::{Block, Expr, FnDecl, Program, Span, Spanned, Stmt};
use crate::error::{CompileError, CompileWarning, Result};
use std::collections::HashSet;
use tracing::debug;

/// Static analyzer
#[derive(Debug, Default)]
pub struct Analyzer {
    /// Enclosing loops in the current function body
    loop_depth: usize,
    /// Enclosing function bodies
    fn_depth: usize,
    warnings: Vec<CompileWarning>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get collected warnings as a slice
    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// Take all warnings (clears the internal collection)
    pub fn take_warnings(&mut self) -> Vec<CompileWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check a whole program, stopping at the first error
    pub fn check_program(&mut self, program: &Program) -> Result<()> {
        self.loop_depth = 0;
        self.fn_depth = 0;
        self.check_block(&program.body)?;
        debug!(warnings = self.warnings.len(), "analysis finished");
        Ok(())
    }

    fn check_block(&mut self, block: &Block) -> Result<()> {
        let mut terminated = false;
        for (i, stmt) in block.iter().enumerate() {
            if terminated {
                let last = block.last().map_or(stmt.span, |s| s.span);
                self.warnings.push(CompileWarning::unreachable_code(stmt.span.merge(last)));
                // still check the dead statements for errors
                for dead in &block[i..] {
                    self.check_stmt(dead)?;
                }
                return Ok(());
            }
            self.check_stmt(stmt)?;
            terminated = matches!(stmt.node, Stmt::Break | Stmt::Continue | Stmt::Return(_));
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<()> {
        match &stmt.node {
            Stmt::Expr(expr) => self.check_expr(expr),
            Stmt::Block(block) => self.check_block(block),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond)?;
                self.check_block(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_block(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                self.check_expr(cond)?;
                self.check_loop_body(body)
            }
            Stmt::Range { start, end, body, .. } => {
                self.check_expr(start)?;
                self.check_expr(end)?;
                self.check_loop_body(body)
            }
            Stmt::Break if self.loop_depth == 0 => {
                Err(CompileError::analysis("`break` outside of a loop", stmt.span))
            }
            Stmt::Continue if self.loop_depth == 0 => {
                Err(CompileError::analysis("`continue` outside of a loop", stmt.span))
            }
            Stmt::Break | Stmt::Continue => Ok(()),
            Stmt::Return(_) if self.fn_depth == 0 => {
                Err(CompileError::analysis("`return` outside of a function", stmt.span))
            }
            Stmt::Return(value) => match value {
                Some(value) => self.check_expr(value),
                None => Ok(()),
            },
        }
    }

    fn check_loop_body(&mut self, body: &Block) -> Result<()> {
        self.loop_depth += 1;
        let result = self.check_block(body);
        self.loop_depth -= 1;
        result
    }

    fn check_function(&mut self, decl: &FnDecl) -> Result<()> {
        let mut seen = HashSet::new();
        for param in &decl.params {
            if !seen.insert(param.node.as_str()) {
                return Err(CompileError::analysis(
                    format!("duplicate parameter `{}`", param.node),
                    param.span,
                ));
            }
        }

        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.fn_depth += 1;
        let result = self.check_block(&decl.body);
        self.fn_depth -= 1;
        self.loop_depth = outer_loops;
        result
    }

    fn check_global(&self, name: &str, span: Span) -> Result<()> {
        if self.fn_depth == 0 {
            Err(CompileError::analysis(
                format!("`global {name}` used in global scope"),
                span,
            ))
        } else {
            Ok(())
        }
    }

    fn check_expr(&mut self, expr: &Spanned<Expr>) -> Result<()> {
        match &expr.node {
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Nil => Ok(()),
            Expr::Var { name, global } => {
                if *global {
                    self.check_global(name, expr.span)?;
                }
                Ok(())
            }
            Expr::Array(items) => items.iter().try_for_each(|item| self.check_expr(item)),
            Expr::Grouping(inner) => self.check_expr(inner),
            Expr::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
            Expr::Unary { expr: operand, .. } => self.check_expr(operand),
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond)?;
                self.check_expr(then_branch)?;
                self.check_expr(else_branch)
            }
            Expr::Call { callee, args } => {
                self.check_expr(callee)?;
                args.iter().try_for_each(|arg| self.check_expr(arg))
            }
            Expr::Index { target, index } => {
                self.check_expr(target)?;
                self.check_expr(index)
            }
            Expr::Slice { target, start, end } => {
                self.check_expr(target)?;
                if let Some(start) = start {
                    self.check_expr(start)?;
                }
                if let Some(end) = end {
                    self.check_expr(end)?;
                }
                Ok(())
            }
            Expr::Assign {
                name, global, value, ..
            } => {
                if *global {
                    self.check_global(name, expr.span)?;
                }
                self.check_expr(value)
            }
            Expr::IndexAssign {
                name,
                global,
                constant,
                index,
                value,
            } => {
                if *global {
                    self.check_global(name, expr.span)?;
                }
                if *constant {
                    self.warnings
                        .push(CompileWarning::constant_index_assign(name, expr.span));
                }
                self.check_expr(index)?;
                self.check_expr(value)
            }
            Expr::Function(decl) => self.check_function(decl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn analyze(source: &str) -> (Result<()>, Vec<CompileWarning>) {
        let tokens = tokenize(source).unwrap();
        let program = parse("test.em", source, tokens).unwrap();
        let mut analyzer = Analyzer::new();
        let result = analyzer.check_program(&program);
        (result, analyzer.take_warnings())
    }

    fn error(source: &str) -> String {
        analyze(source).0.unwrap_err().message().to_string()
    }

    #[test]
    fn test_clean_program() {
        let (result, warnings) = analyze(
            "fn f(a, b) { while a { if b { break; } continue; } return a; } for i < 0 .. 3 { f(i, 1); }",
        );
        assert!(result.is_ok());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(error("break;"), "`break` outside of a loop");
        assert_eq!(error("if true { continue; }"), "`continue` outside of a loop");
    }

    #[test]
    fn test_loop_context_does_not_cross_functions() {
        assert_eq!(error("while true { fn f() { break; } }"), "`break` outside of a loop");
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(error("return 1;"), "`return` outside of a function");
        assert!(analyze("f := fn() { while true { return 1; } };").0.is_ok());
    }

    #[test]
    fn test_duplicate_parameter() {
        let (result, _) = analyze("fn f(a, b, a) { }");
        let err = result.unwrap_err();
        assert_eq!(err.message(), "duplicate parameter `a`");
        assert_eq!(err.span(), Some(Span::new(11, 12)));
    }

    #[test]
    fn test_global_at_top_level() {
        assert_eq!(error("global x = 1;"), "`global x` used in global scope");
        assert_eq!(error("print(global x);"), "`global x` used in global scope");
        assert!(analyze("fn f() { global x = global x + 1; }").0.is_ok());
    }

    #[test]
    fn test_unreachable_code_warning() {
        let (result, warnings) = analyze("fn f() { return 1; print(2); print(3); }");
        assert!(result.is_ok());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind(), "unreachable_code");
    }

    #[test]
    fn test_dead_code_still_checked() {
        assert_eq!(error("while true { break; return 1; }"), "`return` outside of a function");
    }

    #[test]
    fn test_constant_index_assign_warning() {
        let (result, warnings) = analyze("xs = [1]; xs[0] := 2;");
        assert!(result.is_ok());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind(), "constant_index_assign");
    }

    #[test]
    fn test_nested_lambda_is_checked() {
        assert_eq!(error("print(fn(a, a) { });"), "duplicate parameter `a`");
    }

    #[test]
    fn test_take_warnings_drains() {
        let source = "while true { break; print(1); }";
        let program = parse("test.em", source, tokenize(source).unwrap()).unwrap();
        let mut analyzer = Analyzer::new();
        analyzer.check_program(&program).unwrap();
        assert!(analyzer.has_warnings());
        assert_eq!(analyzer.warnings().len(), 1);
        analyzer.take_warnings();
        assert!(!analyzer.has_warnings());
    }
}
