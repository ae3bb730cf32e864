//! Tree-walking evaluator

use super::buffer::Buffer;
use super::env::{child_env, global_of, visible_names, Binding, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::native::{self, Host, NativeFunction};
use super::state::{ExecState, Flow};
use super::value::{is_integral, Value};
use crate::ast::{BinOp, Block, Expr, FnDecl, Program, Span, Spanned, Stmt, UnOp};
use crate::util::{find_similar_name, format_suggestion_hint};
use std::rc::Rc;
use tracing::{debug, instrument, trace};

/// Default limit on nested user-function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Interpreter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpConfig {
    /// Calls nested deeper than this raise a stack-overflow fault
    pub max_call_depth: usize,
}

impl Default for InterpConfig {
    fn default() -> Self {
        InterpConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// The interpreter
pub struct Interpreter {
    /// Global frame, seeded with the native registry
    globals: EnvRef,
    host: Host,
    config: InterpConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter wired to the process stdout/stdin
    pub fn new() -> Self {
        Self::with_host(Host::stdio())
    }

    pub fn with_host(host: Host) -> Self {
        Interpreter {
            globals: fresh_globals(),
            host,
            config: InterpConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpConfig) -> Self {
        self.config = config;
        self
    }

    /// The global frame
    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Drop every user binding, keeping only the natives
    pub fn reset(&mut self) {
        self.globals = fresh_globals();
    }

    /// Execute a program's top-level block in the global frame
    #[instrument(level = "debug", skip_all, fields(statements = program.body.len()))]
    pub fn run(&mut self, program: &Program) -> InterpResult<()> {
        let globals = Rc::clone(&self.globals);
        self.exec_block(&program.body, &globals, ExecState::top_level())?;
        debug!("program finished");
        Ok(())
    }

    /// Evaluate a single expression in the global frame (for REPL)
    pub fn eval_expr(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        let globals = Rc::clone(&self.globals);
        self.eval(expr, &globals, ExecState::top_level())
    }

    // ============ Statements ============

    fn exec_block(&mut self, block: &[Spanned<Stmt>], env: &EnvRef, state: ExecState) -> InterpResult<Flow> {
        for stmt in block {
            let flow = self.exec(stmt, env, state)?;
            if !flow.is_normal() {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Execute a statement with automatic stack growth for deep recursion
    fn exec(&mut self, stmt: &Spanned<Stmt>, env: &EnvRef, state: ExecState) -> InterpResult<Flow> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.exec_inner(stmt, env, state))
    }

    fn exec_inner(&mut self, stmt: &Spanned<Stmt>, env: &EnvRef, state: ExecState) -> InterpResult<Flow> {
        match &stmt.node {
            Stmt::Expr(expr) => {
                self.eval(expr, env, state)?;
                Ok(Flow::Normal)
            }

            Stmt::Block(block) => self.exec_block(block, env, state),

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env, state)?.is_truthy() {
                    self.exec_block(then_branch, env, state)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch, env, state)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { cond, body } => self.exec_while(cond, body, env, state),

            Stmt::Range {
                var,
                cmp,
                start,
                end,
                body,
            } => self.exec_range(var, cmp, start, end, body, env, state),

            Stmt::Break if state.in_loop() => Ok(Flow::Break),
            Stmt::Break => Err(RuntimeError::control_flow("break", "a loop", stmt.span)),

            Stmt::Continue if state.in_loop() => Ok(Flow::Continue),
            Stmt::Continue => Err(RuntimeError::control_flow("continue", "a loop", stmt.span)),

            Stmt::Return(_) if !state.in_call() => {
                Err(RuntimeError::control_flow("return", "a function", stmt.span))
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env, state)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn exec_while(&mut self, cond: &Spanned<Expr>, body: &Block, env: &EnvRef, state: ExecState) -> InterpResult<Flow> {
        let body_state = state.enter_loop();
        trace!(depth = body_state.loop_depth, "entering while loop");
        while self.eval(cond, env, state)?.is_truthy() {
            match self.exec_block(body, env, body_state)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_range(
        &mut self,
        var: &Spanned<String>,
        cmp: &Spanned<BinOp>,
        start: &Spanned<Expr>,
        end: &Spanned<Expr>,
        body: &Block,
        env: &EnvRef,
        state: ExecState,
    ) -> InterpResult<Flow> {
        let first = self.range_bound(start, env, state)?;
        let last = self.range_bound(end, env, state)?;

        let step = match cmp.node {
            BinOp::Lt | BinOp::Le => 1.0,
            BinOp::Gt | BinOp::Ge => -1.0,
            other => {
                return Err(RuntimeError::invalid_range(
                    format!("`{other}` is not a range comparison"),
                    cmp.span,
                ));
            }
        };
        if (step > 0.0 && first > last) || (step < 0.0 && first < last) {
            let direction = if step > 0.0 { "ascending" } else { "descending" };
            return Err(RuntimeError::invalid_range(
                format!("{direction} range cannot go from {first} to {last}"),
                start.span.merge(end.span),
            ));
        }

        trace!(var = %var.node, first, last, step, "entering range loop");
        env.borrow_mut().add(var.node.clone(), Binding::mutable(Value::Float(first)));
        let result = self.range_iterations(var, cmp.node, last, step, body, env, state);
        env.borrow_mut().remove(&var.node);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn range_iterations(
        &mut self,
        var: &Spanned<String>,
        cmp: BinOp,
        last: f64,
        step: f64,
        body: &Block,
        env: &EnvRef,
        state: ExecState,
    ) -> InterpResult<Flow> {
        let body_state = state.enter_loop();
        loop {
            if !compare(cmp, self.range_counter(var, env)?, last) {
                return Ok(Flow::Normal);
            }
            match self.exec_block(body, env, body_state)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
            let next = self.range_counter(var, env)? + step;
            env.borrow_mut().add(var.node.clone(), Binding::mutable(Value::Float(next)));
        }
    }

    fn range_bound(&mut self, expr: &Spanned<Expr>, env: &EnvRef, state: ExecState) -> InterpResult<f64> {
        match self.eval(expr, env, state)? {
            Value::Float(f) if is_integral(f) => Ok(f),
            other => Err(RuntimeError::invalid_range(
                format!("range bound must be an integer, got {}", describe(&other)),
                expr.span,
            )),
        }
    }

    /// Current value of a range-loop variable in the active frame
    fn range_counter(&self, var: &Spanned<String>, env: &EnvRef) -> InterpResult<f64> {
        let value = env.borrow().find(&var.node).map(|b| b.value.clone());
        match value {
            Some(Value::Float(f)) => Ok(f),
            Some(other) => Err(RuntimeError::invalid_range(
                format!("loop variable `{}` must stay a float, got {}", var.node, other.type_name()),
                var.span,
            )),
            None => Err(self.unbound(&var.node, env, var.span)),
        }
    }

    // ============ Expressions ============

    /// Evaluate an expression with automatic stack growth for deep recursion
    fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef, state: ExecState) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env, state))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef, state: ExecState) -> InterpResult<Value> {
        match &expr.node {
            Expr::Number(n) => Ok(Value::Float(*n)),
            // every evaluation yields a fresh buffer
            Expr::Str(s) => Ok(Value::string(s)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Nil => Ok(Value::Nil),

            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env, state)?);
                }
                Ok(Value::array(values))
            }

            Expr::Grouping(inner) => self.eval(inner, env, state),

            Expr::Var { name, global } => self.read_var(name, *global, expr.span, env),

            Expr::Binary {
                left,
                op: BinOp::And,
                right,
            } => {
                let left = self.eval(left, env, state)?;
                if left.is_truthy() {
                    self.eval(right, env, state)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary {
                left,
                op: BinOp::Or,
                right,
            } => {
                let left = self.eval(left, env, state)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right, env, state)
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.eval(left, env, state)?;
                let right = self.eval(right, env, state)?;
                eval_binary(*op, left, right, expr.span)
            }

            Expr::Unary { op, expr: operand } => {
                let value = self.eval(operand, env, state)?;
                eval_unary(*op, value, expr.span)
            }

            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env, state)?.is_truthy() {
                    self.eval(then_branch, env, state)
                } else {
                    self.eval(else_branch, env, state)
                }
            }

            Expr::Call { callee, args } => self.eval_call(callee, args, expr.span, env, state),

            Expr::Index { target, index } => {
                let target = self.eval(target, env, state)?;
                let index = self.eval(index, env, state)?;
                eval_index(&target, &index, expr.span)
            }

            Expr::Slice { target, start, end } => {
                let target = self.eval(target, env, state)?;
                let start = match start {
                    Some(start) => self.eval(start, env, state)?,
                    None => Value::Float(f64::NEG_INFINITY),
                };
                let end = match end {
                    Some(end) => self.eval(end, env, state)?,
                    None => Value::Float(f64::INFINITY),
                };
                eval_slice(&target, &start, &end, expr.span)
            }

            Expr::Assign {
                name,
                global,
                constant,
                value,
            } => {
                let value = self.eval(value, env, state)?;
                self.assign(name, *global, *constant, value, expr.span, env)
            }

            Expr::IndexAssign { name, constant: true, .. } => {
                Err(RuntimeError::constant_index_assign(name, expr.span))
            }
            Expr::IndexAssign {
                name,
                global,
                index,
                value,
                ..
            } => {
                let index = self.eval(index, env, state)?;
                let value = self.eval(value, env, state)?;
                self.index_assign(name, *global, &index, value, expr.span, env)
            }

            Expr::Function(decl) => Ok(Value::Function(Rc::clone(decl))),
        }
    }

    // ============ Names ============

    fn read_var(&self, name: &str, global: bool, span: Span, env: &EnvRef) -> InterpResult<Value> {
        let frame = if global {
            self.global_frame(name, span, env)?
        } else {
            Rc::clone(env)
        };
        super::env::lookup(&frame, name)
            .map(|binding| binding.value)
            .ok_or_else(|| self.unbound(name, &frame, span))
    }

    /// Frame targeted by a `global`-qualified name
    fn global_frame(&self, name: &str, span: Span, env: &EnvRef) -> InterpResult<EnvRef> {
        if env.borrow().is_global() {
            return Err(RuntimeError::global_in_global_scope(name, span));
        }
        Ok(global_of(env))
    }

    fn unbound(&self, name: &str, env: &EnvRef, span: Span) -> RuntimeError {
        let names = visible_names(env);
        let hint = format_suggestion_hint(find_similar_name(name, names.iter().map(String::as_str)));
        RuntimeError::unbound_variable(name, &hint, span)
    }

    fn assign(
        &mut self,
        name: &str,
        global: bool,
        constant: bool,
        value: Value,
        span: Span,
        env: &EnvRef,
    ) -> InterpResult<Value> {
        let frame = if global {
            self.global_frame(name, span, env)?
        } else {
            Rc::clone(env)
        };
        let binding = if constant {
            Binding::constant(value.clone())
        } else {
            Binding::mutable(value.clone())
        };

        let existing = frame.borrow().find(name).map(|b| b.mutable);
        match existing {
            None => frame.borrow_mut().add(name, binding),
            Some(true) => frame.borrow_mut().replace(name, binding),
            Some(false) => return Err(RuntimeError::constant_reassignment(name, span)),
        }
        Ok(value)
    }

    fn index_assign(
        &mut self,
        name: &str,
        global: bool,
        index: &Value,
        value: Value,
        span: Span,
        env: &EnvRef,
    ) -> InterpResult<Value> {
        let frame = if global {
            self.global_frame(name, span, env)?
        } else {
            Rc::clone(env)
        };
        let target = frame.borrow().find(name).map(|b| b.value.clone());
        let target = target.ok_or_else(|| self.unbound(name, &frame, span))?;

        match &target {
            Value::Array(items) => {
                let index = to_index(index, span)?;
                let mut items = items.borrow_mut();
                let len = items.len();
                if !items.set(index, value.clone()) {
                    return Err(RuntimeError::index_out_of_bounds(index, len, span));
                }
            }
            Value::String(chars) => {
                let index = to_index(index, span)?;
                let c = single_char(&value).ok_or_else(|| {
                    RuntimeError::type_error(
                        format!(
                            "string elements can only be assigned one-character strings, got {}",
                            describe(&value)
                        ),
                        span,
                    )
                })?;
                let mut chars = chars.borrow_mut();
                let len = chars.len();
                if !chars.set(index, c) {
                    return Err(RuntimeError::index_out_of_bounds(index, len, span));
                }
            }
            other => {
                return Err(RuntimeError::type_error(
                    format!("cannot assign to an element of {}", other.type_name()),
                    span,
                ));
            }
        }
        Ok(value)
    }

    // ============ Calls ============

    fn eval_call(
        &mut self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: Span,
        env: &EnvRef,
        state: ExecState,
    ) -> InterpResult<Value> {
        let function = self.eval(callee, env, state)?;

        match function {
            Value::Function(decl) => {
                if decl.arity() != args.len() {
                    return Err(RuntimeError::arity_mismatch(
                        &callee_name(callee),
                        decl.arity(),
                        args.len(),
                        span,
                    ));
                }
                let values = self.eval_args(args, env, state)?;
                self.call_function(&decl, values, span, env, state)
            }
            Value::Native(native) => {
                if !native.arity().accepts(args.len()) {
                    return Err(RuntimeError::arity_mismatch(
                        &native.signature(),
                        native.arity(),
                        args.len(),
                        span,
                    ));
                }
                let values = self.eval_args(args, env, state)?;
                self.call_native(native, &values, span)
            }
            other => Err(RuntimeError::type_error(
                format!("{} is not callable", other.type_name()),
                callee.span,
            )),
        }
    }

    fn eval_args(&mut self, args: &[Spanned<Expr>], env: &EnvRef, state: ExecState) -> InterpResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env, state)?);
        }
        Ok(values)
    }

    /// Run a user function in a fresh child of the caller's frame
    fn call_function(
        &mut self,
        decl: &FnDecl,
        args: Vec<Value>,
        span: Span,
        caller: &EnvRef,
        state: ExecState,
    ) -> InterpResult<Value> {
        let state = state.enter_call();
        if state.call_depth > self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_call_depth, span));
        }
        trace!(depth = state.call_depth, arity = decl.arity(), "calling function");

        let frame = child_env(caller);
        {
            let mut frame = frame.borrow_mut();
            for (param, arg) in decl.params.iter().zip(args) {
                frame.add(param.node.clone(), Binding::mutable(arg));
            }
        }

        match self.exec_block(&decl.body, &frame, state)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    fn call_native(&mut self, native: &'static NativeFunction, args: &[Value], span: Span) -> InterpResult<Value> {
        trace!(native = native.name, argc = args.len(), "calling native");
        (native.func)(&mut self.host, args)
            .map_err(|err| RuntimeError::native_argument(native.name, &err.0, span))
    }
}

fn fresh_globals() -> EnvRef {
    let mut globals = Environment::new();
    native::install(&mut globals);
    globals.into_ref()
}

/// Name used for a callee in arity diagnostics
fn callee_name(callee: &Spanned<Expr>) -> String {
    match &callee.node {
        Expr::Var { name, .. } => name.clone(),
        _ => "<anonymous>".to_string(),
    }
}

/// Short rendering of a value for fault messages
fn describe(value: &Value) -> String {
    match value {
        Value::Float(f) => f.to_string(),
        other => other.type_name().to_string(),
    }
}

fn compare(op: BinOp, a: f64, b: f64) -> bool {
    match op {
        BinOp::Lt => a < b,
        BinOp::Le => a <= b,
        BinOp::Gt => a > b,
        BinOp::Ge => a >= b,
        _ => false,
    }
}

fn single_char(value: &Value) -> Option<char> {
    match value {
        Value::String(s) => match s.borrow().as_slice() {
            [c] => Some(*c),
            _ => None,
        },
        _ => None,
    }
}

// ============ Operators ============

fn eval_binary(op: BinOp, left: Value, right: Value, span: Span) -> InterpResult<Value> {
    use Value::{Array, Float};

    match (op, &left, &right) {
        (BinOp::Eq, _, _) => Ok(Value::Bool(left == right)),
        (BinOp::Ne, _, _) => Ok(Value::Bool(left != right)),

        (BinOp::Add, Float(a), Float(b)) => Ok(Float(a + b)),
        (BinOp::Add, Value::String(a), Value::String(b)) => {
            let merged = a.borrow().merge(&b.borrow());
            Ok(Value::string_from_buffer(merged))
        }
        (BinOp::Add, Array(a), Array(b)) => {
            let merged = a.borrow().merge(&b.borrow());
            Ok(Value::array_from_buffer(merged))
        }
        (BinOp::Sub, Float(a), Float(b)) => Ok(Float(a - b)),
        (BinOp::Mul, Float(a), Float(b)) => Ok(Float(a * b)),
        (BinOp::Div, Float(a), Float(b)) => Ok(Float(a / b)),
        (BinOp::Mod, Float(a), Float(b)) => Ok(Float(a % b)),

        (op, Float(a), Float(b)) if op.is_comparison() => Ok(Value::Bool(compare(op, *a, *b))),

        _ => Err(RuntimeError::binary_type_mismatch(
            &op.to_string(),
            left.type_name(),
            right.type_name(),
            span,
        )),
    }
}

fn eval_unary(op: UnOp, value: Value, span: Span) -> InterpResult<Value> {
    match (op, &value) {
        (UnOp::Not, _) => Ok(Value::Bool(!value.is_truthy())),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Pos, Value::Float(f)) => Ok(Value::Float(*f)),
        (UnOp::TypeOf, _) => Ok(Value::string(value.type_name())),
        (UnOp::Stringify, _) => Ok(Value::string(&value.to_string())),
        _ => Err(RuntimeError::unary_type_mismatch(&op.to_string(), value.type_name(), span)),
    }
}

// ============ Subscripts ============

/// Subscript value as a position; negative infinity means 0
fn to_index(index: &Value, span: Span) -> InterpResult<usize> {
    match index {
        Value::Float(f) if *f == f64::NEG_INFINITY => Ok(0),
        other => other
            .as_index()
            .ok_or_else(|| RuntimeError::invalid_index(&describe(other), span)),
    }
}

/// Slice end; positive infinity means the current length
fn to_slice_end(end: &Value, len: usize, span: Span) -> InterpResult<usize> {
    match end {
        Value::Float(f) if *f == f64::INFINITY => Ok(len),
        other => to_index(other, span),
    }
}

fn eval_index(target: &Value, index: &Value, span: Span) -> InterpResult<Value> {
    match target {
        Value::Array(items) => {
            let index = to_index(index, span)?;
            let items = items.borrow();
            items
                .get(index)
                .cloned()
                .ok_or_else(|| RuntimeError::index_out_of_bounds(index, items.len(), span))
        }
        Value::String(chars) => {
            let index = to_index(index, span)?;
            let chars = chars.borrow();
            chars
                .get(index)
                .map(|c| Value::string_from_buffer(Buffer::from_vec(vec![*c])))
                .ok_or_else(|| RuntimeError::index_out_of_bounds(index, chars.len(), span))
        }
        other => Err(RuntimeError::type_error(
            format!("cannot index into {}", other.type_name()),
            span,
        )),
    }
}

fn eval_slice(target: &Value, start: &Value, end: &Value, span: Span) -> InterpResult<Value> {
    match target {
        Value::Array(items) => {
            let items = items.borrow();
            let (start, end) = (to_index(start, span)?, to_slice_end(end, items.len(), span)?);
            items
                .range(start, end)
                .map(Value::array_from_buffer)
                .ok_or_else(|| RuntimeError::slice_out_of_bounds(start, end, items.len(), span))
        }
        Value::String(chars) => {
            let chars = chars.borrow();
            let (start, end) = (to_index(start, span)?, to_slice_end(end, chars.len(), span)?);
            chars
                .range(start, end)
                .map(Value::string_from_buffer)
                .ok_or_else(|| RuntimeError::slice_out_of_bounds(start, end, chars.len(), span))
        }
        other => Err(RuntimeError::type_error(
            format!("cannot slice {}", other.type_name()),
            span,
        )),
    }
}
