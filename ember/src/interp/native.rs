//! Native function registry
//!
//! Every native declares an arity code: below [`VARIADIC`] it is an exact
//! argument count, at or above it the native accepts at least
//! `code - VARIADIC` arguments.

use super::buffer::Buffer;
use super::env::{Binding, Environment};
use super::value::{Shared, Value};
use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Arity codes at or above this value are variadic
pub const VARIADIC: u16 = 256;

/// Decoded arity code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub const fn from_code(code: u16) -> Arity {
        if code < VARIADIC {
            Arity::Exact(code as usize)
        } else {
            Arity::AtLeast((code - VARIADIC) as usize)
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Argument fault raised inside a native; the evaluator attaches the call site
#[derive(Debug, Clone, PartialEq)]
pub struct NativeError(pub String);

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        NativeError(message.into())
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type NativeResult = Result<Value, NativeError>;

/// Native function type
pub type NativeFn = fn(&mut Host, &[Value]) -> NativeResult;

/// A builtin bound in the global frame
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    /// Arity code, see [`Arity::from_code`]
    pub arity: u16,
    /// Formal parameter names, used in diagnostics
    pub params: &'static [&'static str],
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn arity(&self) -> Arity {
        Arity::from_code(self.arity)
    }

    /// `name(a, b, rest...)`
    pub fn signature(&self) -> String {
        let mut params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        if let (Arity::AtLeast(_), Some(last)) = (self.arity(), params.last_mut()) {
            last.push_str("...");
        }
        format!("{}({})", self.name, params.join(", "))
    }
}

/// I/O endpoints available to natives
pub struct Host {
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Host {
    pub fn new(out: impl Write + 'static, input: impl BufRead + 'static) -> Self {
        Host {
            out: Box::new(out),
            input: Box::new(input),
        }
    }

    /// Process stdout/stdin
    pub fn stdio() -> Self {
        Host::new(io::stdout(), io::BufReader::new(io::stdin()))
    }
}

/// Cloneable in-memory sink, handy for capturing `print` output
#[derive(Debug, Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The fixed native registry
pub static NATIVES: &[NativeFunction] = &[
    NativeFunction { name: "print", arity: VARIADIC + 1, params: &["values"], func: native_print },
    NativeFunction { name: "input", arity: 0, params: &[], func: native_input },
    NativeFunction { name: "clock", arity: 0, params: &[], func: native_clock },
    NativeFunction { name: "len", arity: 1, params: &["sequence"], func: native_len },
    NativeFunction { name: "append", arity: VARIADIC + 2, params: &["sequence", "values"], func: native_append },
    NativeFunction { name: "extend", arity: VARIADIC + 2, params: &["sequence", "others"], func: native_extend },
    NativeFunction { name: "merge", arity: VARIADIC + 2, params: &["sequence", "others"], func: native_merge },
    NativeFunction { name: "insert", arity: 3, params: &["sequence", "index", "value"], func: native_insert },
    NativeFunction { name: "index", arity: 2, params: &["sequence", "value"], func: native_index },
    NativeFunction { name: "count", arity: 2, params: &["sequence", "value"], func: native_count },
    NativeFunction { name: "pop", arity: VARIADIC + 2, params: &["sequence", "indices"], func: native_pop },
    NativeFunction { name: "remove", arity: VARIADIC + 2, params: &["sequence", "values"], func: native_remove },
    NativeFunction { name: "clear", arity: 1, params: &["sequence"], func: native_clear },
    NativeFunction { name: "number", arity: 1, params: &["value"], func: native_number },
];

/// Bind every native as a constant in `env`
pub fn install(env: &mut Environment) {
    for native in NATIVES {
        env.add(native.name, Binding::constant(Value::Native(native)));
    }
}

// ============ Argument helpers ============

#[derive(Clone, Copy)]
enum Seq<'a> {
    Str(&'a Shared<char>),
    Array(&'a Shared<Value>),
}

fn sequence<'a>(value: &'a Value, param: &str) -> Result<Seq<'a>, NativeError> {
    match value {
        Value::String(s) => Ok(Seq::Str(s)),
        Value::Array(a) => Ok(Seq::Array(a)),
        other => Err(NativeError::new(format!(
            "`{param}` must be a string or array, got {}",
            other.type_name()
        ))),
    }
}

fn chars_of(value: &Value, param: &str) -> Result<Vec<char>, NativeError> {
    match value {
        Value::String(s) => Ok(s.borrow().as_slice().to_vec()),
        other => Err(NativeError::new(format!(
            "`{param}` must be a string, got {}",
            other.type_name()
        ))),
    }
}

fn items_of(value: &Value, param: &str) -> Result<Vec<Value>, NativeError> {
    match value {
        Value::Array(a) => Ok(a.borrow().as_slice().to_vec()),
        other => Err(NativeError::new(format!(
            "`{param}` must be an array, got {}",
            other.type_name()
        ))),
    }
}

fn index_arg(value: &Value, param: &str) -> Result<usize, NativeError> {
    value.as_index().ok_or_else(|| {
        NativeError::new(format!(
            "`{param}` must be a non-negative integer, got {value}"
        ))
    })
}

fn out_of_bounds(index: usize, len: usize) -> NativeError {
    NativeError::new(format!("index {index} out of bounds for length {len}"))
}

// ============ Built-in Functions ============

fn native_print(host: &mut Host, args: &[Value]) -> NativeResult {
    let line: Vec<String> = args.iter().map(Value::to_string).collect();
    writeln!(host.out, "{}", line.join(" "))
        .and_then(|_| host.out.flush())
        .map_err(|e| NativeError::new(format!("failed to write output: {e}")))?;
    Ok(Value::Nil)
}

fn native_input(host: &mut Host, _args: &[Value]) -> NativeResult {
    let mut line = String::new();
    let read = host
        .input
        .read_line(&mut line)
        .map_err(|e| NativeError::new(format!("failed to read input: {e}")))?;
    if read == 0 {
        return Ok(Value::Nil);
    }
    let line = line.strip_suffix('\n').unwrap_or(&line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    Ok(Value::string(line))
}

fn native_clock(_host: &mut Host, _args: &[Value]) -> NativeResult {
    let micros = chrono::Utc::now().timestamp_micros();
    Ok(Value::Float(micros as f64 / 1_000_000.0))
}

fn native_len(_host: &mut Host, args: &[Value]) -> NativeResult {
    let len = match sequence(&args[0], "sequence")? {
        Seq::Str(s) => s.borrow().len(),
        Seq::Array(a) => a.borrow().len(),
    };
    Ok(Value::Float(len as f64))
}

fn native_append(_host: &mut Host, args: &[Value]) -> NativeResult {
    match sequence(&args[0], "sequence")? {
        Seq::Array(a) => {
            let values = args[1..].to_vec();
            a.borrow_mut().extend_from_slice(&values);
        }
        Seq::Str(s) => {
            let mut chars = Vec::new();
            for value in &args[1..] {
                chars.extend(chars_of(value, "values")?);
            }
            s.borrow_mut().extend_from_slice(&chars);
        }
    }
    Ok(args[0].clone())
}

fn native_extend(_host: &mut Host, args: &[Value]) -> NativeResult {
    match sequence(&args[0], "sequence")? {
        Seq::Array(a) => {
            let mut values = Vec::new();
            for other in &args[1..] {
                values.extend(items_of(other, "others")?);
            }
            a.borrow_mut().extend_from_slice(&values);
        }
        Seq::Str(s) => {
            let mut chars = Vec::new();
            for other in &args[1..] {
                chars.extend(chars_of(other, "others")?);
            }
            s.borrow_mut().extend_from_slice(&chars);
        }
    }
    Ok(args[0].clone())
}

fn native_merge(_host: &mut Host, args: &[Value]) -> NativeResult {
    match sequence(&args[0], "sequence")? {
        Seq::Array(a) => {
            let mut merged = a.borrow().clone();
            for other in &args[1..] {
                merged = merged.merge(&Buffer::from_vec(items_of(other, "others")?));
            }
            Ok(Value::array_from_buffer(merged))
        }
        Seq::Str(s) => {
            let mut merged = s.borrow().clone();
            for other in &args[1..] {
                merged = merged.merge(&Buffer::from_vec(chars_of(other, "others")?));
            }
            Ok(Value::string_from_buffer(merged))
        }
    }
}

fn native_insert(_host: &mut Host, args: &[Value]) -> NativeResult {
    let index = index_arg(&args[1], "index")?;
    let (inserted, len) = match sequence(&args[0], "sequence")? {
        Seq::Array(a) => {
            let mut buf = a.borrow_mut();
            (buf.insert_slice(index, &[args[2].clone()]), buf.len())
        }
        Seq::Str(s) => {
            let chars = chars_of(&args[2], "value")?;
            let mut buf = s.borrow_mut();
            (buf.insert_slice(index, &chars), buf.len())
        }
    };
    if !inserted {
        return Err(out_of_bounds(index, len));
    }
    Ok(args[0].clone())
}

fn native_index(_host: &mut Host, args: &[Value]) -> NativeResult {
    let found = match sequence(&args[0], "sequence")? {
        Seq::Array(a) => a.borrow().iter().position(|item| *item == args[1]),
        Seq::Str(s) => {
            let needle = chars_of(&args[1], "value")?;
            s.borrow().find(&needle)
        }
    };
    Ok(Value::Float(found.map_or(-1.0, |i| i as f64)))
}

fn native_count(_host: &mut Host, args: &[Value]) -> NativeResult {
    let count = match sequence(&args[0], "sequence")? {
        Seq::Array(a) => a.borrow().iter().filter(|item| **item == args[1]).count(),
        Seq::Str(s) => {
            let needle = chars_of(&args[1], "value")?;
            if needle.is_empty() {
                return Err(NativeError::new("cannot count occurrences of an empty string"));
            }
            s.borrow().count(&needle)
        }
    };
    Ok(Value::Float(count as f64))
}

fn native_pop(_host: &mut Host, args: &[Value]) -> NativeResult {
    let seq = sequence(&args[0], "sequence")?;
    let mut popped = Vec::with_capacity(args.len() - 1);
    for arg in &args[1..] {
        let index = index_arg(arg, "indices")?;
        let value = match seq {
            Seq::Array(a) => {
                let mut buf = a.borrow_mut();
                let len = buf.len();
                buf.remove(index).ok_or_else(|| out_of_bounds(index, len))?
            }
            Seq::Str(s) => {
                let mut buf = s.borrow_mut();
                let len = buf.len();
                let c = buf.remove(index).ok_or_else(|| out_of_bounds(index, len))?;
                Value::string_from_buffer(Buffer::from_vec(vec![c]))
            }
        };
        popped.push(value);
    }
    if popped.len() == 1 {
        Ok(popped.remove(0))
    } else {
        Ok(Value::array(popped))
    }
}

fn native_remove(_host: &mut Host, args: &[Value]) -> NativeResult {
    match sequence(&args[0], "sequence")? {
        Seq::Array(a) => {
            for value in &args[1..] {
                let position = a.borrow().iter().position(|item| item == value);
                match position {
                    Some(i) => {
                        a.borrow_mut().remove(i);
                    }
                    None => return Err(NativeError::new(format!("value not found: {value}"))),
                }
            }
        }
        Seq::Str(s) => {
            for value in &args[1..] {
                let needle = chars_of(value, "values")?;
                let position = s.borrow().find(&needle);
                match position {
                    Some(i) => {
                        s.borrow_mut().remove_range(i, i + needle.len());
                    }
                    None => return Err(NativeError::new(format!("substring not found: {value:?}", value = value.to_string()))),
                }
            }
        }
    }
    Ok(args[0].clone())
}

fn native_clear(_host: &mut Host, args: &[Value]) -> NativeResult {
    match sequence(&args[0], "sequence")? {
        Seq::Array(a) => a.borrow_mut().clear(),
        Seq::Str(s) => s.borrow_mut().clear(),
    }
    Ok(args[0].clone())
}

fn native_number(_host: &mut Host, args: &[Value]) -> NativeResult {
    match &args[0] {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::String(s) => {
            let text = s.borrow().to_string();
            Ok(text.trim().parse::<f64>().map_or(Value::Nil, Value::Float))
        }
        other => Err(NativeError::new(format!(
            "`value` must be a string or float, got {}",
            other.type_name()
        ))),
    }
}
