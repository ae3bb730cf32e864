//! Runtime values for the interpreter

use super::buffer::Buffer;
use super::native::NativeFunction;
use crate::ast::FnDecl;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable buffer cell. Cloning a `Value` holding one aliases it.
pub type Shared<T> = Rc<RefCell<Buffer<T>>>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Float(f64),
    Bool(bool),
    String(Shared<char>),
    Array(Shared<Value>),
    /// User function: parameters and body only, no captured frame
    Function(Rc<FnDecl>),
    Native(&'static NativeFunction),
    Nil,
}

impl Value {
    /// Fresh string buffer holding `s`
    pub fn string(s: &str) -> Value {
        Value::String(Rc::new(RefCell::new(Buffer::from(s))))
    }

    pub fn string_from_buffer(buf: Buffer<char>) -> Value {
        Value::String(Rc::new(RefCell::new(buf)))
    }

    /// Fresh array buffer holding `items`
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(Buffer::from_vec(items))))
    }

    pub fn array_from_buffer(buf: Buffer<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(buf)))
    }

    /// `nil` and `false` are falsy; everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Get type name for error messages and `typeof`
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Nil => "nil",
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Non-negative integral float as an index
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Float(f) if is_integral(*f) && *f >= 0.0 => Some(*f as usize),
            _ => None,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, nested: bool, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => write!(f, "nil"),
            Value::String(s) if nested => write!(f, "{:?}", s.borrow().to_string()),
            Value::String(s) => write!(f, "{}", s.borrow()),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if open.contains(&ptr) {
                    return write!(f, "[...]");
                }
                open.push(ptr);
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.render(f, true, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Function(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.node.as_str()).collect();
                write!(f, "<fn({})>", params.join(", "))
            }
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

/// Finite float with no fractional part
pub fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, false, &mut Vec::new())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl Value {
    /// Structural equality. `open` holds the array pairs being compared;
    /// meeting one again means both sides cycle the same way.
    fn equals(&self, other: &Value, open: &mut Vec<(*const (), *const ())>) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if open.contains(&pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }
                open.push(pair);
                let equal = a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, open));
                open.pop();
                equal
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            _ => false,
        }
    }
}
