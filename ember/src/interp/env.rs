//! Scope chain: frames of name bindings linked to their parent
//!
//! Only function calls create frames. Reads walk the chain upward; writes
//! touch exactly one frame (the active one, or the global one when the
//! name is `global`-qualified).

use super::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to an environment
pub type EnvRef = Rc<RefCell<Environment>>;

/// A name's value and whether it may be reassigned
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

impl Binding {
    pub fn mutable(value: Value) -> Self {
        Binding {
            value,
            mutable: true,
        }
    }

    pub fn constant(value: Value) -> Self {
        Binding {
            value,
            mutable: false,
        }
    }
}

/// Signal returned when asking the global frame for its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoParent;

/// One frame of the scope chain
#[derive(Debug, Default)]
pub struct Environment {
    bindings: HashMap<String, Binding>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Create a new environment with a parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Look up a binding in this frame only
    pub fn find(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Insert a binding into this frame, shadowing any outer one
    pub fn add(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Overwrite a binding that is known to exist in this frame
    pub fn replace(&mut self, name: &str, binding: Binding) {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = binding;
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        self.bindings.remove(name)
    }

    pub fn is_global(&self) -> bool {
        self.parent.is_none()
    }

    /// Names bound in this frame
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// Create a child environment from a parent reference
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Rc::clone(parent)).into_ref()
}

/// Parent of `env`, or `NoParent` at the global frame
pub fn parent_of(env: &EnvRef) -> Result<EnvRef, NoParent> {
    env.borrow().parent.clone().ok_or(NoParent)
}

/// Root of the chain containing `env`
pub fn global_of(env: &EnvRef) -> EnvRef {
    let mut current = Rc::clone(env);
    while let Ok(parent) = parent_of(&current) {
        current = parent;
    }
    current
}

/// Resolve a name for reading, walking from `env` up to the global frame
pub fn lookup(env: &EnvRef, name: &str) -> Option<Binding> {
    let mut current = Rc::clone(env);
    loop {
        if let Some(binding) = current.borrow().find(name) {
            return Some(binding.clone());
        }
        match parent_of(&current) {
            Ok(parent) => current = parent,
            Err(NoParent) => return None,
        }
    }
}

/// Every name visible from `env`, innermost first (for suggestions)
pub fn visible_names(env: &EnvRef) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = Some(Rc::clone(env));
    while let Some(frame) = current {
        names.extend(frame.borrow().names().map(str::to_string));
        current = parent_of(&frame).ok();
    }
    names
}
