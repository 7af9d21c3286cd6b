use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::evaluator::EvalResult;
use crate::value::{NativeFunction, Value};

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Cannot resolve '{0}' as it does not exist")]
    UnresolvedIdentifier(String),
    #[error("Cannot declare '{0}' as it already exists in this scope")]
    AlreadyDeclared(String),
    #[error("Cannot re-assign to '{0}' as it is a constant")]
    ConstantReassignment(String),
}

/// Shared handle to a scope. Children keep their parent alive, and so do
/// closures that captured it.
pub type EnvRef = Rc<RefCell<Environment>>;

// --- Environment Definition ---

pub struct Environment {
    parent: Option<EnvRef>,
    variables: HashMap<String, Value>,
    constants: HashSet<String>,
    depth: usize,
}

impl Environment {
    /// Creates a new, empty top-level environment.
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Environment {
            parent: None,
            variables: HashMap::new(),
            constants: HashSet::new(),
            depth: 0,
        }))
    }

    /// Creates the global environment with the built-in constants and
    /// the `print` native function.
    pub fn new_global() -> EnvRef {
        let env_ptr = Environment::new();
        {
            let mut env = env_ptr.borrow_mut();
            env.define_constant("true", Value::Boolean(true));
            env.define_constant("false", Value::Boolean(false));
            env.define_constant("null", Value::Null);
            env.define_native("print", crate::builtins::print);
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(parent: &EnvRef) -> EnvRef {
        let depth = parent.borrow().depth + 1;
        Rc::new(RefCell::new(Environment {
            parent: Some(Rc::clone(parent)),
            variables: HashMap::new(),
            constants: HashSet::new(),
            depth,
        }))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&EnvRef> {
        self.parent.as_ref()
    }

    /// Whether `name` is declared in *this* scope (ancestors are not consulted).
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    /// Declares a variable in the current scope. Shadowing an ancestor's
    /// binding is fine, redeclaring in the same scope is not.
    pub fn declare(
        &mut self,
        name: &str,
        value: Value,
        constant: bool,
    ) -> Result<Value, EnvError> {
        if self.variables.contains_key(name) {
            return Err(EnvError::AlreadyDeclared(name.to_string()));
        }
        if constant {
            self.constants.insert(name.to_string());
        }
        tracing::trace!(name, constant, depth = self.depth, "declare");
        self.variables.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Overwrites the binding in the nearest scope that declares `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<Value, EnvError> {
        if let Some(slot) = self.variables.get_mut(name) {
            if self.constants.contains(name) {
                return Err(EnvError::ConstantReassignment(name.to_string()));
            }
            *slot = value.clone();
            Ok(value)
        } else {
            match &self.parent {
                Some(parent) => parent.borrow_mut().assign(name, value),
                None => Err(EnvError::UnresolvedIdentifier(name.to_string())),
            }
        }
    }

    /// Looks up a variable's value, walking up the parent chain.
    pub fn lookup(&self, name: &str) -> Result<Value, EnvError> {
        if let Some(value) = self.variables.get(name) {
            Ok(value.clone())
        } else {
            match &self.parent {
                Some(parent) => parent.borrow().lookup(name),
                None => Err(EnvError::UnresolvedIdentifier(name.to_string())),
            }
        }
    }

    /// Returns the nearest scope, starting at `env`, that declares `name`.
    pub fn resolve(env: &EnvRef, name: &str) -> Result<EnvRef, EnvError> {
        let mut current = Rc::clone(env);
        loop {
            let parent = {
                let scope = current.borrow();
                if scope.variables.contains_key(name) {
                    None
                } else {
                    match &scope.parent {
                        Some(parent) => Some(Rc::clone(parent)),
                        None => return Err(EnvError::UnresolvedIdentifier(name.to_string())),
                    }
                }
            };
            match parent {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
    }

    fn define_constant(&mut self, name: &str, value: Value) {
        self.constants.insert(name.to_string());
        self.variables.insert(name.to_string(), value);
    }

    /// Registers a host callback under `name` as a constant binding.
    pub fn define_native<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(Vec<Value>, &EnvRef) -> EvalResult<Value> + 'static,
    {
        self.define_constant(name, Value::NativeFunction(NativeFunction::new(name, callback)));
    }

    /// Gets every identifier visible from this scope
    pub fn identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.variables.keys().cloned().collect();
        if let Some(parent) = &self.parent {
            identifiers.extend(parent.borrow().identifiers());
        }
        identifiers
    }
}

// Bindings may hold closures over this very scope, so only names are shown.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("depth", &self.depth)
            .field("variables", &names)
            .finish()
    }
}
