use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::ast::Node;
use crate::environment::EnvRef;
use crate::evaluator::EvalResult;

/// Host callback behind a native function: receives the evaluated
/// arguments in order and the environment of the call site.
pub type NativeCallback = dyn Fn(Vec<Value>, &EnvRef) -> EvalResult<Value>;

/// A runtime value produced by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    Object(HashMap<String, Value>),
    Function(Function),
    NativeFunction(NativeFunction),
}

/// A user-defined function together with the scope it was declared in.
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Rc<[Node]>,
    pub closure: EnvRef,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub callback: Rc<NativeCallback>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Vec<Value>, &EnvRef) -> EvalResult<Value> + 'static,
    {
        NativeFunction {
            name: name.into(),
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, args: Vec<Value>, env: &EnvRef) -> EvalResult<Value> {
        (self.callback)(args, env)
    }
}

// The captured scope is left out: it usually contains the function itself.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("scope_depth", &self.closure.borrow().depth())
            .finish()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

// Two function values are equal only if they come from the same declaration
// evaluated in the same scope.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && Rc::ptr_eq(&self.body, &other.body)
            && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

// Callbacks can't be compared, so native functions compare by name
impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::NativeFunction(_) => "native-function",
        }
    }

    /// Converts the value into a plain nested record.
    pub fn to_record(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => {
                let mut record = serializer.serialize_struct("Value", 1)?;
                record.serialize_field("type", self.type_name())?;
                record.end()
            }
            Value::Boolean(b) => {
                let mut record = serializer.serialize_struct("Value", 2)?;
                record.serialize_field("type", self.type_name())?;
                record.serialize_field("value", b)?;
                record.end()
            }
            Value::Number(n) => {
                let mut record = serializer.serialize_struct("Value", 2)?;
                record.serialize_field("type", self.type_name())?;
                record.serialize_field("value", n)?;
                record.end()
            }
            Value::Object(properties) => {
                let sorted: BTreeMap<&String, &Value> = properties.iter().collect();
                let mut record = serializer.serialize_struct("Value", 2)?;
                record.serialize_field("type", self.type_name())?;
                record.serialize_field("properties", &sorted)?;
                record.end()
            }
            Value::Function(function) => {
                let mut record = serializer.serialize_struct("Value", 5)?;
                record.serialize_field("type", self.type_name())?;
                record.serialize_field("name", &function.name)?;
                record.serialize_field("parameters", &function.parameters)?;
                record.serialize_field("body", &*function.body)?;
                record.serialize_field("scope_depth", &function.closure.borrow().depth())?;
                record.end()
            }
            Value::NativeFunction(native) => {
                let mut record = serializer.serialize_struct("Value", 2)?;
                record.serialize_field("type", self.type_name())?;
                record.serialize_field("name", &native.name)?;
                record.end()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Object(properties) => {
                if properties.is_empty() {
                    return write!(f, "{{}}");
                }
                let sorted: BTreeMap<&String, &Value> = properties.iter().collect();
                write!(f, "{{")?;
                let mut first = true;
                for (key, value) in sorted {
                    if !first {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", key, value)?;
                    first = false;
                }
                write!(f, " }}")
            }
            Value::Function(function) => write!(f, "<fn {}>", function.name),
            Value::NativeFunction(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}
