use crate::ast::{BinaryOperator, Node, NodeKind, PropertyLiteral};
use crate::environment::{EnvError, EnvRef, Environment};
use crate::source::Span;
use crate::value::{Function, Value};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    // Environment failures, tagged with the node that triggered them
    #[error("{error}")]
    Environment {
        #[source]
        error: EnvError,
        span: Span,
    },
    #[error("Division by zero")]
    DivisionByZero(Span),
    #[error("Invalid assignment target: only identifiers can be assigned to")]
    InvalidAssignmentTarget(Span),
    #[error("Function '{name}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("Expected a function, but got a {found}")]
    NotAFunction { found: &'static str, span: Span },
    #[error("Cannot read a property of a {found}")]
    NotAnObject { found: &'static str, span: Span },
    #[error("Property keys must be numbers or booleans, got a {found}")]
    InvalidPropertyKey { found: &'static str, span: Span },
    // Raised by host callbacks
    #[error("{message}")]
    Native { message: String, span: Span },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::Environment { span, .. }
            | EvalError::DivisionByZero(span)
            | EvalError::InvalidAssignmentTarget(span)
            | EvalError::ArityMismatch { span, .. }
            | EvalError::NotAFunction { span, .. }
            | EvalError::NotAnObject { span, .. }
            | EvalError::InvalidPropertyKey { span, .. }
            | EvalError::Native { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

fn env_error(span: Span) -> impl FnOnce(EnvError) -> EvalError {
    move |error| EvalError::Environment { error, span }
}

// --- Evaluate Function ---

/// Evaluates a syntax-tree node within the given environment.
pub fn evaluate(node: &Node, env: &EnvRef) -> EvalResult {
    tracing::trace!(kind = node.kind_name(), span = %node.span, "evaluate");

    match &node.kind {
        NodeKind::Program { body } => evaluate_statements(body, env),
        NodeKind::NumericLiteral { value } => Ok(Value::Number(*value)),
        NodeKind::Identifier { symbol } => {
            env.borrow().lookup(symbol).map_err(env_error(node.span))
        }
        NodeKind::BinaryExpr {
            left,
            right,
            operator,
        } => evaluate_binary(left, right, *operator, env, node.span),
        NodeKind::AssignmentExpr { assignee, value } => evaluate_assignment(assignee, value, env),
        NodeKind::ObjectLiteral { properties } => evaluate_object(properties, env),
        NodeKind::CallExpr { caller, arguments } => {
            evaluate_call(caller, arguments, env, node.span)
        }
        NodeKind::MemberExpr {
            object,
            property,
            computed,
        } => evaluate_member(object, property, *computed, env),
        NodeKind::VariableDecl {
            identifier,
            value,
            constant,
        } => {
            let value = match value {
                Some(expr) => evaluate(expr, env)?,
                None => Value::Null,
            };
            env.borrow_mut()
                .declare(identifier, value, *constant)
                .map_err(env_error(node.span))
        }
        NodeKind::FunctionDecl {
            name,
            parameters,
            body,
        } => {
            let function = Value::Function(Function {
                name: name.clone(),
                parameters: parameters.clone(),
                body: Rc::clone(body),
                // When `env` is a call scope that also binds this function the
                // two keep each other alive. Scopes are never collected.
                closure: Rc::clone(env),
            });
            env.borrow_mut()
                .declare(name, function, true)
                .map_err(env_error(node.span))
        }
    }
}

/// Evaluates statements in order; the last value wins, an empty list is null.
fn evaluate_statements(statements: &[Node], env: &EnvRef) -> EvalResult {
    let mut last_evaluated = Value::Null;
    for statement in statements {
        last_evaluated = evaluate(statement, env)?;
    }
    Ok(last_evaluated)
}

fn evaluate_binary(
    left: &Node,
    right: &Node,
    operator: BinaryOperator,
    env: &EnvRef,
    span: Span,
) -> EvalResult {
    let lhs = evaluate(left, env)?;
    let rhs = evaluate(right, env)?;

    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => evaluate_numeric_binary(l, r, operator, span),
        // No coercion between value types
        _ => Ok(Value::Null),
    }
}

fn evaluate_numeric_binary(
    left: f64,
    right: f64,
    operator: BinaryOperator,
    span: Span,
) -> EvalResult {
    let result = match operator {
        BinaryOperator::Add => left + right,
        BinaryOperator::Subtract => left - right,
        BinaryOperator::Multiply => left * right,
        BinaryOperator::Divide | BinaryOperator::Modulo if right == 0.0 => {
            return Err(EvalError::DivisionByZero(span));
        }
        BinaryOperator::Divide => left / right,
        BinaryOperator::Modulo => left % right,
    };
    Ok(Value::Number(result))
}

fn evaluate_assignment(assignee: &Node, value: &Node, env: &EnvRef) -> EvalResult {
    let NodeKind::Identifier { symbol } = &assignee.kind else {
        return Err(EvalError::InvalidAssignmentTarget(assignee.span));
    };
    let value = evaluate(value, env)?;
    env.borrow_mut()
        .assign(symbol, value)
        .map_err(env_error(assignee.span))
}

fn evaluate_object(properties: &[PropertyLiteral], env: &EnvRef) -> EvalResult {
    let mut object = HashMap::with_capacity(properties.len());
    for property in properties {
        let value = match &property.value {
            Some(expr) => evaluate(expr, env)?,
            // { key } reads the variable `key` from the current scope
            None => env
                .borrow()
                .lookup(&property.key)
                .map_err(env_error(property.span))?,
        };
        object.insert(property.key.clone(), value);
    }
    Ok(Value::Object(object))
}

fn evaluate_call(caller: &Node, arguments: &[Node], env: &EnvRef, span: Span) -> EvalResult {
    let mut evaluated_args = Vec::with_capacity(arguments.len());
    for argument in arguments {
        evaluated_args.push(evaluate(argument, env)?);
    }

    match evaluate(caller, env)? {
        Value::NativeFunction(native) => native.call(evaluated_args, env),
        Value::Function(function) => call_function(&function, evaluated_args, span),
        other => Err(EvalError::NotAFunction {
            found: other.type_name(),
            span: caller.span,
        }),
    }
}

/// Invokes a user-defined function in a fresh scope whose parent is the
/// function's declaring scope.
#[tracing::instrument(level = "debug", skip_all, fields(name = %function.name, args = args.len()))]
pub fn call_function(function: &Function, args: Vec<Value>, span: Span) -> EvalResult {
    if args.len() != function.parameters.len() {
        return Err(EvalError::ArityMismatch {
            name: function.name.clone(),
            expected: function.parameters.len(),
            found: args.len(),
            span,
        });
    }

    let scope = Environment::new_enclosed(&function.closure);
    {
        let mut scope = scope.borrow_mut();
        for (parameter, arg) in function.parameters.iter().zip(args) {
            scope.declare(parameter, arg, false).map_err(env_error(span))?;
        }
    }

    let result = evaluate_statements(&function.body, &scope);
    tracing::debug!(ok = result.is_ok(), "returned");
    result
}

fn evaluate_member(object: &Node, property: &Node, computed: bool, env: &EnvRef) -> EvalResult {
    let target = evaluate(object, env)?;

    let key = if computed {
        property_key(evaluate(property, env)?, property.span)?
    } else {
        match &property.kind {
            NodeKind::Identifier { symbol } => symbol.clone(),
            _ => {
                return Err(EvalError::InvalidPropertyKey {
                    found: property.kind_name(),
                    span: property.span,
                });
            }
        }
    };

    match target {
        // Reading a missing property yields null
        Value::Object(mut properties) => Ok(properties.remove(&key).unwrap_or(Value::Null)),
        other => Err(EvalError::NotAnObject {
            found: other.type_name(),
            span: object.span,
        }),
    }
}

fn property_key(value: Value, span: Span) -> EvalResult<String> {
    match value {
        Value::Number(_) | Value::Boolean(_) => Ok(value.to_string()),
        other => Err(EvalError::InvalidPropertyKey {
            found: other.type_name(),
            span,
        }),
    }
}
