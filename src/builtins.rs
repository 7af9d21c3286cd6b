use crate::environment::EnvRef;
use crate::evaluator::EvalResult;
use crate::value::Value;

/// Renders the arguments space-separated on one line.
pub fn format_args(args: &[Value]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `print(a, b, ...)` writes its arguments to stdout and returns null.
pub fn print(args: Vec<Value>, _env: &EnvRef) -> EvalResult<Value> {
    println!("{}", format_args(&args));
    Ok(Value::Null)
}
