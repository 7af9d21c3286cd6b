// Declare modules publicly so they are part of the library interface
pub mod ast;
pub mod builtins;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod source;
pub mod value;

use std::sync::Once;
use thiserror::Error;

pub use ast::{BinaryOperator, Node, NodeKind, PropertyLiteral};
pub use environment::{EnvError, EnvRef, Environment};
pub use evaluator::{EvalError, EvalResult, evaluate};
pub use lexer::{LexerError, LexerErrorKind, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse};
pub use source::Span;
pub use value::{Function, NativeFunction, Value};

/// Any failure from a full parse-and-evaluate pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Parse(err) => err.span(),
            Error::Eval(err) => err.span(),
        }
    }
}

/// Parses `input` and evaluates the resulting program in `env`.
pub fn run(input: &str, env: &EnvRef) -> Result<Value, Error> {
    let program = parse(input)?;
    Ok(evaluate(&program, env)?)
}

static TRACING_INIT: Once = Once::new();

/// Installs a stderr tracing subscriber when `RUST_LOG` is set.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
