use crate::{EnvError, Error, EvalError, ParseError, Span};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

// Zero-width spans (end of input) still need one column to point at
fn label_range(span: Span) -> Range<usize> {
    if span.start == span.end {
        span.start..span.start + 1
    } else {
        span.to_range()
    }
}

fn build<'a>(
    name: &'a str,
    span: Span,
    message: String,
    label: String,
) -> Report<'a, (&'a str, Range<usize>)> {
    let range = label_range(span);
    Report::build(ReportKind::Error, (name, range.clone()))
        .with_message(message)
        .with_label(Label::new((name, range)).with_message(label))
        .finish()
}

impl EvalError {
    pub fn report<'a>(&self, name: &'a str) -> Report<'a, (&'a str, Range<usize>)> {
        let span = self.span();
        match self {
            EvalError::Environment { error, .. } => match error {
                EnvError::UnresolvedIdentifier(symbol) => build(
                    name,
                    span,
                    format!("Unresolved identifier `{}`", symbol),
                    "This name is not declared in any enclosing scope".to_string(),
                ),
                EnvError::AlreadyDeclared(symbol) => build(
                    name,
                    span,
                    format!("`{}` is already declared", symbol),
                    "Redeclared in the same scope here".to_string(),
                ),
                EnvError::ConstantReassignment(symbol) => build(
                    name,
                    span,
                    format!("Cannot re-assign constant `{}`", symbol),
                    "This assignment targets a constant".to_string(),
                ),
            },
            EvalError::DivisionByZero(_) => build(
                name,
                span,
                "Division by zero".to_string(),
                "The right operand evaluates to 0".to_string(),
            ),
            EvalError::InvalidAssignmentTarget(_) => build(
                name,
                span,
                "Invalid assignment target".to_string(),
                "Only identifiers can be assigned to".to_string(),
            ),
            EvalError::ArityMismatch {
                name: function,
                expected,
                found,
                ..
            } => build(
                name,
                span,
                format!("Wrong number of arguments to `{}`", function),
                format!("Expected {} arguments, found {}", expected, found),
            ),
            EvalError::NotAFunction { found, .. } => build(
                name,
                span,
                format!("Not a function: {}", found),
                "This expression cannot be called".to_string(),
            ),
            EvalError::NotAnObject { found, .. } => build(
                name,
                span,
                format!("Not an object: {}", found),
                "Properties can only be read from objects".to_string(),
            ),
            EvalError::InvalidPropertyKey { found, .. } => build(
                name,
                span,
                "Invalid property key".to_string(),
                format!("Expected a number or boolean key, found {}", found),
            ),
            EvalError::Native { message, .. } => build(
                name,
                span,
                "Native function failed".to_string(),
                message.clone(),
            ),
        }
    }

    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        self.report(name).eprint((name, Source::from(input)))
    }
}

impl ParseError {
    pub fn report<'a>(&self, name: &'a str) -> Report<'a, (&'a str, Range<usize>)> {
        let span = self.span();
        match self {
            ParseError::UnexpectedToken { found, expected } => build(
                name,
                span,
                format!("Unexpected token: {}", found),
                format!("Expected {}", expected),
            ),
            ParseError::UnexpectedEof { expected, .. } => build(
                name,
                span,
                "Unexpected end of input".to_string(),
                format!("Expected {}", expected),
            ),
            ParseError::LexerError(lex_err) => build(
                name,
                span,
                "Lexer Error".to_string(),
                lex_err.error.to_string(),
            ),
            ParseError::ConstWithoutInitializer { name: constant, .. } => build(
                name,
                span,
                format!("Constant `{}` has no value", constant),
                "Constants must be initialised when declared".to_string(),
            ),
            ParseError::InvalidParameter(_) => build(
                name,
                span,
                "Invalid function parameter".to_string(),
                "Parameters must be plain identifiers".to_string(),
            ),
            ParseError::InvalidNumber { text, .. } => build(
                name,
                span,
                "Invalid number literal".to_string(),
                format!("`{}` is not a valid number", text),
            ),
        }
    }

    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        self.report(name).eprint((name, Source::from(input)))
    }
}

impl Error {
    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        match self {
            Error::Parse(err) => err.pretty_print(name, input),
            Error::Eval(err) => err.pretty_print(name, input),
        }
    }
}
