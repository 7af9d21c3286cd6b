use std::collections::HashMap;

use nanoscript::{EnvError, Environment, Error, EvalError, ParseError, Value, parse, run};
use pretty_assertions::assert_eq;

fn eval(input: &str) -> Result<Value, Error> {
    run(input, &Environment::new_global())
}

fn env_error(result: Result<Value, Error>) -> EnvError {
    match result {
        Err(Error::Eval(EvalError::Environment { error, .. })) => error,
        other => panic!("expected an environment error, got {:?}", other),
    }
}

#[test]
fn declares_and_reads_variables() {
    assert_eq!(eval("let x = 10; x + 5;"), Ok(Value::Number(15.0)));
    assert_eq!(eval("let x; x"), Ok(Value::Null));
}

#[test]
fn operator_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Ok(Value::Number(7.0)));
    assert_eq!(eval("(1 + 2) * 3"), Ok(Value::Number(9.0)));
    assert_eq!(eval("10 - 4 - 3"), Ok(Value::Number(3.0)));
    assert_eq!(eval("17 % 5 * 2"), Ok(Value::Number(4.0)));
}

#[test]
fn constants_cannot_be_reassigned() {
    assert_eq!(
        env_error(eval("const c = 1; c = 2;")),
        EnvError::ConstantReassignment("c".to_string())
    );
    assert_eq!(
        env_error(eval("true = 1")),
        EnvError::ConstantReassignment("true".to_string())
    );
}

#[test]
fn redeclaration_in_same_scope_fails() {
    assert_eq!(
        env_error(eval("let a = 1; let a = 2;")),
        EnvError::AlreadyDeclared("a".to_string())
    );
}

#[test]
fn functions_and_calls() {
    assert_eq!(
        eval("fn add(x, y) { x + y } add(2, 3);"),
        Ok(Value::Number(5.0))
    );
    assert_eq!(eval("fn noop() { } noop()"), Ok(Value::Null));
}

#[test]
fn functions_capture_their_declaring_scope() {
    let program = "
        fn counter() {
            let count = 0;
            fn next() { count = count + 1 }
            next
        }
        let tick = counter();
        tick();
        tick();
        tick()
    ";
    assert_eq!(eval(program), Ok(Value::Number(3.0)));
}

#[test]
fn parameters_shadow_outer_names() {
    let program = "let x = 1; fn f(x) { x * 10 } let y = f(4); x + y";
    assert_eq!(eval(program), Ok(Value::Number(41.0)));
}

#[test]
fn object_literals() {
    let expected = Value::Object(HashMap::from([
        ("a".to_string(), Value::Number(1.0)),
        ("b".to_string(), Value::Number(2.0)),
    ]));
    assert_eq!(eval("{ a: 1, b: 2 }"), Ok(expected));

    let shorthand = eval("let a = 7; { a, }").unwrap();
    assert_eq!(shorthand.to_string(), "{ a: 7 }");
}

#[test]
fn member_access() {
    let program = "let p = { x: 3, y: { z: 4 } }; let inner = p.y; p.x + inner.z";
    assert_eq!(eval(program), Ok(Value::Number(7.0)));
    assert_eq!(eval("let p = { x: 3 }; p.missing"), Ok(Value::Null));
    assert!(matches!(
        eval("let n = 1; n.x"),
        Err(Error::Eval(EvalError::NotAnObject { found: "number", .. }))
    ));
}

#[test]
fn unresolved_identifier() {
    assert_eq!(
        env_error(eval("z;")),
        EnvError::UnresolvedIdentifier("z".to_string())
    );
}

#[test]
fn division_by_zero() {
    assert!(matches!(
        eval("10 / 0;"),
        Err(Error::Eval(EvalError::DivisionByZero(_)))
    ));
    assert!(matches!(
        eval("10 % 0;"),
        Err(Error::Eval(EvalError::DivisionByZero(_)))
    ));
}

#[test]
fn mixed_operands_yield_null() {
    assert_eq!(eval("1 + true"), Ok(Value::Null));
    assert_eq!(eval("let o = {}; o * 2"), Ok(Value::Null));
}

#[test]
fn calling_a_non_function() {
    assert!(matches!(
        eval("let five = 5; five()"),
        Err(Error::Eval(EvalError::NotAFunction { found: "number", .. }))
    ));
}

#[test]
fn wrong_argument_count() {
    assert!(matches!(
        eval("fn one(a) { a } one(1, 2)"),
        Err(Error::Eval(EvalError::ArityMismatch {
            expected: 1,
            found: 2,
            ..
        }))
    ));
}

#[test]
fn syntax_errors_are_reported() {
    assert!(matches!(
        eval("let = 4"),
        Err(Error::Parse(ParseError::UnexpectedToken { .. }))
    ));
    assert!(matches!(
        eval("fn f(x"),
        Err(Error::Parse(ParseError::UnexpectedEof { .. }))
    ));
    assert!(matches!(
        eval("const c;"),
        Err(Error::Parse(ParseError::ConstWithoutInitializer { .. }))
    ));
    assert!(matches!(eval("1 $ 2"), Err(Error::Parse(ParseError::LexerError(_)))));
}

#[test]
fn global_scope_is_shared_across_runs() {
    let env = Environment::new_global();
    run("let total = 1;", &env).unwrap();
    run("total = total + 41;", &env).unwrap();
    assert_eq!(run("total", &env), Ok(Value::Number(42.0)));
}

#[test]
fn evaluation_is_deterministic() {
    let program = "fn sq(n) { n * n } let o = { a: sq(3), b: sq(4) }; o";
    let first = eval(program).unwrap();
    let second = eval(program).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), "{ a: 9, b: 16 }");
}

#[test]
fn parsing_is_stable() {
    let program = "let a = 1; fn f(x, y) { x * (y + a) } f(2, 3)";
    let first = parse(program).unwrap();
    let second = parse(program).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_record().unwrap(), second.to_record().unwrap());
}
