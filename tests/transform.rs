use std::rc::Rc;

use anyhow::Result;
use indoc::indoc;

use autoreturn::interpreter::Interpreter;
use autoreturn::parser::ParseError;
use autoreturn::runtime::{FunctionRef, Value};
use autoreturn::{TransformError, transform};
use test_support::init_tracing;

fn define(interpreter: &Interpreter, source: &str, name: &str) -> Result<FunctionRef> {
    let module = interpreter.run_source("module.py", source)?;
    module
        .function(name)
        .ok_or_else(|| anyhow::anyhow!("function {name} not defined"))
}

#[test]
fn transformed_function_returns_what_explicit_return_would() -> Result<()> {
    init_tracing();
    let interpreter = Interpreter::new();
    let implicit = define(
        &interpreter,
        indoc! {"
            def implicit(a, b):
                c = a * b
                c - a
        "},
        "implicit",
    )?;
    let explicit = define(
        &interpreter,
        indoc! {"
            def explicit(a, b):
                c = a * b
                return c - a
        "},
        "explicit",
    )?;

    let transformed = transform(&implicit)?;
    for (a, b) in [(2, 3), (-4, 5), (0, 9)] {
        let args = vec![Value::Integer(a), Value::Integer(b)];
        let left = interpreter.call(&transformed, args.clone())?.value;
        let right = interpreter.call(&explicit, args)?.value;
        assert_eq!(left, right, "a={a}, b={b}");
    }
    Ok(())
}

#[test]
fn print_body_prints_and_returns_none() -> Result<()> {
    let interpreter = Interpreter::new();
    let function = define(&interpreter, "def f():\n    print(\"hi\")\n", "f")?;
    let result = interpreter.call(&transform(&function)?, Vec::new())?;
    assert_eq!(result.value, Value::None);
    assert_eq!(result.output, vec!["hi".to_string()]);
    Ok(())
}

#[test]
fn pass_body_is_left_untouched() -> Result<()> {
    let interpreter = Interpreter::new();
    let function = define(&interpreter, "def f():\n    pass\n", "f")?;
    let transformed = transform(&function)?;
    assert!(Rc::ptr_eq(&transformed, &function));
    assert_eq!(interpreter.call(&transformed, Vec::new())?.value, Value::None);
    Ok(())
}

#[test]
fn metadata_matches_original() -> Result<()> {
    let interpreter = Interpreter::with_module("stats");
    let function = define(
        &interpreter,
        indoc! {r#"
            def mean(values):
                """Arithmetic mean."""
                total = 0
                for value in values:
                    total = total + value
                total // len(values)
        "#},
        "mean",
    )?;
    let transformed = transform(&function)?;

    assert_eq!(transformed.name(), function.name());
    assert_eq!(transformed.qualname(), function.qualname());
    assert_eq!(transformed.module(), "stats");
    assert_eq!(transformed.doc(), Some("Arithmetic mean."));
    assert!(Rc::ptr_eq(
        transformed.wrapped().expect("wrapped reference"),
        &function
    ));

    let values = Value::list(vec![Value::Integer(2), Value::Integer(4), Value::Integer(9)]);
    assert_eq!(
        interpreter.call(&transformed, vec![values])?.value,
        Value::Integer(5)
    );
    Ok(())
}

#[test]
fn applying_twice_behaves_like_applying_once() -> Result<()> {
    let interpreter = Interpreter::new();
    let function = define(&interpreter, "def f(x):\n    x = x + 1\n    x * 10\n", "f")?;
    let once = transform(&function)?;
    let twice = transform(&once)?;
    for x in [0, 7] {
        assert_eq!(
            interpreter.call(&once, vec![Value::Integer(x)])?.value,
            interpreter.call(&twice, vec![Value::Integer(x)])?.value
        );
    }
    Ok(())
}

#[test]
fn parse_failure_of_acquired_source_is_reported() -> Result<()> {
    // A triple-quoted string whose continuation line sits left of the
    // definition makes the dedented definition start with an indent.
    let interpreter = Interpreter::new();
    let function = define(
        &interpreter,
        indoc! {r#"
            if True:
                def f():
                    """first
            last"""
                    1
        "#},
        "f",
    )?;
    let error = transform(&function).expect_err("expected parse failure");
    assert!(matches!(
        error,
        TransformError::Parse(ParseError::UnexpectedIndent { line: 1 })
    ));
    Ok(())
}

#[test]
fn function_defined_without_source_is_rejected() -> Result<()> {
    let program = autoreturn::parser::parse("def f():\n    1\n")?;
    let module = Interpreter::new().run_program(&program)?;
    let function = module.function("f").expect("f defined");
    let error = transform(&function).expect_err("expected missing source");
    assert_eq!(
        error.to_string(),
        "Source unavailable for 'f': function was not defined from source text"
    );
    Ok(())
}
