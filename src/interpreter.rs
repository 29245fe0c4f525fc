use std::rc::Rc;

use anyhow::Result;

use crate::ast::Program;
use crate::parser;
use crate::runtime::error::{InterpreterError, RuntimeError};
use crate::runtime::execution::Environment;
use crate::runtime::function::{FunctionRef, Globals, new_globals};
use crate::runtime::value::Value;
use crate::source::SourceFile;

mod compile;
mod runtime;

pub use compile::compile_function;
use runtime::{ExecResult, InterpreterRuntime};

/// AST-walking interpreter for the Python subset.
pub struct Interpreter {
    module: String,
}

/// Namespace and printed output left behind by running a module.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub globals: Globals,
    pub output: Vec<String>,
}

#[derive(Debug)]
pub struct CallResult {
    pub value: Value,
    pub output: Vec<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_module("__main__")
    }

    pub fn with_module(name: impl Into<String>) -> Self {
        Self {
            module: name.into(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    /// Parses and runs `text`, registering it as `file` so that the functions
    /// it defines can later be transformed.
    pub fn run_source(&self, file: &str, text: &str) -> Result<Module> {
        let program = parser::parse(text)?;
        let source = Rc::new(SourceFile::new(file, text));
        Ok(self.execute(&program, Some(&source))?)
    }

    /// Runs an already parsed program. Functions defined this way have no
    /// retrievable source.
    pub fn run_program(&self, program: &Program) -> Result<Module, InterpreterError> {
        self.execute(program, None)
    }

    pub fn call(
        &self,
        function: &FunctionRef,
        args: Vec<Value>,
    ) -> Result<CallResult, InterpreterError> {
        let mut runtime = InterpreterRuntime {
            module: &self.module,
            source: None,
            output: Vec::new(),
            depth: 0,
        };
        let value = runtime.call_function(function, args)?;
        Ok(CallResult {
            value,
            output: runtime.output,
        })
    }

    fn execute(
        &self,
        program: &Program,
        source: Option<&Rc<SourceFile>>,
    ) -> Result<Module, InterpreterError> {
        let globals = new_globals();
        globals
            .borrow_mut()
            .insert("__name__".to_string(), Value::string(self.module.as_str()));
        let mut environment = Environment::top_level(Rc::clone(&globals));
        let mut runtime = InterpreterRuntime {
            module: &self.module,
            source,
            output: Vec::new(),
            depth: 0,
        };
        match runtime.exec_block(&program.statements, &mut environment)? {
            ExecResult::Continue => {}
            ExecResult::Return(_) => return Err(RuntimeError::ReturnOutsideFunction.into()),
        }
        Ok(Module {
            name: self.module.clone(),
            globals,
            output: runtime.output,
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    pub fn function(&self, name: &str) -> Option<FunctionRef> {
        self.get(name)?.as_function().cloned()
    }

    pub fn output(&self) -> String {
        self.output.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::CompileError;
    use crate::transform::TransformError;
    use indoc::indoc;

    fn run(source: &str) -> Result<Module> {
        Interpreter::new().run_source("main.py", source)
    }

    fn expect_interpreter_error(error: anyhow::Error) -> InterpreterError {
        error
            .downcast::<InterpreterError>()
            .expect("expected InterpreterError")
    }

    #[test]
    fn evaluates_assignment_and_call() {
        let module = run("n = 1 + 2\nprint(n)\n").expect("run failed");
        assert_eq!(module.output(), "3");
        assert_eq!(module.get("n"), Some(Value::Integer(3)));
        assert_eq!(module.get("__name__"), Some(Value::string("__main__")));
    }

    #[test]
    fn executes_if_elif_else_branches() {
        let module = run(indoc! {r#"
            x = 2
            if x == 1:
                print("one")
            elif x == 2:
                print("two")
            else:
                print("other")
        "#})
        .expect("run failed");
        assert_eq!(module.output(), "two");
    }

    #[test]
    fn executes_loops() {
        let module = run(indoc! {"
            n = 0
            while n < 3:
                n = n + 1
            total = 0
            for i in range(4):
                total = total + i
            print(n, total)
        "})
        .expect("run failed");
        assert_eq!(module.output(), "3 6");
    }

    #[test]
    fn returns_from_function_without_executing_remaining_body() {
        let module = run(indoc! {r#"
            def f():
                return 7
                print("unreachable")
            print(f())
        "#})
        .expect("run failed");
        assert_eq!(module.output(), "7");
    }

    #[test]
    fn function_without_return_yields_none() {
        let module = run(indoc! {"
            def f():
                x = 1
                x + 1
            print(f())
        "})
        .expect("run failed");
        assert_eq!(module.output(), "None");
    }

    #[test]
    fn deep_recursion_within_limit_runs() {
        let module = run(indoc! {"
            def depth(n):
                if n == 0:
                    return 0
                return depth(n - 1) + 1
            print(depth(900))
        "})
        .expect("run failed");
        assert_eq!(module.output(), "900");
    }

    #[test]
    fn unbounded_recursion_reports_limit() {
        let error = expect_interpreter_error(
            run(indoc! {"
                def forever(n):
                    return forever(n + 1)
                forever(0)
            "})
            .expect_err("expected recursion limit"),
        );
        assert_eq!(error.line(), Some(2));
        assert_eq!(
            error.error(),
            &RuntimeError::RecursionLimit {
                limit: super::runtime::MAX_CALL_DEPTH
            }
        );
    }

    #[test]
    fn defaults_fill_missing_arguments() {
        let module = run(indoc! {"
            def add(a, b=10):
                return a + b
            print(add(1), add(1, 2))
        "})
        .expect("run failed");
        assert_eq!(module.output(), "11 3");
    }

    #[test]
    fn function_locals_do_not_leak_into_globals() {
        let error = expect_interpreter_error(
            run(indoc! {"
                def f():
                    x = 42
                f()
                print(x)
            "})
            .expect_err("expected undefined variable"),
        );
        assert_eq!(
            error,
            InterpreterError::At {
                line: 4,
                error: RuntimeError::UndefinedVariable {
                    name: "x".to_string()
                },
            }
        );
    }

    #[test]
    fn innermost_statement_line_is_reported() {
        let error = expect_interpreter_error(
            run(indoc! {"
                def f():
                    y = 1
                    return missing
                f()
            "})
            .expect_err("expected undefined variable"),
        );
        assert_eq!(error.line(), Some(3));
        assert_eq!(error.to_string(), "line 3: Undefined variable 'missing'");
    }

    #[test]
    fn errors_on_return_outside_function() {
        let error =
            expect_interpreter_error(run("return 1\n").expect_err("expected return error"));
        assert_eq!(error.error(), &RuntimeError::ReturnOutsideFunction);
    }

    #[test]
    fn errors_on_wrong_arity() {
        let error = expect_interpreter_error(
            run("def f(a):\n    return a\nf(1, 2)\n").expect_err("expected arity error"),
        );
        assert_eq!(
            error.error(),
            &RuntimeError::TooManyArguments {
                name: "f".to_string(),
                expected: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn errors_on_invalid_call_target() {
        let error =
            expect_interpreter_error(run("x = 1\nx()\n").expect_err("expected call error"));
        assert_eq!(
            error.error(),
            &RuntimeError::ObjectNotCallable {
                type_name: "int".to_string()
            }
        );
    }

    #[test]
    fn nested_definitions_fail_at_definition_time() {
        let error = expect_interpreter_error(
            run(indoc! {"
                def outer():
                    def inner():
                        pass
            "})
            .expect_err("expected compile error"),
        );
        assert_eq!(
            error.error(),
            &RuntimeError::Compile(CompileError::NestedFunctionDefinition {
                function: "outer".to_string()
            })
        );
    }

    #[test]
    fn local_names_shadow_builtins() {
        let module = run(indoc! {"
            def f(print):
                return print
            print(f(5))
        "})
        .expect("run failed");
        assert_eq!(module.output(), "5");
    }

    #[test]
    fn decorators_apply_bottom_up() {
        let module = run(indoc! {"
            def first(fn):
                print(\"first\")
                return fn
            def second(fn):
                print(\"second\")
                return fn
            @first
            @second
            def f():
                return 1
            print(f())
        "})
        .expect("run failed");
        assert_eq!(module.output(), "second\nfirst\n1");
    }

    #[test]
    fn functions_expose_identity_attributes() {
        let module = Interpreter::with_module("shapes")
            .run_source(
                "shapes.py",
                indoc! {r#"
                    def area(w, h):
                        "Rectangle area."
                        return w * h
                    print(area.__name__, area.__qualname__, area.__module__, area.__doc__)
                "#},
            )
            .expect("run failed");
        assert_eq!(module.output(), "area area shapes Rectangle area.");
    }

    #[test]
    fn programs_without_source_cannot_be_transformed() {
        let program = parser::parse(indoc! {"
            def f():
                1
            g = autoreturn(f)
        "})
        .expect("parse failed");
        let error = Interpreter::new()
            .run_program(&program)
            .expect_err("expected transform error");
        assert!(matches!(
            error.error(),
            RuntimeError::Transform(TransformError::SourceUnavailable { name, .. }) if name == "f"
        ));
    }

    #[test]
    fn call_collects_output_separately() {
        let interpreter = Interpreter::new();
        let module = interpreter
            .run_source("main.py", "def f(x):\n    print(x)\n    return x * 2\n")
            .expect("run failed");
        let function = module.function("f").expect("f defined");
        let result = interpreter
            .call(&function, vec![Value::Integer(21)])
            .expect("call failed");
        assert_eq!(result.value, Value::Integer(42));
        assert_eq!(result.output, vec!["21".to_string()]);
    }
}
