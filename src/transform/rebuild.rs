use std::rc::Rc;

use tracing::trace;

use crate::ast::{Program, Statement, StatementKind};
use crate::interpreter::compile_function;
use crate::runtime::function::FunctionRef;
use crate::source::{Dedented, SourceRef};
use crate::token::Span;

use super::TransformError;

/// Compiles the rewritten definition in the original function's globals and
/// gives the result the original's identity.
pub(super) fn rebuild(
    mut program: Program,
    dedented: &Dedented,
    original: &FunctionRef,
    source: &SourceRef,
) -> Result<FunctionRef, TransformError> {
    fix_locations(&mut program.statements, Span::default(), dedented);

    let name = original.name();
    let (def, span) = program
        .statements
        .iter()
        .find_map(|statement| match &statement.kind {
            StatementKind::FunctionDef(def) if def.name == name => Some((def, statement.span)),
            _ => None,
        })
        .ok_or_else(|| TransformError::Lookup {
            name: name.to_string(),
        })?;
    trace!(function = name, line = span.line, "compiling rewritten definition");

    let function = compile_function(
        def,
        span,
        Rc::clone(original.globals()),
        original.module(),
        Some(SourceRef::new(Rc::clone(source.file()), span)),
    )
    .map_err(|error| TransformError::Compile {
        name: name.to_string(),
        error,
    })?;
    Ok(Rc::new(function.wraps(original)))
}

/// Moves every span onto the original file. Statements without a location
/// take the span of the statement that encloses them.
fn fix_locations(statements: &mut [Statement], parent: Span, dedented: &Dedented) {
    for statement in statements {
        statement.span = if statement.span.is_missing() {
            parent
        } else {
            dedented.to_original(statement.span)
        };
        let span = statement.span;
        for block in statement.blocks_mut() {
            fix_locations(block, span, dedented);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::parser::parse;
    use crate::runtime::error::CompileError;
    use crate::source::{SourceLines, dedent};

    fn dedented(text: &str, first_line: usize, start_offset: usize) -> Dedented {
        dedent(&SourceLines {
            text: text.to_string(),
            first_line,
            start_offset,
        })
    }

    #[test]
    fn synthesized_statements_inherit_enclosing_span() {
        let mapping = dedented("    def f():\n        x = 1\n", 5, 40);
        let mut program = crate::parser::parse(mapping.text()).expect("parse failed");
        let StatementKind::FunctionDef(def) = &mut program.statements[0].kind else {
            panic!("expected function definition");
        };
        def.body.push(Statement::synthesized(StatementKind::Pass));

        fix_locations(&mut program.statements, Span::default(), &mapping);

        let outer = program.statements[0].span;
        assert_eq!(outer.line, 5);
        assert_eq!(outer.column, 4);
        assert_eq!(outer.start, 44);
        let StatementKind::FunctionDef(def) = &program.statements[0].kind else {
            panic!("expected function definition");
        };
        assert_eq!(def.body[0].span.line, 6);
        assert_eq!(def.body[0].span.column, 8);
        assert_eq!(def.body[1].span, outer);
    }

    fn defined(source: &str) -> (FunctionRef, SourceRef, Dedented) {
        let module = Interpreter::new()
            .run_source("main.py", source)
            .expect("run failed");
        let function = module.function("f").expect("f defined");
        let source = function.source().cloned().expect("source recorded");
        let mapping = dedent(&source.lines().expect("lines available"));
        (function, source, mapping)
    }

    #[test]
    fn renamed_definition_is_a_lookup_failure() {
        let (original, source, mapping) = defined("def f(a):\n    a\n");
        let program = parse("def g(a):\n    return a\n").expect("parse failed");

        let error = rebuild(program, &mapping, &original, &source).expect_err("expected lookup");
        assert!(matches!(error, TransformError::Lookup { ref name } if name == "f"));
    }

    #[test]
    fn invalid_definition_is_a_compile_failure() {
        let (original, source, mapping) = defined("def f(a):\n    a\n");
        let program = parse("def f(a, a):\n    return a\n").expect("parse failed");

        let error = rebuild(program, &mapping, &original, &source).expect_err("expected compile");
        assert!(matches!(
            error,
            TransformError::Compile {
                ref name,
                error: CompileError::DuplicateParameter { ref parameter, .. },
            } if name == "f" && parameter == "a"
        ));
    }
}
