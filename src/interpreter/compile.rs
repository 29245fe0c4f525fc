use rustc_hash::FxHashSet;

use crate::ast::{Expression, FunctionDef, Statement, StatementKind, UnaryOperator};
use crate::runtime::error::CompileError;
use crate::runtime::function::{BoundParameter, FunctionMetadata, FunctionObject, Globals};
use crate::runtime::value::Value;
use crate::source::SourceRef;
use crate::token::Span;

/// Turns a definition into a function object bound to `globals`.
///
/// Used both by `def` execution and by the transform rebuilder, so every
/// function in the runtime goes through the same validation.
pub fn compile_function(
    def: &FunctionDef,
    span: Span,
    globals: Globals,
    module: &str,
    source: Option<SourceRef>,
) -> Result<FunctionObject, CompileError> {
    check_body(&def.name, &def.body)?;
    let params = bind_parameters(def)?;
    let metadata = FunctionMetadata {
        name: def.name.clone(),
        qualname: def.name.clone(),
        module: module.to_string(),
        doc: def.docstring().map(str::to_string),
        wrapped: None,
    };
    Ok(FunctionObject::new(
        metadata,
        params,
        def.body.clone(),
        span,
        globals,
        source,
    ))
}

fn check_body(function: &str, body: &[Statement]) -> Result<(), CompileError> {
    for statement in body {
        if statement.span.is_missing() {
            return Err(CompileError::MissingLocation {
                function: function.to_string(),
            });
        }
        if let StatementKind::FunctionDef(_) = statement.kind {
            return Err(CompileError::NestedFunctionDefinition {
                function: function.to_string(),
            });
        }
        for block in statement.blocks() {
            check_body(function, block)?;
        }
    }
    Ok(())
}

fn bind_parameters(def: &FunctionDef) -> Result<Vec<BoundParameter>, CompileError> {
    let mut seen = FxHashSet::default();
    let mut saw_default = false;
    let mut params = Vec::with_capacity(def.params.len());
    for param in &def.params {
        if !seen.insert(param.name.as_str()) {
            return Err(CompileError::DuplicateParameter {
                function: def.name.clone(),
                parameter: param.name.clone(),
            });
        }
        let default = match &param.default {
            Some(expression) => {
                saw_default = true;
                Some(constant_value(expression).ok_or_else(|| {
                    CompileError::NonConstantDefault {
                        function: def.name.clone(),
                        parameter: param.name.clone(),
                    }
                })?)
            }
            None if saw_default => {
                return Err(CompileError::NonDefaultAfterDefault {
                    function: def.name.clone(),
                    parameter: param.name.clone(),
                });
            }
            None => None,
        };
        params.push(BoundParameter {
            name: param.name.clone(),
            default,
        });
    }
    Ok(params)
}

fn constant_value(expression: &Expression) -> Option<Value> {
    match expression {
        Expression::Integer(value) => Some(Value::Integer(*value)),
        Expression::String(value) => Some(Value::String(value.clone())),
        Expression::Boolean(value) => Some(Value::Boolean(*value)),
        Expression::None => Some(Value::None),
        Expression::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => match operand.as_ref() {
            Expression::Integer(value) => value.checked_neg().map(Value::Integer),
            _ => None,
        },
        _ => None,
    }
}
