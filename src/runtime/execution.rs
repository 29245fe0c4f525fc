use rustc_hash::FxHashMap;

use crate::builtins::BuiltinFunction;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::Globals;
use crate::runtime::value::{MAX_SEQUENCE_LEN, Value};
use crate::transform::{self, TransformError};

/// Name-resolution scope used by statement execution.
///
/// Locals shadow globals when present; top-level execution has no locals map.
/// Builtins are consulted last.
pub(crate) struct Environment {
    globals: Globals,
    locals: Option<FxHashMap<String, Value>>,
}

impl Environment {
    pub(crate) fn top_level(globals: Globals) -> Self {
        Self {
            globals,
            locals: None,
        }
    }

    pub(crate) fn for_call(globals: Globals, locals: FxHashMap<String, Value>) -> Self {
        Self {
            globals,
            locals: Some(locals),
        }
    }

    pub(crate) fn globals(&self) -> &Globals {
        &self.globals
    }

    pub(crate) fn load(&self, name: &str) -> Option<Value> {
        if let Some(locals) = &self.locals
            && let Some(value) = locals.get(name)
        {
            return Some(value.clone());
        }
        if let Some(value) = self.globals.borrow().get(name) {
            return Some(value.clone());
        }
        BuiltinFunction::from_name(name).map(Value::BuiltinFunction)
    }

    pub(crate) fn store(&mut self, name: String, value: Value) {
        if let Some(locals) = &mut self.locals {
            locals.insert(name, value);
        } else {
            self.globals.borrow_mut().insert(name, value);
        }
    }

    pub(crate) fn is_top_level(&self) -> bool {
        self.locals.is_none()
    }
}

/// Builtin-call implementation; `print` appends to `output`.
pub(crate) fn call_builtin_with_output(
    builtin: BuiltinFunction,
    args: Vec<Value>,
    output: &mut Vec<String>,
) -> Result<Value, RuntimeError> {
    match builtin {
        BuiltinFunction::Print => {
            let rendered = args.iter().map(Value::to_output).collect::<Vec<_>>();
            output.push(rendered.join(" "));
            Ok(Value::None)
        }
        BuiltinFunction::Len => {
            RuntimeError::expect_function_arity("len", 1, args.len())?;
            args[0].len()
        }
        BuiltinFunction::Range => {
            RuntimeError::expect_function_arity("range", 1, args.len())?;
            let stop = match &args[0] {
                Value::Integer(value) => *value,
                other => {
                    return Err(RuntimeError::InvalidArgumentType {
                        operation: "range".to_string(),
                        argument: "stop".to_string(),
                        expected: "int".to_string(),
                        got: other.type_name().to_string(),
                    });
                }
            };
            if stop > MAX_SEQUENCE_LEN as i64 {
                return Err(RuntimeError::SequenceTooLarge {
                    operation: "range".to_string(),
                });
            }
            Ok(Value::list((0..stop.max(0)).map(Value::Integer).collect()))
        }
        BuiltinFunction::Autoreturn => {
            RuntimeError::expect_function_arity("autoreturn", 1, args.len())?;
            match &args[0] {
                Value::Function(function) => Ok(Value::Function(transform::transform(function)?)),
                Value::BuiltinFunction(builtin) => Err(TransformError::SourceUnavailable {
                    name: builtin.name().to_string(),
                    reason: "built-in functions have no source text".to_string(),
                }
                .into()),
                other => Err(RuntimeError::InvalidArgumentType {
                    operation: "autoreturn".to_string(),
                    argument: "function".to_string(),
                    expected: "function".to_string(),
                    got: other.type_name().to_string(),
                }),
            }
        }
    }
}
