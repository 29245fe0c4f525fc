use thiserror::Error;

use crate::transform::TransformError;

/// Reasons a function definition cannot be turned into a function object.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Duplicate parameter '{parameter}' in function '{function}'")]
    DuplicateParameter { function: String, parameter: String },
    #[error(
        "Parameter '{parameter}' without a default follows a parameter with a default in function '{function}'"
    )]
    NonDefaultAfterDefault { function: String, parameter: String },
    #[error("Default for parameter '{parameter}' in function '{function}' must be a constant")]
    NonConstantDefault { function: String, parameter: String },
    #[error("Nested function definitions are not supported (in function '{function}')")]
    NestedFunctionDefinition { function: String },
    #[error("Statement without a source location in function '{function}'")]
    MissingLocation { function: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Unknown attribute '{attribute}' for type {type_name}")]
    UnknownAttribute {
        attribute: String,
        type_name: String,
    },
    #[error("Object of type {type_name} is not callable")]
    ObjectNotCallable { type_name: String },
    #[error("Function '{name}' expected at least {expected} arguments, got {found}")]
    TooFewArguments {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Function '{name}' expected at most {expected} arguments, got {found}")]
    TooManyArguments {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Unsupported operand types for {operation}: '{left}' and '{right}'")]
    UnsupportedOperands {
        operation: String,
        left: String,
        right: String,
    },
    #[error("Bad operand type for unary {operation}: '{type_name}'")]
    UnsupportedOperand {
        operation: String,
        type_name: String,
    },
    #[error(
        "Invalid argument type for operation '{operation}': '{argument}' expected {expected}, got {got}"
    )]
    InvalidArgumentType {
        operation: String,
        argument: String,
        expected: String,
        got: String,
    },
    #[error("Integer division or modulo by zero")]
    DivisionByZero,
    #[error("Integer overflow in {operation}")]
    IntegerOverflow { operation: String },
    #[error("List index out of range: index {index}, len {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Object of type {type_name} is not iterable")]
    NotIterable { type_name: String },
    #[error("Result of {operation} exceeds the maximum sequence length")]
    SequenceTooLarge { operation: String },
    #[error("Maximum recursion depth of {limit} exceeded")]
    RecursionLimit { limit: usize },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl RuntimeError {
    pub(crate) fn expect_function_arity(
        name: &str,
        expected: usize,
        found: usize,
    ) -> Result<(), RuntimeError> {
        if found < expected {
            return Err(RuntimeError::TooFewArguments {
                name: name.to_string(),
                expected,
                found,
            });
        }
        if found > expected {
            return Err(RuntimeError::TooManyArguments {
                name: name.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }
}

/// Runtime error annotated with the line of the statement that raised it.
///
/// The innermost statement wins: once a line is attached, enclosing blocks
/// leave it alone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("line {line}: {error}")]
    At { line: usize, error: RuntimeError },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl InterpreterError {
    pub fn error(&self) -> &RuntimeError {
        match self {
            InterpreterError::At { error, .. } | InterpreterError::Runtime(error) => error,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            InterpreterError::At { line, .. } => Some(*line),
            InterpreterError::Runtime(_) => None,
        }
    }

    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            InterpreterError::Runtime(error) if line > 0 => InterpreterError::At { line, error },
            other => other,
        }
    }
}
