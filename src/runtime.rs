//! Runtime object model shared by the interpreter and the transform pipeline.
//!
//! Values, function objects with their identity metadata, the name-resolution
//! environment and the builtin implementations live here.
pub mod error;
pub(crate) mod execution;
pub mod function;
pub mod value;

pub use error::{CompileError, InterpreterError, RuntimeError};
pub use function::{BoundParameter, FunctionMetadata, FunctionObject, FunctionRef, Globals};
pub use value::Value;
