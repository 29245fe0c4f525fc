use thiserror::Error;

use crate::parser::ParseError;
use crate::runtime::error::CompileError;

/// Failure of one stage of the transform pipeline. No partial result is
/// produced for any of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Source unavailable for '{name}': {reason}")]
    SourceUnavailable { name: String, reason: String },
    #[error("Failed to parse function source: {0}")]
    Parse(#[from] ParseError),
    #[error("Failed to compile rewritten function '{name}': {error}")]
    Compile {
        name: String,
        #[source]
        error: CompileError,
    },
    #[error("Function '{name}' not found in rebuilt source")]
    Lookup { name: String },
}
