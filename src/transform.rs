//! Tail-return transformation of live functions.
//!
//! The pipeline runs once per function: acquire the definition's source,
//! dedent and parse it, rewrite a trailing bare expression into a `return`,
//! then compile the rewritten definition in the original globals. Functions
//! whose body does not end in a bare expression are returned as they are.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::parser;
use crate::runtime::function::{FunctionObject, FunctionRef};
use crate::source::{self, SourceLines, SourceRef};

mod error;
mod rebuild;
mod rewrite;

pub use error::TransformError;
pub use rewrite::{TailRewrite, rewrite_body, rewrite_tail};

pub fn transform(function: &FunctionRef) -> Result<FunctionRef, TransformError> {
    let name = function.name();
    let (source, lines) = acquire(function)?;
    debug!(
        function = name,
        file = source.file().name(),
        line = lines.first_line,
        "source acquired"
    );

    let dedented = source::dedent(&lines);
    trace!(function = name, margin = dedented.margin(), "dedented source");
    let program = parser::parse(dedented.text())?;
    debug!(function = name, "parsed");

    match rewrite_tail(program) {
        TailRewrite::Unchanged(_) => {
            debug!(function = name, "unchanged");
            Ok(Rc::clone(function))
        }
        TailRewrite::Rewritten(program) => {
            debug!(function = name, "rewritten");
            let rebuilt = rebuild::rebuild(program, &dedented, function, &source)?;
            debug!(function = name, "rebuilt");
            Ok(rebuilt)
        }
    }
}

/// Source of the innermost wrapped function, as whole lines.
fn acquire(function: &FunctionRef) -> Result<(SourceRef, SourceLines), TransformError> {
    let unavailable = |reason: &str| TransformError::SourceUnavailable {
        name: function.name().to_string(),
        reason: reason.to_string(),
    };
    let innermost = FunctionObject::innermost(function);
    let source = innermost
        .source()
        .cloned()
        .ok_or_else(|| unavailable("function was not defined from source text"))?;
    let lines = source
        .lines()
        .ok_or_else(|| unavailable("recorded location is outside its source file"))?;
    Ok((source, lines))
}
