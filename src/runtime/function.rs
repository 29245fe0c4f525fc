use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::Statement;
use crate::runtime::value::Value;
use crate::source::SourceRef;
use crate::token::Span;

/// Module namespace shared by every function defined in it.
pub type Globals = Rc<RefCell<FxHashMap<String, Value>>>;

pub type FunctionRef = Rc<FunctionObject>;

pub fn new_globals() -> Globals {
    Rc::new(RefCell::new(FxHashMap::default()))
}

/// Identity of a function independent of its behavior.
#[derive(Debug, Clone)]
pub struct FunctionMetadata {
    pub name: String,
    pub qualname: String,
    pub module: String,
    pub doc: Option<String>,
    pub wrapped: Option<FunctionRef>,
}

#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub name: String,
    pub default: Option<Value>,
}

/// A user-defined function: compiled parameters, body and the namespace it
/// resolves globals in.
pub struct FunctionObject {
    metadata: FunctionMetadata,
    params: Vec<BoundParameter>,
    body: Vec<Statement>,
    span: Span,
    globals: Globals,
    source: Option<SourceRef>,
}

impl FunctionObject {
    pub(crate) fn new(
        metadata: FunctionMetadata,
        params: Vec<BoundParameter>,
        body: Vec<Statement>,
        span: Span,
        globals: Globals,
        source: Option<SourceRef>,
    ) -> Self {
        Self {
            metadata,
            params,
            body,
            span,
            globals,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn qualname(&self) -> &str {
        &self.metadata.qualname
    }

    pub fn module(&self) -> &str {
        &self.metadata.module
    }

    pub fn doc(&self) -> Option<&str> {
        self.metadata.doc.as_deref()
    }

    pub fn wrapped(&self) -> Option<&FunctionRef> {
        self.metadata.wrapped.as_ref()
    }

    pub fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    pub fn params(&self) -> &[BoundParameter] {
        &self.params
    }

    /// Number of leading parameters without a default.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .take_while(|param| param.default.is_none())
            .count()
    }

    pub fn body(&self) -> &[Statement] {
        &self.body
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    /// Takes over the identity of `original` and records it as the wrapped
    /// function.
    pub fn wraps(mut self, original: &FunctionRef) -> Self {
        self.metadata.name = original.name().to_string();
        self.metadata.qualname = original.qualname().to_string();
        self.metadata.module = original.module().to_string();
        self.metadata.doc = original.metadata.doc.clone();
        self.metadata.wrapped = Some(Rc::clone(original));
        self
    }

    /// Follows the `__wrapped__` chain down to the function that was
    /// defined from source.
    pub fn innermost(function: &FunctionRef) -> FunctionRef {
        let mut current = Rc::clone(function);
        while let Some(inner) = current.wrapped().cloned() {
            current = inner;
        }
        current
    }
}

impl fmt::Debug for FunctionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionObject")
            .field("qualname", &self.metadata.qualname)
            .field("module", &self.metadata.module)
            .field(
                "params",
                &self
                    .params
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("span", &self.span)
            .field("wraps", &self.wrapped().map(|inner| inner.qualname()))
            .finish_non_exhaustive()
    }
}
