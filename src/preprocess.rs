//! Build-time counterpart of the `autoreturn` decorator.
//!
//! Rewrites a whole module ahead of time: every definition carrying the
//! configured decorator loses it and gets its trailing bare expression turned
//! into a `return`. The result is emitted as source text.

use tracing::debug;

use crate::ast::{Expression, Statement, StatementKind};
use crate::parser;
use crate::transform::{TransformError, rewrite_body};
use crate::unparse::unparse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Decorator name that marks functions to rewrite.
    pub decorator: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            decorator: "autoreturn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSource {
    pub text: String,
    /// Names of the definitions whose body was rewritten, in source order.
    pub rewritten: Vec<String>,
}

pub fn rewrite_source(
    text: &str,
    options: &RewriteOptions,
) -> Result<RewrittenSource, TransformError> {
    let mut program = parser::parse(text)?;
    let mut rewritten = Vec::new();
    rewrite_block(&mut program.statements, options, &mut rewritten);
    debug!(decorator = %options.decorator, count = rewritten.len(), "rewrote module source");
    Ok(RewrittenSource {
        text: unparse(&program),
        rewritten,
    })
}

fn rewrite_block(
    statements: &mut [Statement],
    options: &RewriteOptions,
    rewritten: &mut Vec<String>,
) {
    for statement in statements {
        if let StatementKind::FunctionDef(def) = &mut statement.kind
            && def.has_decorator(&options.decorator)
        {
            def.decorators.retain(|decorator| {
                !matches!(decorator, Expression::Identifier(name) if *name == options.decorator)
            });
            if rewrite_body(&mut def.body) {
                rewritten.push(def.name.clone());
            }
        }
        for block in statement.blocks_mut() {
            rewrite_block(block, options, rewritten);
        }
    }
}
