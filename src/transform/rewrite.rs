use crate::ast::{Program, Statement, StatementKind};

/// Outcome of the tail rewrite. Both variants carry the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TailRewrite {
    Rewritten(Program),
    Unchanged(Program),
}

impl TailRewrite {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, TailRewrite::Rewritten(_))
    }

    pub fn into_program(self) -> Program {
        match self {
            TailRewrite::Rewritten(program) | TailRewrite::Unchanged(program) => program,
        }
    }
}

/// Replaces a trailing bare expression with a return of it, keeping its span.
pub fn rewrite_body(body: &mut Vec<Statement>) -> bool {
    match body.pop() {
        Some(Statement {
            kind: StatementKind::Expr(expression),
            span,
        }) => {
            body.push(Statement::new(StatementKind::Return(Some(expression)), span));
            true
        }
        Some(other) => {
            body.push(other);
            false
        }
        None => false,
    }
}

/// Rewrites the first top-level definition of `program`.
///
/// Only that definition is kept and its decorators are dropped: they already
/// ran on the live function.
pub fn rewrite_tail(mut program: Program) -> TailRewrite {
    program.statements.truncate(1);
    let rewritten = match program.statements.first_mut() {
        Some(Statement {
            kind: StatementKind::FunctionDef(def),
            ..
        }) => {
            def.decorators.clear();
            rewrite_body(&mut def.body)
        }
        _ => false,
    };
    if rewritten {
        TailRewrite::Rewritten(program)
    } else {
        TailRewrite::Unchanged(program)
    }
}
