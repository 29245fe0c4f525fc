//! Syntax tree shared by the parser, the tail rewriter, the unparser and the
//! interpreter.
//!
//! Statements carry the span they were parsed from so that rewritten trees
//! keep pointing at the original source lines.

use crate::token::Span;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Integer(i64),
    Identifier(String),
    Boolean(bool),
    String(String),
    None,
    List(Vec<Expression>),
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Attribute {
        object: Box<Expression>,
        name: String,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Neg,
    Not,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,
    NotEqual,
    Is,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Mod => "%",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Is => "is",
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::FloorDiv
                | BinaryOperator::Mod
        )
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// A statement with no location yet; the rebuilder fills it in.
    pub fn synthesized(kind: StatementKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    /// String literal content when this is a bare string expression.
    pub fn docstring(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Expr(Expression::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Nested statement blocks owned by this statement.
    pub fn blocks(&self) -> Vec<&Vec<Statement>> {
        match &self.kind {
            StatementKind::FunctionDef(def) => vec![&def.body],
            StatementKind::If {
                then_body,
                else_body,
                ..
            } => vec![then_body, else_body],
            StatementKind::While { body, .. } | StatementKind::For { body, .. } => vec![body],
            StatementKind::Assign { .. }
            | StatementKind::Return(_)
            | StatementKind::Pass
            | StatementKind::Expr(_) => Vec::new(),
        }
    }

    pub fn blocks_mut(&mut self) -> Vec<&mut Vec<Statement>> {
        match &mut self.kind {
            StatementKind::FunctionDef(def) => vec![&mut def.body],
            StatementKind::If {
                then_body,
                else_body,
                ..
            } => vec![then_body, else_body],
            StatementKind::While { body, .. } | StatementKind::For { body, .. } => vec![body],
            StatementKind::Assign { .. }
            | StatementKind::Return(_)
            | StatementKind::Pass
            | StatementKind::Expr(_) => Vec::new(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum StatementKind {
    FunctionDef(FunctionDef),
    Assign {
        target: AssignTarget,
        value: Expression,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        target: String,
        iterable: Expression,
        body: Vec<Statement>,
    },
    Return(Option<Expression>),
    Pass,
    Expr(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Parameter>,
    pub returns: Option<Expression>,
    pub decorators: Vec<Expression>,
    pub body: Vec<Statement>,
}

impl FunctionDef {
    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators
            .iter()
            .any(|decorator| matches!(decorator, Expression::Identifier(id) if id == name))
    }

    pub fn docstring(&self) -> Option<&str> {
        self.body.first().and_then(Statement::docstring)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<Expression>,
    pub default: Option<Expression>,
}

impl Parameter {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: None,
            default: None,
        }
    }
}

/// Assignment target forms accepted by the parser.
///
/// `Index` stores only a base variable name (`name[index]`), matching the
/// parser's assignment-target restriction.
#[derive(Debug, PartialEq, Clone)]
pub enum AssignTarget {
    Name(String),
    Index { name: String, index: Expression },
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}
