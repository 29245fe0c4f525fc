use crate::ast::{
    AssignTarget, BinaryOperator, Expression, FunctionDef, Parameter, Program, Statement,
    StatementKind, UnaryOperator,
};
use crate::lexer::tokenize;
use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over a token stream produced by the lexer.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    last_end: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::EOF) {
            let span = tokens.last().map(|token| token.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::EOF, span));
        }
        Self {
            tokens,
            position: 0,
            last_end: 0,
        }
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !matches!(self.kind(), TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.kind() {
            TokenKind::At => self.parse_decorated(),
            TokenKind::Def => {
                let start = self.current().span;
                self.parse_function_def(start, Vec::new())
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Indent => Err(ParseError::UnexpectedIndent {
                line: self.current().span.line,
            }),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_simple_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current().span;
        let kind = match self.kind() {
            TokenKind::Pass => {
                self.advance();
                StatementKind::Pass
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                StatementKind::Return(value)
            }
            _ => {
                let expr = self.parse_expression()?;
                if matches!(self.kind(), TokenKind::Equal) {
                    let target = assignment_target(expr, start)?;
                    self.advance();
                    let value = self.parse_expression()?;
                    StatementKind::Assign { target, value }
                } else {
                    StatementKind::Expr(expr)
                }
            }
        };
        let span = self.span_from(start);
        self.expect_statement_end()?;
        Ok(Statement::new(kind, span))
    }

    fn parse_decorated(&mut self) -> ParseResult<Statement> {
        let start = self.current().span;
        let mut decorators = Vec::new();
        while matches!(self.kind(), TokenKind::At) {
            self.advance();
            decorators.push(self.parse_expression()?);
            self.expect(TokenKind::Newline, "newline")?;
            self.consume_newlines();
        }
        if !matches!(self.kind(), TokenKind::Def) {
            return Err(ParseError::DecoratorWithoutDefinition { line: start.line });
        }
        self.parse_function_def(start, decorators)
    }

    fn parse_function_def(
        &mut self,
        start: Span,
        decorators: Vec<Expression>,
    ) -> ParseResult<Statement> {
        self.expect(TokenKind::Def, "def")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "(")?;
        let params = self.parse_parameters()?;
        self.expect(TokenKind::RParen, ")")?;
        let returns = if matches!(self.kind(), TokenKind::Arrow) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Colon, ":")?;
        let body = self.parse_suite()?;

        Ok(Statement::new(
            StatementKind::FunctionDef(FunctionDef {
                name,
                params,
                returns,
                decorators,
                body,
            }),
            self.span_from(start),
        ))
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<Parameter>> {
        let mut params = Vec::new();
        while !matches!(self.kind(), TokenKind::RParen) {
            let name = self.expect_identifier()?;
            let annotation = if matches!(self.kind(), TokenKind::Colon) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            let default = if matches!(self.kind(), TokenKind::Equal) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Parameter {
                name,
                annotation,
                default,
            });
            if matches!(self.kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let start = self.current().span;
        self.advance(); // `if` or `elif`
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, ":")?;
        let then_body = self.parse_suite()?;

        let else_body = match self.next_significant_kind() {
            TokenKind::Elif => {
                self.consume_newlines();
                vec![self.parse_if()?]
            }
            TokenKind::Else => {
                self.consume_newlines();
                self.advance();
                self.expect(TokenKind::Colon, ":")?;
                self.parse_suite()?
            }
            _ => Vec::new(),
        };

        Ok(Statement::new(
            StatementKind::If {
                condition,
                then_body,
                else_body,
            },
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let start = self.current().span;
        self.expect(TokenKind::While, "while")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, ":")?;
        let body = self.parse_suite()?;
        Ok(Statement::new(
            StatementKind::While { condition, body },
            self.span_from(start),
        ))
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        let start = self.current().span;
        self.expect(TokenKind::For, "for")?;
        let target = self.expect_identifier()?;
        self.expect(TokenKind::In, "in")?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::Colon, ":")?;
        let body = self.parse_suite()?;
        Ok(Statement::new(
            StatementKind::For {
                target,
                iterable,
                body,
            },
            self.span_from(start),
        ))
    }

    /// Indented block, or a single simple statement on the header line.
    fn parse_suite(&mut self) -> ParseResult<Vec<Statement>> {
        if !matches!(self.kind(), TokenKind::Newline) {
            return Ok(vec![self.parse_simple_statement()?]);
        }
        self.consume_newlines();
        self.expect(TokenKind::Indent, "indent")?;

        let mut body = Vec::new();
        while !matches!(self.kind(), TokenKind::Dedent | TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Dedent, "dedent")?;
        Ok(body)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        if matches!(self.kind(), TokenKind::Not) {
            self.advance();
            let operand = self.parse_expression()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let left = self.parse_additive()?;
        let op = match self.kind() {
            TokenKind::Less => BinaryOperator::LessThan,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::GreaterThan,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::NotEqual => BinaryOperator::NotEqual,
            TokenKind::Is => BinaryOperator::Is,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::DoubleSlash => BinaryOperator::FloorDiv,
                TokenKind::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if matches!(self.kind(), TokenKind::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_comma_separated(TokenKind::RParen)?;
                    self.expect(TokenKind::RParen, ")")?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "]")?;
                    expr = Expression::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    expr = Expression::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let expr = match self.kind() {
            TokenKind::Integer(value) => Expression::Integer(value),
            TokenKind::String(value) => Expression::String(value.to_string()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::None => Expression::None,
            TokenKind::Identifier(name) => Expression::Identifier(name.to_string()),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, ")")?;
                return Ok(expr);
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_comma_separated(TokenKind::RBracket)?;
                self.expect(TokenKind::RBracket, "]")?;
                return Ok(Expression::List(elements));
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_comma_separated(&mut self, closing: TokenKind<'a>) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        while self.kind() != closing {
            items.push(self.parse_expression()?);
            if matches!(self.kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.kind(), TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn next_significant_kind(&self) -> TokenKind<'a> {
        self.tokens[self.position..]
            .iter()
            .map(|token| token.kind)
            .find(|kind| !matches!(kind, TokenKind::Newline))
            .unwrap_or(TokenKind::EOF)
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::EOF
        )
    }

    fn expect_statement_end(&mut self) -> ParseResult<()> {
        match self.kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::EOF => Ok(()),
            _ => Err(self.error("newline")),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.kind() {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, expected: &str) -> ParseResult<Token<'a>> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.current().clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        if !token.kind.is_structural() {
            self.last_end = token.span.end;
        }
        token
    }

    fn current(&self) -> &Token<'a> {
        &self.tokens[self.position]
    }

    fn kind(&self) -> TokenKind<'a> {
        self.current().kind
    }

    /// Span from `start` through the last consumed source token.
    fn span_from(&self, start: Span) -> Span {
        Span {
            start: start.start,
            end: self.last_end.max(start.end),
            line: start.line,
            column: start.column,
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.describe(),
            line: token.span.line,
            column: token.span.column,
        }
    }
}

fn assignment_target(expr: Expression, start: Span) -> ParseResult<AssignTarget> {
    match expr {
        Expression::Identifier(name) => Ok(AssignTarget::Name(name)),
        Expression::Index { object, index } => match *object {
            Expression::Identifier(name) => Ok(AssignTarget::Index {
                name,
                index: *index,
            }),
            _ => Err(ParseError::InvalidAssignmentTarget {
                line: start.line,
                column: start.column,
            }),
        },
        _ => Err(ParseError::InvalidAssignmentTarget {
            line: start.line,
            column: start.column,
        }),
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}

pub fn parse(input: &str) -> ParseResult<Program> {
    let tokens = tokenize(input)?;
    parse_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexError;
    use indoc::indoc;

    fn without_spans(mut statements: Vec<Statement>) -> Vec<Statement> {
        fn clear(statement: &mut Statement) {
            statement.span = Span::default();
            for block in statement.blocks_mut() {
                block.iter_mut().for_each(clear);
            }
        }
        statements.iter_mut().for_each(clear);
        statements
    }

    fn stmt(kind: StatementKind) -> Statement {
        Statement::synthesized(kind)
    }

    fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::Call {
            callee: Box::new(identifier(name)),
            args,
        }
    }

    #[test]
    fn parses_simple_program() {
        let input = indoc! {"
            def fn():
                n = 4 + 4
                print(n)
            fn()
        "};
        let program = parse(input).expect("parse failed");

        let expected = vec![
            stmt(StatementKind::FunctionDef(FunctionDef {
                name: "fn".to_string(),
                params: vec![],
                returns: None,
                decorators: vec![],
                body: vec![
                    stmt(StatementKind::Assign {
                        target: AssignTarget::Name("n".to_string()),
                        value: Expression::BinaryOp {
                            left: Box::new(Expression::Integer(4)),
                            op: BinaryOperator::Add,
                            right: Box::new(Expression::Integer(4)),
                        },
                    }),
                    stmt(StatementKind::Expr(call("print", vec![identifier("n")]))),
                ],
            })),
            stmt(StatementKind::Expr(call("fn", vec![]))),
        ];

        assert_eq!(without_spans(program.statements), expected);
    }

    #[test]
    fn decorated_definition_span_covers_decorators_and_body() {
        let input = indoc! {"
            x = 0

            @autoreturn
            def f(a: int, b=2) -> int:
                \"\"\"Adds.\"\"\"
                a + b
            y = 1
        "};
        let program = parse(input).expect("parse failed");
        let statement = &program.statements[1];
        assert_eq!(statement.span.line, 3);
        assert_eq!(statement.span.column, 0);
        assert_eq!(&input[statement.span.start..statement.span.end], {
            "@autoreturn\ndef f(a: int, b=2) -> int:\n    \"\"\"Adds.\"\"\"\n    a + b"
        });

        let StatementKind::FunctionDef(def) = &statement.kind else {
            panic!("expected function definition");
        };
        assert!(def.has_decorator("autoreturn"));
        assert_eq!(def.docstring(), Some("Adds."));
        assert_eq!(def.returns, Some(identifier("int")));
        assert_eq!(
            def.params,
            vec![
                Parameter {
                    name: "a".to_string(),
                    annotation: Some(identifier("int")),
                    default: None,
                },
                Parameter {
                    name: "b".to_string(),
                    annotation: None,
                    default: Some(Expression::Integer(2)),
                },
            ]
        );
        assert_eq!(def.body[1].span.line, 6);
        assert_eq!(def.body[1].span.column, 4);
    }

    #[test]
    fn desugars_elif_into_nested_if() {
        let input = indoc! {"
            if a:
                1
            elif b:
                2

            else:
                3
        "};
        let program = parse(input).expect("parse failed");
        let expected = vec![stmt(StatementKind::If {
            condition: identifier("a"),
            then_body: vec![stmt(StatementKind::Expr(Expression::Integer(1)))],
            else_body: vec![stmt(StatementKind::If {
                condition: identifier("b"),
                then_body: vec![stmt(StatementKind::Expr(Expression::Integer(2)))],
                else_body: vec![stmt(StatementKind::Expr(Expression::Integer(3)))],
            })],
        })];
        assert_eq!(without_spans(program.statements), expected);
    }

    #[test]
    fn parses_single_line_suites() {
        let program = parse("def f(): 1\nwhile x: pass\n").expect("parse failed");
        let expected = vec![
            stmt(StatementKind::FunctionDef(FunctionDef {
                name: "f".to_string(),
                params: vec![],
                returns: None,
                decorators: vec![],
                body: vec![stmt(StatementKind::Expr(Expression::Integer(1)))],
            })),
            stmt(StatementKind::While {
                condition: identifier("x"),
                body: vec![stmt(StatementKind::Pass)],
            }),
        ];
        assert_eq!(without_spans(program.statements), expected);
    }

    #[test]
    fn respects_operator_precedence() {
        let program = parse("not 1 + 2 * -3 < 10\n").expect("parse failed");
        let expected = Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(Expression::BinaryOp {
                left: Box::new(Expression::BinaryOp {
                    left: Box::new(Expression::Integer(1)),
                    op: BinaryOperator::Add,
                    right: Box::new(Expression::BinaryOp {
                        left: Box::new(Expression::Integer(2)),
                        op: BinaryOperator::Mul,
                        right: Box::new(Expression::UnaryOp {
                            op: UnaryOperator::Neg,
                            operand: Box::new(Expression::Integer(3)),
                        }),
                    }),
                }),
                op: BinaryOperator::LessThan,
                right: Box::new(Expression::Integer(10)),
            }),
        };
        assert_eq!(
            without_spans(program.statements),
            vec![stmt(StatementKind::Expr(expected))]
        );
    }

    #[test]
    fn parses_postfix_chains_and_index_assignment() {
        let program = parse("xs[0] = f(1, 2,).__name__[1]\nreturn\n").expect("parse failed");
        let expected = vec![
            stmt(StatementKind::Assign {
                target: AssignTarget::Index {
                    name: "xs".to_string(),
                    index: Expression::Integer(0),
                },
                value: Expression::Index {
                    object: Box::new(Expression::Attribute {
                        object: Box::new(call(
                            "f",
                            vec![Expression::Integer(1), Expression::Integer(2)],
                        )),
                        name: "__name__".to_string(),
                    }),
                    index: Box::new(Expression::Integer(1)),
                },
            }),
            stmt(StatementKind::Return(None)),
        ];
        assert_eq!(without_spans(program.statements), expected);
    }

    #[test]
    fn errors_on_indented_source() {
        let err = parse("    def f():\n        1\n").expect_err("expected indentation failure");
        assert_eq!(err, ParseError::UnexpectedIndent { line: 1 });
    }

    #[test]
    fn errors_on_invalid_assignment_target() {
        let err = parse("f() = 1\n").expect_err("expected target failure");
        assert_eq!(
            err,
            ParseError::InvalidAssignmentTarget { line: 1, column: 0 }
        );
    }

    #[test]
    fn errors_on_decorator_without_definition() {
        let err = parse("@dec\nx = 1\n").expect_err("expected decorator failure");
        assert_eq!(err, ParseError::DecoratorWithoutDefinition { line: 1 });
    }

    #[test]
    fn errors_on_missing_colon() {
        let err = parse("def f()\n    1\n").expect_err("expected syntax failure");
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: ":".to_string(),
                found: "newline".to_string(),
                line: 1,
                column: 7,
            }
        );
    }

    #[test]
    fn propagates_lex_errors() {
        let err = parse("x = $\n").expect_err("expected lex failure");
        assert!(matches!(
            err,
            ParseError::Lex(LexError::UnexpectedCharacter { character: '$', .. })
        ));
    }
}
