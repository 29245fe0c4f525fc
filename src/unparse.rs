//! Source emitter for syntax trees.
//!
//! Output uses four-space indentation and only the parentheses the parser
//! needs to rebuild the same tree. Comments are not part of the tree and are
//! therefore not reproduced.

use crate::ast::{
    AssignTarget, BinaryOperator, Expression, FunctionDef, Parameter, Program, Statement,
    StatementKind, UnaryOperator,
};

const PREC_NOT: u8 = 1;
const PREC_COMPARISON: u8 = 2;
const PREC_ADDITIVE: u8 = 3;
const PREC_MULTIPLICATIVE: u8 = 4;
const PREC_UNARY: u8 = 5;
const PREC_POSTFIX: u8 = 6;

pub fn unparse(program: &Program) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_block(&program.statements);
    emitter.output
}

pub fn unparse_expression(expression: &Expression) -> String {
    expression_to_string(expression, 0)
}

struct Emitter {
    output: String,
    indent_level: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
        }
    }

    fn write_indented(&mut self, line: &str) {
        for _ in 0..self.indent_level {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_suite(&mut self, body: &[Statement]) {
        self.indent_level += 1;
        if body.is_empty() {
            self.write_indented("pass");
        } else {
            self.emit_block(body);
        }
        self.indent_level -= 1;
    }

    fn emit_block(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.emit_statement(statement);
        }
    }

    fn emit_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::FunctionDef(def) => self.emit_function_def(def),
            StatementKind::Assign { target, value } => {
                let target = match target {
                    AssignTarget::Name(name) => name.clone(),
                    AssignTarget::Index { name, index } => {
                        format!("{name}[{}]", unparse_expression(index))
                    }
                };
                self.write_indented(&format!("{target} = {}", unparse_expression(value)));
            }
            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => self.emit_if("if", condition, then_body, else_body),
            StatementKind::While { condition, body } => {
                self.write_indented(&format!("while {}:", unparse_expression(condition)));
                self.emit_suite(body);
            }
            StatementKind::For {
                target,
                iterable,
                body,
            } => {
                self.write_indented(&format!(
                    "for {target} in {}:",
                    unparse_expression(iterable)
                ));
                self.emit_suite(body);
            }
            StatementKind::Return(Some(value)) => {
                self.write_indented(&format!("return {}", unparse_expression(value)));
            }
            StatementKind::Return(None) => self.write_indented("return"),
            StatementKind::Pass => self.write_indented("pass"),
            StatementKind::Expr(expression) => {
                self.write_indented(&unparse_expression(expression));
            }
        }
    }

    fn emit_if(
        &mut self,
        keyword: &str,
        condition: &Expression,
        then_body: &[Statement],
        else_body: &[Statement],
    ) {
        self.write_indented(&format!("{keyword} {}:", unparse_expression(condition)));
        self.emit_suite(then_body);
        match else_body {
            [] => {}
            [
                Statement {
                    kind:
                        StatementKind::If {
                            condition,
                            then_body,
                            else_body,
                        },
                    ..
                },
            ] => self.emit_if("elif", condition, then_body, else_body),
            _ => {
                self.write_indented("else:");
                self.emit_suite(else_body);
            }
        }
    }

    fn emit_function_def(&mut self, def: &FunctionDef) {
        for decorator in &def.decorators {
            self.write_indented(&format!("@{}", unparse_expression(decorator)));
        }
        let params = def
            .params
            .iter()
            .map(parameter_to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let returns = def
            .returns
            .as_ref()
            .map(|returns| format!(" -> {}", unparse_expression(returns)))
            .unwrap_or_default();
        self.write_indented(&format!("def {}({params}){returns}:", def.name));
        self.emit_suite(&def.body);
    }
}

fn parameter_to_string(param: &Parameter) -> String {
    match (&param.annotation, &param.default) {
        (None, None) => param.name.clone(),
        (None, Some(default)) => format!("{}={}", param.name, unparse_expression(default)),
        (Some(annotation), None) => {
            format!("{}: {}", param.name, unparse_expression(annotation))
        }
        (Some(annotation), Some(default)) => format!(
            "{}: {} = {}",
            param.name,
            unparse_expression(annotation),
            unparse_expression(default)
        ),
    }
}

fn binary_precedence(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Add | BinaryOperator::Sub => PREC_ADDITIVE,
        BinaryOperator::Mul | BinaryOperator::FloorDiv | BinaryOperator::Mod => {
            PREC_MULTIPLICATIVE
        }
        _ => PREC_COMPARISON,
    }
}

fn expression_to_string(expression: &Expression, min_precedence: u8) -> String {
    let (rendered, precedence) = match expression {
        Expression::Integer(value) if *value < 0 => (value.to_string(), PREC_UNARY),
        Expression::Integer(value) => (value.to_string(), PREC_POSTFIX),
        Expression::Identifier(name) => (name.clone(), PREC_POSTFIX),
        Expression::Boolean(true) => ("True".to_string(), PREC_POSTFIX),
        Expression::Boolean(false) => ("False".to_string(), PREC_POSTFIX),
        Expression::String(value) => string_literal(value),
        Expression::None => ("None".to_string(), PREC_POSTFIX),
        Expression::List(elements) => (format!("[{}]", join(elements)), PREC_POSTFIX),
        Expression::Index { object, index } => (
            format!(
                "{}[{}]",
                expression_to_string(object, PREC_POSTFIX),
                unparse_expression(index)
            ),
            PREC_POSTFIX,
        ),
        Expression::Attribute { object, name } => (
            format!("{}.{name}", expression_to_string(object, PREC_POSTFIX)),
            PREC_POSTFIX,
        ),
        Expression::Call { callee, args } => (
            format!(
                "{}({})",
                expression_to_string(callee, PREC_POSTFIX),
                join(args)
            ),
            PREC_POSTFIX,
        ),
        Expression::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => (
            format!("-{}", expression_to_string(operand, PREC_UNARY)),
            PREC_UNARY,
        ),
        Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand,
        } => (
            format!("not {}", expression_to_string(operand, PREC_NOT)),
            PREC_NOT,
        ),
        Expression::BinaryOp { left, op, right } => {
            let precedence = binary_precedence(*op);
            // Comparisons do not chain, so neither side may be a comparison.
            let left_precedence = if op.is_comparison() {
                precedence + 1
            } else {
                precedence
            };
            (
                format!(
                    "{} {} {}",
                    expression_to_string(left, left_precedence),
                    op.symbol(),
                    expression_to_string(right, precedence + 1)
                ),
                precedence,
            )
        }
    };
    if precedence < min_precedence {
        format!("({rendered})")
    } else {
        rendered
    }
}

fn join(expressions: &[Expression]) -> String {
    expressions
        .iter()
        .map(unparse_expression)
        .collect::<Vec<_>>()
        .join(", ")
}

/// String content is raw, so the first delimiter under which the content
/// lexes back unchanged is used.
fn quote_literal(value: &str) -> Option<String> {
    ["\"", "'", "\"\"\"", "'''"]
        .into_iter()
        .find(|delimiter| closes_at_end(value, delimiter))
        .map(|delimiter| format!("{delimiter}{value}{delimiter}"))
}

/// Content no single delimiter can hold is split into concatenated literals.
fn string_literal(value: &str) -> (String, u8) {
    if let Some(literal) = quote_literal(value) {
        return (literal, PREC_POSTFIX);
    }
    let mut pieces = Vec::new();
    let (mut start, mut end) = (0, 0);
    for (idx, c) in value.char_indices() {
        let next = idx + c.len_utf8();
        if quote_literal(&value[start..next]).is_none() {
            pieces.push(&value[start..end]);
            start = end;
        }
        end = next;
    }
    pieces.push(&value[start..]);
    let rendered = pieces
        .into_iter()
        .filter_map(quote_literal)
        .collect::<Vec<_>>()
        .join(" + ");
    (rendered, PREC_ADDITIVE)
}

fn closes_at_end(value: &str, delimiter: &str) -> bool {
    if delimiter.len() == 3 {
        return format!("{value}{delimiter}").find(delimiter) == Some(value.len());
    }
    if value.starts_with(&delimiter.repeat(2)) {
        return false;
    }
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\n' => return false,
            '\\' => match chars.next() {
                None | Some('\n') => return false,
                Some(_) => {}
            },
            c if delimiter.starts_with(c) => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::parser::parse;
    use crate::runtime::Value;
    use indoc::indoc;

    fn roundtrip(source: &str) -> String {
        unparse(&parse(source).expect("parse failed"))
    }

    #[test]
    fn reproduces_canonical_source() {
        let source = indoc! {r#"
            @autoreturn
            def f(a, b: int = 2) -> int:
                x = [a, b]
                x[0] = a + 1
                while x[0] < 10:
                    x[0] = x[0] * 2
                for item in x:
                    print(item, "done")
                return x
            f(1)
        "#};
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn resugars_elif_chains() {
        let source = indoc! {"
            if a:
                pass
            elif b:
                pass
            else:
                x = 1
        "};
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn normalizes_single_line_suites_and_comments() {
        let source = "def f(): 1  # one\n";
        assert_eq!(roundtrip(source), "def f():\n    1\n");
    }

    #[test]
    fn keeps_only_needed_parentheses() {
        let cases = [
            ("(1 + 2) * 3", "(1 + 2) * 3"),
            ("1 + (2 * 3)", "1 + 2 * 3"),
            ("(a - b) - c", "a - b - c"),
            ("a - (b - c)", "a - (b - c)"),
            ("-(x + 1)", "-(x + 1)"),
            ("not (a == b)", "not a == b"),
            ("(not a) == b", "(not a) == b"),
            ("(a < b) == c", "(a < b) == c"),
            ("(f + g)(x).y", "(f + g)(x).y"),
        ];
        for (input, expected) in cases {
            let program = parse(input).expect("parse failed");
            let StatementKind::Expr(expression) = &program.statements[0].kind else {
                panic!("expected expression statement for {input}");
            };
            assert_eq!(unparse_expression(expression), expected, "{input}");
        }
    }

    fn quoted(value: &str) -> String {
        unparse_expression(&Expression::String(value.to_string()))
    }

    #[test]
    fn picks_quotes_for_string_content() {
        assert_eq!(quoted("plain"), "\"plain\"");
        assert_eq!(quoted("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quoted("it's"), "\"it's\"");
        assert_eq!(quoted("line\nbreak"), "\"\"\"line\nbreak\"\"\"");
        assert_eq!(quoted("both \" and '"), "\"\"\"both \" and '\"\"\"");
        assert_eq!(quoted("x\n\"\"\""), "'''x\n\"\"\"'''");
    }

    #[test]
    fn string_content_evaluates_back_unchanged() {
        for value in ["a \"\"\" b\nc'", "x\ny\"", "x\n'''", "\"\"x", "tail\\"] {
            let source = format!("x = {}\n", quoted(value));
            let module = Interpreter::new()
                .run_source("main.py", &source)
                .expect("quoted string should run");
            assert_eq!(module.get("x"), Some(Value::string(value)), "{source}");
        }
        assert_eq!(quoted("a \"\"\" b\nc'"), "'''a \"\"\" b\nc''' + \"'\"");
    }

    #[test]
    fn empty_suites_become_pass() {
        let program = Program {
            statements: vec![Statement::synthesized(StatementKind::While {
                condition: Expression::Boolean(false),
                body: Vec::new(),
            })],
        };
        assert_eq!(unparse(&program), "while False:\n    pass\n");
    }
}
