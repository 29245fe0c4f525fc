use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{AssignTarget, Expression, FunctionDef, Statement, StatementKind};
use crate::runtime::error::{InterpreterError, RuntimeError};
use crate::runtime::execution::{Environment, call_builtin_with_output};
use crate::runtime::function::FunctionRef;
use crate::runtime::value::Value;
use crate::source::{SourceFile, SourceRef};
use crate::token::Span;

use super::compile::compile_function;

/// Control-flow marker for statement execution.
pub(super) enum ExecResult {
    Continue,
    Return(Value),
}

/// Nested user-function calls allowed before `RecursionLimit` is raised.
pub(crate) const MAX_CALL_DEPTH: usize = 1000;
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Runtime executor for interpreted statements and expressions.
pub(super) struct InterpreterRuntime<'a> {
    pub(super) module: &'a str,
    pub(super) source: Option<&'a Rc<SourceFile>>,
    pub(super) output: Vec<String>,
    pub(super) depth: usize,
}

impl<'a> InterpreterRuntime<'a> {
    pub(super) fn exec_block(
        &mut self,
        body: &[Statement],
        environment: &mut Environment,
    ) -> Result<ExecResult, InterpreterError> {
        for statement in body {
            let result = self
                .exec_statement(statement, environment)
                .map_err(|error| error.at_line(statement.span.line))?;
            if let ExecResult::Return(value) = result {
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(
        &mut self,
        statement: &Statement,
        environment: &mut Environment,
    ) -> Result<ExecResult, InterpreterError> {
        match &statement.kind {
            StatementKind::FunctionDef(def) => {
                self.exec_function_def(def, statement.span, environment)?;
                Ok(ExecResult::Continue)
            }
            StatementKind::Assign { target, value } => {
                let value = self.eval_expression(value, environment)?;
                match target {
                    AssignTarget::Name(name) => environment.store(name.clone(), value),
                    AssignTarget::Index { name, index } => {
                        let index = self.eval_expression(index, environment)?;
                        let container = environment.load(name).ok_or_else(|| {
                            RuntimeError::UndefinedVariable {
                                name: name.to_string(),
                            }
                        })?;
                        container.set_item(&index, value)?;
                    }
                }
                Ok(ExecResult::Continue)
            }
            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.eval_expression(condition, environment)?;
                let body = if condition.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                self.exec_block(body, environment)
            }
            StatementKind::While { condition, body } => {
                loop {
                    let condition = self.eval_expression(condition, environment)?;
                    if !condition.is_truthy() {
                        break;
                    }
                    if let ExecResult::Return(value) = self.exec_block(body, environment)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Continue)
            }
            StatementKind::For {
                target,
                iterable,
                body,
            } => {
                let items = self.eval_expression(iterable, environment)?.iter_values()?;
                for item in items {
                    environment.store(target.clone(), item);
                    if let ExecResult::Return(value) = self.exec_block(body, environment)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Continue)
            }
            StatementKind::Return(value) => {
                if environment.is_top_level() {
                    return Err(RuntimeError::ReturnOutsideFunction.into());
                }
                let value = match value {
                    Some(value) => self.eval_expression(value, environment)?,
                    None => Value::None,
                };
                Ok(ExecResult::Return(value))
            }
            StatementKind::Pass => Ok(ExecResult::Continue),
            StatementKind::Expr(expr) => {
                self.eval_expression(expr, environment)?;
                Ok(ExecResult::Continue)
            }
        }
    }

    /// Decorators are evaluated top-down and applied bottom-up before the
    /// name is bound.
    fn exec_function_def(
        &mut self,
        def: &FunctionDef,
        span: Span,
        environment: &mut Environment,
    ) -> Result<(), InterpreterError> {
        let mut decorators = Vec::with_capacity(def.decorators.len());
        for decorator in &def.decorators {
            decorators.push(self.eval_expression(decorator, environment)?);
        }

        let source = self
            .source
            .map(|file| SourceRef::new(Rc::clone(file), span));
        let function = compile_function(
            def,
            span,
            Rc::clone(environment.globals()),
            self.module,
            source,
        )
        .map_err(RuntimeError::from)?;

        let mut value = Value::Function(Rc::new(function));
        for decorator in decorators.into_iter().rev() {
            value = self.call_value(decorator, vec![value])?;
        }
        environment.store(def.name.clone(), value);
        Ok(())
    }

    fn eval_expression(
        &mut self,
        expr: &Expression,
        environment: &mut Environment,
    ) -> Result<Value, InterpreterError> {
        match expr {
            Expression::Integer(value) => Ok(Value::Integer(*value)),
            Expression::Boolean(value) => Ok(Value::Boolean(*value)),
            Expression::String(value) => Ok(Value::String(value.clone())),
            Expression::None => Ok(Value::None),
            Expression::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expression(element, environment)?);
                }
                Ok(Value::list(values))
            }
            Expression::Identifier(name) => environment.load(name).ok_or_else(|| {
                RuntimeError::UndefinedVariable {
                    name: name.to_string(),
                }
                .into()
            }),
            Expression::Index { object, index } => {
                let object = self.eval_expression(object, environment)?;
                let index = self.eval_expression(index, environment)?;
                Ok(object.get_item(&index)?)
            }
            Expression::Attribute { object, name } => {
                let object = self.eval_expression(object, environment)?;
                Ok(object.attribute(name)?)
            }
            Expression::UnaryOp { op, operand } => {
                let operand = self.eval_expression(operand, environment)?;
                Ok(operand.unary_op(*op)?)
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval_expression(left, environment)?;
                let right = self.eval_expression(right, environment)?;
                Ok(left.binary_op(*op, &right)?)
            }
            Expression::Call { callee, args } => {
                let callee = self.eval_expression(callee, environment)?;
                let mut evaluated_args = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated_args.push(self.eval_expression(arg, environment)?);
                }
                self.call_value(callee, evaluated_args)
            }
        }
    }

    pub(super) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
    ) -> Result<Value, InterpreterError> {
        match callee {
            Value::BuiltinFunction(builtin) => {
                Ok(call_builtin_with_output(builtin, args, &mut self.output)?)
            }
            Value::Function(function) => self.call_function(&function, args),
            other => Err(RuntimeError::ObjectNotCallable {
                type_name: other.type_name().to_string(),
            }
            .into()),
        }
    }

    pub(super) fn call_function(
        &mut self,
        function: &FunctionRef,
        args: Vec<Value>,
    ) -> Result<Value, InterpreterError> {
        let params = function.params();
        let required = function.required_params();
        if args.len() < required {
            return Err(RuntimeError::TooFewArguments {
                name: function.name().to_string(),
                expected: required,
                found: args.len(),
            }
            .into());
        }
        if args.len() > params.len() {
            return Err(RuntimeError::TooManyArguments {
                name: function.name().to_string(),
                expected: params.len(),
                found: args.len(),
            }
            .into());
        }

        let mut locals =
            FxHashMap::with_capacity_and_hasher(params.len(), Default::default());
        let mut args = args.into_iter();
        for param in params {
            let value = match args.next() {
                Some(value) => value,
                None => param.default.clone().unwrap_or(Value::None),
            };
            locals.insert(param.name.clone(), value);
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::RecursionLimit {
                limit: MAX_CALL_DEPTH,
            }
            .into());
        }

        let mut environment = Environment::for_call(Rc::clone(function.globals()), locals);
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.exec_block(function.body(), &mut environment)
        });
        self.depth -= 1;
        match result? {
            ExecResult::Continue => Ok(Value::None),
            ExecResult::Return(value) => Ok(value),
        }
    }
}
