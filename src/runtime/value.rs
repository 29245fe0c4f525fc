use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::builtins::BuiltinFunction;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::FunctionRef;

/// Upper bound on the length of strings and lists built by a single operation.
pub(crate) const MAX_SEQUENCE_LEN: usize = 1 << 24;

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    String(String),
    List(Rc<RefCell<Vec<Value>>>),
    None,
    BuiltinFunction(BuiltinFunction),
    Function(FunctionRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(left), Value::String(right)) => left == right,
            (Value::List(left), Value::List(right)) => {
                Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow()
            }
            (Value::None, Value::None) => true,
            (Value::BuiltinFunction(left), Value::BuiltinFunction(right)) => left == right,
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            _ => match (self.as_int(), other.as_int()) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            },
        }
    }
}

impl Value {
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    /// Integer view of ints and bools.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::Boolean(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Boolean(_) => "bool",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::None => "NoneType",
            Value::BuiltinFunction(_) => "builtin_function_or_method",
            Value::Function(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(value) => *value != 0,
            Value::Boolean(value) => *value,
            Value::String(value) => !value.is_empty(),
            Value::List(values) => !values.borrow().is_empty(),
            Value::None => false,
            Value::BuiltinFunction(_) | Value::Function(_) => true,
        }
    }

    /// Identity comparison backing the `is` operator.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(left), Value::List(right)) => Rc::ptr_eq(left, right),
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::None, Value::None) => true,
            (Value::BuiltinFunction(left), Value::BuiltinFunction(right)) => left == right,
            _ => false,
        }
    }

    /// Text written by `print`.
    pub fn to_output(&self) -> String {
        match self {
            Value::String(value) => value.clone(),
            _ => self.repr(),
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::Integer(value) => value.to_string(),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::String(value) => quote(value),
            Value::List(values) => {
                let rendered = values.borrow().iter().map(Value::repr).collect::<Vec<_>>();
                format!("[{}]", rendered.join(", "))
            }
            Value::None => "None".to_string(),
            Value::BuiltinFunction(builtin) => format!("<built-in function {}>", builtin.name()),
            Value::Function(function) => format!("<function {}>", function.qualname()),
        }
    }

    pub fn attribute(&self, name: &str) -> Result<Value, RuntimeError> {
        let unknown = || RuntimeError::UnknownAttribute {
            attribute: name.to_string(),
            type_name: self.type_name().to_string(),
        };
        match self {
            Value::Function(function) => match name {
                "__name__" => Ok(Value::string(function.name())),
                "__qualname__" => Ok(Value::string(function.qualname())),
                "__module__" => Ok(Value::string(function.module())),
                "__doc__" => Ok(function.doc().map_or(Value::None, Value::string)),
                "__wrapped__" => function
                    .wrapped()
                    .map(|inner| Value::Function(Rc::clone(inner)))
                    .ok_or_else(unknown),
                _ => Err(unknown()),
            },
            Value::BuiltinFunction(builtin) => match name {
                "__name__" | "__qualname__" => Ok(Value::string(builtin.name())),
                "__module__" => Ok(Value::string("builtins")),
                "__doc__" => Ok(Value::None),
                _ => Err(unknown()),
            },
            _ => Err(unknown()),
        }
    }

    pub fn len(&self) -> Result<Value, RuntimeError> {
        let len = match self {
            Value::String(value) => value.chars().count(),
            Value::List(values) => values.borrow().len(),
            other => {
                return Err(RuntimeError::InvalidArgumentType {
                    operation: "len".to_string(),
                    argument: "obj".to_string(),
                    expected: "sized object".to_string(),
                    got: other.type_name().to_string(),
                });
            }
        };
        Ok(Value::Integer(len as i64))
    }

    /// Snapshot of the items a `for` loop visits.
    pub fn iter_values(&self) -> Result<Vec<Value>, RuntimeError> {
        match self {
            Value::List(values) => Ok(values.borrow().clone()),
            Value::String(value) => Ok(value
                .chars()
                .map(|ch| Value::String(ch.to_string()))
                .collect()),
            other => Err(RuntimeError::NotIterable {
                type_name: other.type_name().to_string(),
            }),
        }
    }

    pub fn get_item(&self, index: &Value) -> Result<Value, RuntimeError> {
        let raw_index = index_operand("subscript", index)?;
        match self {
            Value::List(values) => {
                let values = values.borrow();
                let position = normalize_index(raw_index, values.len())?;
                Ok(values[position].clone())
            }
            Value::String(value) => {
                let chars = value.chars().collect::<Vec<_>>();
                let position = normalize_index(raw_index, chars.len())?;
                Ok(Value::String(chars[position].to_string()))
            }
            other => Err(RuntimeError::InvalidArgumentType {
                operation: "subscript".to_string(),
                argument: "object".to_string(),
                expected: "list or str".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    pub fn set_item(&self, index: &Value, value: Value) -> Result<(), RuntimeError> {
        let raw_index = index_operand("item assignment", index)?;
        match self {
            Value::List(values) => {
                let mut values = values.borrow_mut();
                let position = normalize_index(raw_index, values.len())?;
                values[position] = value;
                Ok(())
            }
            other => Err(RuntimeError::InvalidArgumentType {
                operation: "item assignment".to_string(),
                argument: "object".to_string(),
                expected: "list".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    pub fn unary_op(&self, op: UnaryOperator) -> Result<Value, RuntimeError> {
        match op {
            UnaryOperator::Not => Ok(Value::Boolean(!self.is_truthy())),
            UnaryOperator::Neg => {
                let value = self
                    .as_int()
                    .ok_or_else(|| RuntimeError::UnsupportedOperand {
                        operation: "-".to_string(),
                        type_name: self.type_name().to_string(),
                    })?;
                value
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| RuntimeError::IntegerOverflow {
                        operation: "-".to_string(),
                    })
            }
        }
    }

    pub fn binary_op(&self, op: BinaryOperator, other: &Value) -> Result<Value, RuntimeError> {
        match op {
            BinaryOperator::Equal => return Ok(Value::Boolean(self == other)),
            BinaryOperator::NotEqual => return Ok(Value::Boolean(self != other)),
            BinaryOperator::Is => return Ok(Value::Boolean(self.is_identical(other))),
            _ => {}
        }

        match (self, other) {
            (Value::String(left), Value::String(right)) => match op {
                BinaryOperator::Add => return Ok(Value::String(format!("{left}{right}"))),
                BinaryOperator::LessThan => return Ok(Value::Boolean(left < right)),
                BinaryOperator::LessEqual => return Ok(Value::Boolean(left <= right)),
                BinaryOperator::GreaterThan => return Ok(Value::Boolean(left > right)),
                BinaryOperator::GreaterEqual => return Ok(Value::Boolean(left >= right)),
                _ => {}
            },
            (Value::List(left), Value::List(right)) if op == BinaryOperator::Add => {
                let mut values = left.borrow().clone();
                values.extend(right.borrow().iter().cloned());
                return Ok(Value::list(values));
            }
            (Value::String(text), Value::Integer(times))
            | (Value::Integer(times), Value::String(text))
                if op == BinaryOperator::Mul =>
            {
                return repeat_string(text, *times);
            }
            (Value::String(text), Value::Boolean(flag))
            | (Value::Boolean(flag), Value::String(text))
                if op == BinaryOperator::Mul =>
            {
                return repeat_string(text, i64::from(*flag));
            }
            _ => {}
        }

        let (Some(left), Some(right)) = (self.as_int(), other.as_int()) else {
            return Err(self.unsupported(op, other));
        };
        let overflow = || RuntimeError::IntegerOverflow {
            operation: op.symbol().to_string(),
        };
        let value = match op {
            BinaryOperator::Add => Value::Integer(left.checked_add(right).ok_or_else(overflow)?),
            BinaryOperator::Sub => Value::Integer(left.checked_sub(right).ok_or_else(overflow)?),
            BinaryOperator::Mul => Value::Integer(left.checked_mul(right).ok_or_else(overflow)?),
            BinaryOperator::FloorDiv => Value::Integer(floor_div(left, right)?),
            BinaryOperator::Mod => Value::Integer(floor_mod(left, right)?),
            BinaryOperator::LessThan => Value::Boolean(left < right),
            BinaryOperator::LessEqual => Value::Boolean(left <= right),
            BinaryOperator::GreaterThan => Value::Boolean(left > right),
            BinaryOperator::GreaterEqual => Value::Boolean(left >= right),
            BinaryOperator::Equal | BinaryOperator::NotEqual | BinaryOperator::Is => {
                return Err(self.unsupported(op, other));
            }
        };
        Ok(value)
    }

    fn unsupported(&self, op: BinaryOperator, other: &Value) -> RuntimeError {
        RuntimeError::UnsupportedOperands {
            operation: op.symbol().to_string(),
            left: self.type_name().to_string(),
            right: other.type_name().to_string(),
        }
    }
}

fn quote(value: &str) -> String {
    if value.contains('\'') && !value.contains('"') {
        format!("\"{value}\"")
    } else {
        format!("'{}'", value.replace('\'', "\\'"))
    }
}

fn index_operand(operation: &str, index: &Value) -> Result<i64, RuntimeError> {
    match index {
        Value::Integer(value) => Ok(*value),
        Value::Boolean(value) => Ok(i64::from(*value)),
        other => Err(RuntimeError::InvalidArgumentType {
            operation: operation.to_string(),
            argument: "index".to_string(),
            expected: "int".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// Resolves Python-style negative indices against `len`.
fn normalize_index(index: i64, len: usize) -> Result<usize, RuntimeError> {
    let resolved = if index < 0 {
        index.checked_add(len as i64)
    } else {
        Some(index)
    };
    match resolved {
        Some(position) if position >= 0 && (position as usize) < len => Ok(position as usize),
        _ => Err(RuntimeError::IndexOutOfRange { index, len }),
    }
}

fn repeat_string(text: &str, times: i64) -> Result<Value, RuntimeError> {
    let times = usize::try_from(times.max(0)).unwrap_or(usize::MAX);
    match text.len().checked_mul(times) {
        Some(len) if len <= MAX_SEQUENCE_LEN => Ok(Value::String(text.repeat(times))),
        _ => Err(RuntimeError::SequenceTooLarge {
            operation: "*".to_string(),
        }),
    }
}

fn floor_div(left: i64, right: i64) -> Result<i64, RuntimeError> {
    if right == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let quotient = left
        .checked_div(right)
        .ok_or_else(|| RuntimeError::IntegerOverflow {
            operation: "//".to_string(),
        })?;
    if (left % right != 0) && ((left < 0) != (right < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn floor_mod(left: i64, right: i64) -> Result<i64, RuntimeError> {
    if right == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let remainder = left.checked_rem(right).unwrap_or(0);
    if remainder != 0 && ((remainder < 0) != (right < 0)) {
        Ok(remainder + right)
    } else {
        Ok(remainder)
    }
}
