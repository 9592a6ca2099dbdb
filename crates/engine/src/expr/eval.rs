//! Tree-walking evaluation over [`serde_json::Value`].

use serde_json::{Number, Value};

use super::ast::{BinOp, Expr, UnaryOp};
use super::helpers;
use super::scope::Scope;
use super::EvalError;

pub(super) fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::from(*n)),
        Expr::Float(f) => Ok(number_from_f64(*f)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Ident(name) => scope
            .lookup(name)
            .ok_or_else(|| EvalError::Reference(name.clone())),
        Expr::Member(base, field) => member(&eval(base, scope)?, field),
        Expr::Index(base, index) => {
            let base = eval(base, scope)?;
            let index = eval(index, scope)?;
            indexed(&base, &index)
        }
        Expr::Call(name, args) => call(name, args, scope),
        Expr::Unary(op, operand) => {
            let operand = eval(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&operand))),
                UnaryOp::Neg => {
                    if let Some(n) = operand.as_i64() {
                        Ok(Value::from(-n))
                    } else if let Some(f) = operand.as_f64() {
                        Ok(number_from_f64(-f))
                    } else {
                        Err(EvalError::Type(format!(
                            "cannot negate {}",
                            type_name(&operand)
                        )))
                    }
                }
            }
        }
        Expr::Binary(op, left, right) => binary(*op, left, right, scope),
        Expr::Ternary(cond, then, other) => {
            if truthy(&eval(cond, scope)?) {
                eval(then, scope)
            } else {
                eval(other, scope)
            }
        }
    }
}

fn binary(op: BinOp, left: &Expr, right: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    // Logic operators short-circuit and return the deciding operand.
    match op {
        BinOp::And => {
            let left = eval(left, scope)?;
            return if truthy(&left) { eval(right, scope) } else { Ok(left) };
        }
        BinOp::Or => {
            let left = eval(left, scope)?;
            return if truthy(&left) { Ok(left) } else { eval(right, scope) };
        }
        _ => {}
    }

    let left = eval(left, scope)?;
    let right = eval(right, scope)?;

    match op {
        BinOp::Add => add(&left, &right),
        BinOp::Sub => arithmetic(&left, &right, "-", |a, b| a - b, i64::checked_sub),
        BinOp::Mul => arithmetic(&left, &right, "*", |a, b| a * b, i64::checked_mul),
        BinOp::Div => {
            // Division always computes in floating point.
            let a = numeric(&left, "/")?;
            let b = numeric(&right, "/")?;
            Ok(number_from_f64(a / b))
        }
        BinOp::Rem => arithmetic(&left, &right, "%", |a, b| a % b, |a, b| {
            if b == 0 {
                None
            } else {
                a.checked_rem(b)
            }
        }),
        BinOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, &left, &right),
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if left.is_string() || right.is_string() {
        return Ok(Value::String(format!(
            "{}{}",
            display_string(left),
            display_string(right)
        )));
    }
    arithmetic(left, right, "+", |a, b| a + b, i64::checked_add)
}

fn arithmetic(
    left: &Value,
    right: &Value,
    op: &str,
    float_op: fn(f64, f64) -> f64,
    int_op: fn(i64, i64) -> Option<i64>,
) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        if let Some(n) = int_op(a, b) {
            return Ok(Value::from(n));
        }
    }
    let a = numeric(left, op)?;
    let b = numeric(right, op)?;
    Ok(number_from_f64(float_op(a, b)))
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        a.partial_cmp(&b)
    } else if let (Value::String(a), Value::String(b)) = (left, right) {
        Some(a.cmp(b))
    } else {
        return Err(EvalError::Type(format!(
            "cannot compare {} with {}",
            type_name(left),
            type_name(right)
        )));
    };

    let result = match (op, ordering) {
        (_, None) => false,
        (BinOp::Lt, Some(ord)) => ord.is_lt(),
        (BinOp::Le, Some(ord)) => ord.is_le(),
        (BinOp::Gt, Some(ord)) => ord.is_gt(),
        (BinOp::Ge, Some(ord)) => ord.is_ge(),
        _ => unreachable!("comparison operator"),
    };
    Ok(Value::Bool(result))
}

fn member(base: &Value, field: &str) -> Result<Value, EvalError> {
    match base {
        Value::Object(map) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
        Value::Null => Err(EvalError::Type(format!(
            "cannot read field `{field}` of null"
        ))),
        _ => Ok(Value::Null),
    }
}

fn indexed(base: &Value, index: &Value) -> Result<Value, EvalError> {
    match base {
        Value::Array(items) => {
            let idx = index.as_i64().ok_or_else(|| {
                EvalError::Type("array index must be a number".to_string())
            })?;
            if idx < 0 {
                return Ok(Value::Null);
            }
            Ok(items.get(idx as usize).cloned().unwrap_or(Value::Null))
        }
        Value::Object(map) => match index {
            Value::String(key) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
            _ => Err(EvalError::Type("object index must be a string".to_string())),
        },
        Value::Null => Err(EvalError::Type("cannot index into null".to_string())),
        _ => Ok(Value::Null),
    }
}

fn call(name: &str, args: &[Expr], scope: &Scope<'_>) -> Result<Value, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, scope)?);
    }

    match name {
        "exit" => {
            arity(name, &values, 0, 0)?;
            scope.request_exit();
            Ok(Value::String("exit".to_string()))
        }
        "date" => {
            arity(name, &values, 1, 2)?;
            let millis = millis_arg(&values[0])?;
            let delimiter = match values.get(1) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    return Err(EvalError::Type(format!(
                        "date delimiter must be a string, got {}",
                        type_name(other)
                    )));
                }
                None => "-".to_string(),
            };
            helpers::format_date(millis, &delimiter).map(Value::String)
        }
        "dateTime" => {
            arity(name, &values, 1, 1)?;
            let millis = millis_arg(&values[0])?;
            helpers::format_date_time(millis).map(Value::String)
        }
        "select" => {
            arity(name, &values, 1, 1)?;
            let selector = match &values[0] {
                Value::String(s) => s,
                other => {
                    return Err(EvalError::Type(format!(
                        "selector must be a string, got {}",
                        type_name(other)
                    )));
                }
            };
            Ok(scope
                .document()
                .and_then(|doc| doc.select_first(selector))
                .map(Value::String)
                .unwrap_or(Value::Null))
        }
        other => Err(EvalError::Reference(format!("unknown function `{other}`"))),
    }
}

fn arity(name: &str, values: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if values.len() < min || values.len() > max {
        return Err(EvalError::Type(format!(
            "`{name}` takes {min}..={max} arguments, got {}",
            values.len()
        )));
    }
    Ok(())
}

fn millis_arg(value: &Value) -> Result<i64, EvalError> {
    value
        .as_f64()
        .map(|f| f as i64)
        .ok_or_else(|| EvalError::Type("timestamp must be a number".to_string()))
}

fn numeric(value: &Value, op: &str) -> Result<f64, EvalError> {
    value.as_f64().ok_or_else(|| {
        EvalError::Type(format!("`{op}` needs numbers, got {}", type_name(value)))
    })
}

fn number_from_f64(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truthiness: null, false, 0, NaN, and the empty string are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strict equality, numeric-aware (`1 == 1.0`).
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return a == b;
    }
    left == right
}

/// Render a value the way string concatenation and messages display it:
/// strings verbatim, integral numbers without a decimal point, compound
/// values as JSON.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                n.to_string()
            }
        }
        compound => serde_json::to_string(compound).unwrap_or_default(),
    }
}
