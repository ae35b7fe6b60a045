use crate::runtime::{function::NativeCall, value::Value};

use super::helpers::{arg_bool, check_arity};

/// Structural equality where `int` and `number` compare by numeric value.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

pub(super) fn builtin_equals(call: &mut NativeCall<'_>) -> Result<Value, String> {
    check_arity(call.inputs, 2, "equals", "equals(any a, any b) -> bool")?;
    Ok(Value::Bool(values_equal(&call.inputs[0], &call.inputs[1])))
}

pub(super) fn builtin_not_equals(call: &mut NativeCall<'_>) -> Result<Value, String> {
    check_arity(call.inputs, 2, "not_equals", "not_equals(any a, any b) -> bool")?;
    Ok(Value::Bool(!values_equal(&call.inputs[0], &call.inputs[1])))
}

pub(super) fn builtin_and(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "and(bool a, bool b) -> bool";
    check_arity(call.inputs, 2, "and", SIG)?;
    let a = arg_bool(call.inputs, 0, "and", "first argument", SIG)?;
    let b = arg_bool(call.inputs, 1, "and", "second argument", SIG)?;
    Ok(Value::Bool(a && b))
}

pub(super) fn builtin_or(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "or(bool a, bool b) -> bool";
    check_arity(call.inputs, 2, "or", SIG)?;
    let a = arg_bool(call.inputs, 0, "or", "first argument", SIG)?;
    let b = arg_bool(call.inputs, 1, "or", "second argument", SIG)?;
    Ok(Value::Bool(a || b))
}

pub(super) fn builtin_not(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "not(bool a) -> bool";
    check_arity(call.inputs, 1, "not", SIG)?;
    Ok(Value::Bool(!arg_bool(call.inputs, 0, "not", "argument", SIG)?))
}
