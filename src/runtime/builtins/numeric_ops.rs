use std::cmp::Ordering;

use crate::runtime::{function::NativeCall, value::Value};

use super::helpers::{arg_number, check_arity, type_error};

enum Arith {
    Add,
    Sub,
    Mult,
}

fn arith(call: &NativeCall<'_>, op: Arith, name: &str, signature: &str) -> Result<Value, String> {
    let args = call.inputs;
    check_arity(args, 2, name, signature)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                Arith::Add => a.checked_add(*b),
                Arith::Sub => a.checked_sub(*b),
                Arith::Mult => a.checked_mul(*b),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| format!("{}: integer overflow", name))
        }
        _ => {
            let a = arg_number(args, 0, name, "first argument", signature)?;
            let b = arg_number(args, 1, name, "second argument", signature)?;
            Ok(Value::Float(match op {
                Arith::Add => a + b,
                Arith::Sub => a - b,
                Arith::Mult => a * b,
            }))
        }
    }
}

pub(super) fn builtin_add(call: &mut NativeCall<'_>) -> Result<Value, String> {
    arith(call, Arith::Add, "add", "add(number a, number b) -> number")
}

pub(super) fn builtin_sub(call: &mut NativeCall<'_>) -> Result<Value, String> {
    arith(call, Arith::Sub, "sub", "sub(number a, number b) -> number")
}

pub(super) fn builtin_mult(call: &mut NativeCall<'_>) -> Result<Value, String> {
    arith(call, Arith::Mult, "mult", "mult(number a, number b) -> number")
}

pub(super) fn builtin_div(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "div(number a, number b) -> number";
    let args = call.inputs;
    check_arity(args, 2, "div", SIG)?;
    match (&args[0], &args[1]) {
        (Value::Int(_), Value::Int(0)) => Err("division by zero".to_string()),
        (Value::Int(a), Value::Int(b)) => a
            .checked_div(*b)
            .map(Value::Int)
            .ok_or_else(|| "div: integer overflow".to_string()),
        _ => {
            let a = arg_number(args, 0, "div", "first argument", SIG)?;
            let b = arg_number(args, 1, "div", "second argument", SIG)?;
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Float(a / b))
        }
    }
}

pub(super) fn builtin_neg(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "neg(number a) -> number";
    let args = call.inputs;
    check_arity(args, 1, "neg", SIG)?;
    match &args[0] {
        Value::Int(v) => v
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| "neg: integer overflow".to_string()),
        Value::Float(v) => Ok(Value::Float(-v)),
        other => Err(type_error("neg", "argument", "number", other.type_name(), SIG)),
    }
}

fn compare(
    call: &NativeCall<'_>,
    name: &str,
    signature: &str,
    test: fn(Ordering) -> bool,
) -> Result<Value, String> {
    let args = call.inputs;
    check_arity(args, 2, name, signature)?;
    if let (Value::Int(a), Value::Int(b)) = (&args[0], &args[1]) {
        return Ok(Value::Bool(test(a.cmp(b))));
    }
    let a = arg_number(args, 0, name, "first argument", signature)?;
    let b = arg_number(args, 1, name, "second argument", signature)?;
    Ok(Value::Bool(a.partial_cmp(&b).is_some_and(test)))
}

pub(super) fn builtin_less_than(call: &mut NativeCall<'_>) -> Result<Value, String> {
    compare(call, "less_than", "less_than(number a, number b) -> bool", Ordering::is_lt)
}

pub(super) fn builtin_less_than_eq(call: &mut NativeCall<'_>) -> Result<Value, String> {
    compare(call, "less_than_eq", "less_than_eq(number a, number b) -> bool", Ordering::is_le)
}

pub(super) fn builtin_greater_than(call: &mut NativeCall<'_>) -> Result<Value, String> {
    compare(call, "greater_than", "greater_than(number a, number b) -> bool", Ordering::is_gt)
}
