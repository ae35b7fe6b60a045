use crate::runtime::{function::NativeCall, value::Value};

use super::helpers::{arg_string, check_arity};

pub(super) fn builtin_type_of(call: &mut NativeCall<'_>) -> Result<Value, String> {
    check_arity(call.inputs, 1, "type_of", "type_of(any value) -> Type")?;
    Ok(Value::Type(call.types.type_of_value(&call.inputs[0])))
}

pub(super) fn builtin_copy(call: &mut NativeCall<'_>) -> Result<Value, String> {
    check_arity(call.inputs, 1, "copy", "copy(any value) -> any")?;
    Ok(call.inputs[0].clone())
}

/// error(message) - Fails evaluation of the calling term with `message`.
pub(super) fn builtin_error(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "error(string message) -> void";
    check_arity(call.inputs, 1, "error", SIG)?;
    Err(arg_string(call.inputs, 0, "error", "message", SIG)?.to_string())
}

/// counter() - Returns how many times this call site has been evaluated.
pub(super) fn builtin_counter(call: &mut NativeCall<'_>) -> Result<Value, String> {
    check_arity(call.inputs, 0, "counter", "counter(state int count) -> int")?;
    let Some(state) = call.state.as_deref_mut() else {
        return Err("counter: called without a state slot".to_string());
    };
    let next = state.as_int().unwrap_or(0) + 1;
    *state = Value::Int(next);
    Ok(Value::Int(next))
}
