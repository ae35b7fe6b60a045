use crate::runtime::{function::NativeCall, value::Value};

use super::helpers::check_arity;

/// concat(any parts...) - Joins the string forms of its inputs.
pub(super) fn builtin_concat(call: &mut NativeCall<'_>) -> Result<Value, String> {
    let joined: String = call.inputs.iter().map(Value::to_string_value).collect();
    Ok(Value::string(&joined))
}

pub(super) fn builtin_to_string(call: &mut NativeCall<'_>) -> Result<Value, String> {
    check_arity(call.inputs, 1, "to_string", "to_string(any value) -> string")?;
    Ok(Value::string(&call.inputs[0].to_string_value()))
}
