use std::rc::Rc;

use crate::runtime::{function::NativeCall, value::Value};

use super::helpers::{arg_int, arg_list, check_arity, resolve_index, type_error};

/// list(any items...) - Collects its inputs into a list.
pub(super) fn builtin_list(call: &mut NativeCall<'_>) -> Result<Value, String> {
    Ok(Value::list(call.inputs.to_vec()))
}

/// Longest list `range` will build.
pub(super) const MAX_RANGE_LEN: i128 = 10_000_000;

/// range(int start, int end) - Ints from `start` up to, not including, `end`.
pub(super) fn builtin_range(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "range(int start, int end) -> List";
    check_arity(call.inputs, 2, "range", SIG)?;
    let start = arg_int(call.inputs, 0, "range", "start", SIG)?;
    let end = arg_int(call.inputs, 1, "range", "end", SIG)?;
    let len = i128::from(end) - i128::from(start);
    if len > MAX_RANGE_LEN {
        return Err(format!(
            "range: {} elements exceeds the limit of {}",
            len, MAX_RANGE_LEN
        ));
    }
    Ok(Value::list((start..end.max(start)).map(Value::Int).collect()))
}

pub(super) fn builtin_length(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "length(List list) -> int";
    check_arity(call.inputs, 1, "length", SIG)?;
    match &call.inputs[0] {
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        other => Err(type_error("length", "argument", "List", other.type_name(), SIG)),
    }
}

pub(super) fn builtin_get_index(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "get_index(List list, int index) -> any";
    check_arity(call.inputs, 2, "get_index", SIG)?;
    let items = arg_list(call.inputs, 0, "get_index", "list", SIG)?;
    let index = arg_int(call.inputs, 1, "get_index", "index", SIG)?;
    let index = resolve_index(index, items.len(), "get_index")?;
    Ok(items[index].clone())
}

/// set_index(list, index, value) - Copy of `list` with one element replaced.
pub(super) fn builtin_set_index(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "set_index(List list, int index, any value) -> List";
    check_arity(call.inputs, 3, "set_index", SIG)?;
    let mut list = call.inputs[0].clone();
    let index = arg_int(call.inputs, 1, "set_index", "index", SIG)?;
    match &mut list {
        Value::List(items) => {
            let index = resolve_index(index, items.len(), "set_index")?;
            Rc::make_mut(items)[index] = call.inputs[2].clone();
            Ok(list)
        }
        other => Err(type_error("set_index", "list", "List", other.type_name(), SIG)),
    }
}

pub(super) fn builtin_append(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "append(List list, any item) -> List";
    check_arity(call.inputs, 2, "append", SIG)?;
    let mut list = call.inputs[0].clone();
    match &mut list {
        Value::List(items) => {
            Rc::make_mut(items).push(call.inputs[1].clone());
            Ok(list)
        }
        other => Err(type_error("append", "list", "List", other.type_name(), SIG)),
    }
}

/// filter(items, keep) - Elements of `items` whose matching `keep` entry is truthy.
pub(super) fn builtin_filter(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "filter(List items, List keep) -> List";
    check_arity(call.inputs, 2, "filter", SIG)?;
    let items = arg_list(call.inputs, 0, "filter", "items", SIG)?;
    let keep = arg_list(call.inputs, 1, "filter", "keep", SIG)?;
    if items.len() != keep.len() {
        return Err(format!(
            "filter: items has {} elements but keep has {}",
            items.len(),
            keep.len()
        ));
    }
    Ok(Value::list(
        items
            .iter()
            .zip(keep.iter())
            .filter(|(_, k)| k.is_truthy())
            .map(|(item, _)| item.clone())
            .collect(),
    ))
}

pub(super) fn builtin_any_true(call: &mut NativeCall<'_>) -> Result<Value, String> {
    const SIG: &str = "any_true(List items) -> bool";
    check_arity(call.inputs, 1, "any_true", SIG)?;
    let items = arg_list(call.inputs, 0, "any_true", "items", SIG)?;
    Ok(Value::Bool(items.iter().any(Value::is_truthy)))
}
