use crate::runtime::value::Value;

pub(super) fn format_hint(signature: &str) -> String {
    format!("\n\nHint:\n  {}", signature)
}

pub(super) fn arity_error(name: &str, expected: &str, got: usize, signature: &str) -> String {
    format!(
        "wrong number of arguments\n\n  function: {}\n  expected: {}\n  got: {}{}",
        name,
        expected,
        got,
        format_hint(signature)
    )
}

pub(super) fn type_error(
    name: &str,
    label: &str,
    expected: &str,
    got: &str,
    signature: &str,
) -> String {
    format!(
        "{} expected {} to be {}, got {}{}",
        name,
        label,
        expected,
        got,
        format_hint(signature)
    )
}

pub(super) fn check_arity(
    args: &[Value],
    expected: usize,
    name: &str,
    signature: &str,
) -> Result<(), String> {
    if args.len() != expected {
        return Err(arity_error(
            name,
            &expected.to_string(),
            args.len(),
            signature,
        ));
    }
    Ok(())
}

pub(super) fn arg_int(
    args: &[Value],
    index: usize,
    name: &str,
    label: &str,
    signature: &str,
) -> Result<i64, String> {
    match &args[index] {
        Value::Int(value) => Ok(*value),
        other => Err(type_error(name, label, "int", other.type_name(), signature)),
    }
}

pub(super) fn arg_bool(
    args: &[Value],
    index: usize,
    name: &str,
    label: &str,
    signature: &str,
) -> Result<bool, String> {
    match &args[index] {
        Value::Bool(value) => Ok(*value),
        other => Err(type_error(name, label, "bool", other.type_name(), signature)),
    }
}

pub(super) fn arg_number(
    args: &[Value],
    index: usize,
    name: &str,
    label: &str,
    signature: &str,
) -> Result<f64, String> {
    match &args[index] {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        other => Err(type_error(name, label, "number", other.type_name(), signature)),
    }
}

pub(super) fn arg_list<'a>(
    args: &'a [Value],
    index: usize,
    name: &str,
    label: &str,
    signature: &str,
) -> Result<&'a [Value], String> {
    match &args[index] {
        Value::List(items) => Ok(items),
        other => Err(type_error(name, label, "List", other.type_name(), signature)),
    }
}

pub(super) fn arg_string<'a>(
    args: &'a [Value],
    index: usize,
    name: &str,
    label: &str,
    signature: &str,
) -> Result<&'a str, String> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(type_error(name, label, "string", other.type_name(), signature)),
    }
}

/// Resolves a possibly negative index against a list length.
pub(super) fn resolve_index(index: i64, len: usize, name: &str) -> Result<usize, String> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved < 0 || resolved as usize >= len {
        return Err(format!(
            "{}: index {} out of range for list of length {}",
            name, index, len
        ));
    }
    Ok(resolved as usize)
}
