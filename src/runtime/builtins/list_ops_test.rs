use crate::runtime::{
    function::{NativeCall, NativeFn},
    types::TypeRegistry,
    value::Value,
};

use super::list_ops::{
    builtin_any_true, builtin_append, builtin_filter, builtin_get_index, builtin_range,
    builtin_set_index, MAX_RANGE_LEN,
};

fn call(func: NativeFn, inputs: Vec<Value>) -> Result<Value, String> {
    let types = TypeRegistry::new();
    func(&mut NativeCall {
        inputs: &inputs,
        state: None,
        types: &types,
    })
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::Int).collect())
}

#[test]
fn range_is_half_open_and_never_negative() {
    assert_eq!(call(builtin_range, vec![Value::Int(1), Value::Int(4)]), Ok(ints(&[1, 2, 3])));
    assert_eq!(call(builtin_range, vec![Value::Int(3), Value::Int(1)]), Ok(ints(&[])));
}

#[test]
fn range_refuses_lists_over_the_length_limit() {
    let err = call(builtin_range, vec![Value::Int(0), Value::Int(i64::MAX)]).unwrap_err();
    assert_eq!(
        err,
        format!("range: {} elements exceeds the limit of {}", i64::MAX, MAX_RANGE_LEN)
    );
    let err = call(builtin_range, vec![Value::Int(i64::MIN), Value::Int(i64::MAX)]).unwrap_err();
    assert!(err.starts_with("range: 18446744073709551615 elements"));
    assert!(call(builtin_range, vec![Value::Int(-3), Value::Int(0)]).is_ok());
}

#[test]
fn get_index_supports_negative_indexes() {
    let list = ints(&[10, 20, 30]);
    assert_eq!(
        call(builtin_get_index, vec![list.clone(), Value::Int(-1)]),
        Ok(Value::Int(30))
    );
    let err = call(builtin_get_index, vec![list, Value::Int(3)]).unwrap_err();
    assert_eq!(err, "get_index: index 3 out of range for list of length 3");
}

#[test]
fn set_index_and_append_leave_input_untouched() {
    let list = ints(&[1, 2]);
    let updated = call(
        builtin_set_index,
        vec![list.clone(), Value::Int(0), Value::Int(9)],
    );
    assert_eq!(updated, Ok(ints(&[9, 2])));
    assert_eq!(call(builtin_append, vec![list.clone(), Value::Int(3)]), Ok(ints(&[1, 2, 3])));
    assert_eq!(list, ints(&[1, 2]));
}

#[test]
fn filter_uses_parallel_keep_list() {
    let keep = Value::list(vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)]);
    assert_eq!(
        call(builtin_filter, vec![ints(&[1, 2, 3]), keep]),
        Ok(ints(&[1, 3]))
    );
    assert!(call(builtin_filter, vec![ints(&[1]), ints(&[])]).is_err());
    assert_eq!(
        call(builtin_any_true, vec![Value::list(vec![Value::Bool(false)])]),
        Ok(Value::Bool(false))
    );
}
