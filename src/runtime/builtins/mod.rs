use crate::runtime::function::NativeFn;

mod helpers;
mod list_ops;
mod logic_ops;
mod numeric_ops;
mod string_ops;
mod type_ops;

pub(crate) use logic_ops::values_equal;

use list_ops::{
    builtin_any_true, builtin_append, builtin_filter, builtin_get_index, builtin_length,
    builtin_list, builtin_range, builtin_set_index,
};
use logic_ops::{builtin_and, builtin_equals, builtin_not, builtin_not_equals, builtin_or};
use numeric_ops::{
    builtin_add, builtin_div, builtin_greater_than, builtin_less_than, builtin_less_than_eq,
    builtin_mult, builtin_neg, builtin_sub,
};
use string_ops::{builtin_concat, builtin_to_string};
use type_ops::{builtin_copy, builtin_counter, builtin_error, builtin_type_of};

/// A native function together with the signature it is installed under.
#[derive(Debug, Clone, Copy)]
pub struct NativeFunction {
    pub signature: &'static str,
    pub func: NativeFn,
}

/// Natives installed into every runtime's kernel branch, in install order.
pub static BUILTINS: &[NativeFunction] = &[
    NativeFunction {
        signature: "add(number a, number b) -> number",
        func: builtin_add,
    },
    NativeFunction {
        signature: "sub(number a, number b) -> number",
        func: builtin_sub,
    },
    NativeFunction {
        signature: "mult(number a, number b) -> number",
        func: builtin_mult,
    },
    NativeFunction {
        signature: "div(number a, number b) -> number",
        func: builtin_div,
    },
    NativeFunction {
        signature: "neg(number a) -> number",
        func: builtin_neg,
    },
    NativeFunction {
        signature: "less_than(number a, number b) -> bool",
        func: builtin_less_than,
    },
    NativeFunction {
        signature: "less_than_eq(number a, number b) -> bool",
        func: builtin_less_than_eq,
    },
    NativeFunction {
        signature: "greater_than(number a, number b) -> bool",
        func: builtin_greater_than,
    },
    NativeFunction {
        signature: "equals(any a, any b) -> bool",
        func: builtin_equals,
    },
    NativeFunction {
        signature: "not_equals(any a, any b) -> bool",
        func: builtin_not_equals,
    },
    NativeFunction {
        signature: "and(bool a, bool b) -> bool",
        func: builtin_and,
    },
    NativeFunction {
        signature: "or(bool a, bool b) -> bool",
        func: builtin_or,
    },
    NativeFunction {
        signature: "not(bool a) -> bool",
        func: builtin_not,
    },
    NativeFunction {
        signature: "list(any items...) -> List",
        func: builtin_list,
    },
    NativeFunction {
        signature: "range(int start, int end) -> List",
        func: builtin_range,
    },
    NativeFunction {
        signature: "length(List list) -> int",
        func: builtin_length,
    },
    NativeFunction {
        signature: "get_index(List list, int index) -> any",
        func: builtin_get_index,
    },
    NativeFunction {
        signature: "set_index(List list, int index, any value) -> List",
        func: builtin_set_index,
    },
    NativeFunction {
        signature: "append(List list, any item) -> List",
        func: builtin_append,
    },
    NativeFunction {
        signature: "filter(List items, List keep) -> List",
        func: builtin_filter,
    },
    NativeFunction {
        signature: "any_true(List items) -> bool",
        func: builtin_any_true,
    },
    NativeFunction {
        signature: "concat(any parts...) -> string",
        func: builtin_concat,
    },
    NativeFunction {
        signature: "to_string(any value) -> string",
        func: builtin_to_string,
    },
    NativeFunction {
        signature: "type_of(any value) -> Type",
        func: builtin_type_of,
    },
    NativeFunction {
        signature: "copy(any value) -> any",
        func: builtin_copy,
    },
    NativeFunction {
        signature: "error(string message) -> void",
        func: builtin_error,
    },
    NativeFunction {
        signature: "counter(state int count) -> int",
        func: builtin_counter,
    },
];

#[cfg(test)]
mod list_ops_test;
