use crate::{
    check::StaticErrorKind,
    graph::TermId,
    runtime::{Runtime, evaluator::EvalError, value::Value},
};

fn kernel(rt: &Runtime, name: &str) -> TermId {
    rt.lookup(rt.kernel(), name).unwrap()
}

#[test]
fn native_terms_store_their_result() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let add = kernel(&rt, "add");
    let x = rt.create_int(b, 2, Some("x"));
    let y = rt.create_int(b, 3, Some("y"));
    let sum = rt.apply(b, add, &[Some(x), Some(y)], Some("sum"));

    rt.evaluate_branch(b).unwrap();

    assert_eq!(rt.value_of(sum), &Value::Int(5));
    assert!(!rt.term(sum).needs_update);
}

#[test]
fn native_failure_marks_the_term_and_unwinds() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let div = kernel(&rt, "div");
    let x = rt.create_int(b, 1, None);
    let zero = rt.create_int(b, 0, None);
    let quotient = rt.apply(b, div, &[Some(x), Some(zero)], None);

    let err = rt.evaluate_branch(b).unwrap_err();

    assert_eq!(
        err,
        EvalError::Runtime {
            term: quotient,
            message: "division by zero".to_string(),
            stack: Vec::new(),
        }
    );
    assert_eq!(rt.term(quotient).errors, vec!["division by zero".to_string()]);
}

#[test]
fn edited_graph_is_checked_again_before_running() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let add = kernel(&rt, "add");
    let x = rt.create_int(b, 2, None);
    let sum = rt.apply(b, add, &[Some(x), Some(x)], None);
    rt.evaluate_branch(b).unwrap();

    rt.set_input(sum, 1, None);
    let err = rt.evaluate_branch(b).unwrap_err();

    assert_eq!(
        err,
        EvalError::Static {
            term: sum,
            error: StaticErrorKind::NullInput,
        }
    );
}

#[test]
fn evaluate_term_refreshes_stale_inputs_only() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let add = kernel(&rt, "add");
    let mult = kernel(&rt, "mult");
    let x = rt.create_int(b, 2, Some("x"));
    let doubled = rt.apply(b, add, &[Some(x), Some(x)], None);
    let squared = rt.apply(b, mult, &[Some(doubled), Some(doubled)], None);
    rt.evaluate_branch(b).unwrap();
    assert_eq!(rt.value_of(squared), &Value::Int(16));

    rt.set_value(x, Value::Int(5));
    assert!(rt.term(doubled).needs_update);

    assert_eq!(rt.evaluate_term(squared).unwrap(), Value::Int(100));
    assert_eq!(rt.value_of(doubled), &Value::Int(10));
    assert!(!rt.term(doubled).needs_update);
}

#[test]
fn counter_keeps_state_per_call_site() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let counter = kernel(&rt, "counter");
    let first = rt.apply(b, counter, &[], None);
    let second = rt.apply(b, counter, &[], None);

    rt.evaluate_branch(b).unwrap();
    rt.evaluate_term(first).unwrap();
    rt.evaluate_term(first).unwrap();

    assert_eq!(rt.value_of(first), &Value::Int(3));
    assert_eq!(rt.value_of(second), &Value::Int(1));
    assert_eq!(rt.term(second).state, Some(Value::Int(1)));
}

#[test]
fn declared_state_persists_its_latest_binding() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let add = kernel(&rt, "add");
    let int = rt.types.core().int;
    let ten = rt.create_int(b, 10, None);
    let one = rt.create_int(b, 1, None);
    let s = rt.declare_state(b, "s", int, Some(ten));
    let next = rt.apply(b, add, &[Some(s), Some(one)], Some("s"));

    rt.evaluate_branch(b).unwrap();
    assert_eq!(rt.value_of(s), &Value::Int(10));
    assert_eq!(rt.value_of(next), &Value::Int(11));
    assert_eq!(rt.declared_state_value(s), Some(&Value::Int(11)));

    rt.evaluate_branch(b).unwrap();
    assert_eq!(rt.value_of(next), &Value::Int(12));
}
