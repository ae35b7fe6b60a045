use crate::{
    graph::{BranchId, TermId},
    runtime::{
        Runtime,
        config::RuntimeConfig,
        evaluator::{EvalError, Limit},
        value::Value,
    },
};

fn kernel(rt: &Runtime, name: &str) -> TermId {
    rt.lookup(rt.kernel(), name).unwrap()
}

/// `double(int x) -> int { x + x }`
fn declare_double(rt: &mut Runtime, branch: BranchId) -> TermId {
    let int = rt.types.core().int;
    let add = kernel(rt, "add");
    let double = rt.declare_subroutine(branch, "double", &[("x", int)], int);
    let body = rt.subroutine_body(double).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let sum = rt.apply(body, add, &[Some(x), Some(x)], None);
    rt.finish_subroutine(double, Some(sum)).unwrap();
    double
}

#[test]
fn call_runs_subroutine_with_explicit_arguments() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let double = declare_double(&mut rt, b);

    assert_eq!(rt.call(double, &[Value::Int(21)]), Ok(Value::Int(42)));
}

#[test]
fn call_runs_native_functions_directly() {
    let mut rt = Runtime::new();
    let concat = kernel(&rt, "concat");
    let result = rt.call(concat, &[Value::string("a"), Value::Int(1)]);
    assert_eq!(result, Ok(Value::string("a1")));
}

#[test]
fn call_sites_see_the_returned_value() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let double = declare_double(&mut rt, b);
    let three = rt.create_int(b, 3, None);
    let first = rt.apply(b, double, &[Some(three)], None);
    let second = rt.apply(b, double, &[Some(first)], None);

    rt.evaluate_branch(b).unwrap();

    assert_eq!(rt.value_of(first), &Value::Int(6));
    assert_eq!(rt.value_of(second), &Value::Int(12));
}

#[test]
fn runaway_recursion_hits_the_call_depth_limit() {
    let config = RuntimeConfig {
        max_call_depth: 8,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config);
    let b = rt.new_branch();
    let int = rt.types.core().int;
    let forever = rt.declare_subroutine(b, "forever", &[("n", int)], int);
    let body = rt.subroutine_body(forever).unwrap();
    let n = rt.lookup(body, "n").unwrap();
    let again = rt.apply(body, forever, &[Some(n)], None);
    rt.finish_subroutine(forever, Some(again)).unwrap();

    let err = rt.call(forever, &[Value::Int(1)]).unwrap_err();
    assert_eq!(
        err,
        EvalError::LimitExceeded {
            term: again,
            limit: Limit::CallDepth(8),
        }
    );
}

#[test]
fn runtime_error_reports_active_call_sites() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let int = rt.types.core().int;
    let div = kernel(&rt, "div");
    let broken = rt.declare_subroutine(b, "broken", &[("x", int)], int);
    let body = rt.subroutine_body(broken).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let zero = rt.create_int(body, 0, None);
    let failing = rt.apply(body, div, &[Some(x), Some(zero)], None);
    rt.finish_subroutine(broken, Some(failing)).unwrap();

    let five = rt.create_int(b, 5, None);
    let site = rt.apply(b, broken, &[Some(five)], None);

    match rt.evaluate_branch(b) {
        Err(EvalError::Runtime { term, stack, .. }) => {
            assert_eq!(term, failing);
            assert_eq!(stack, vec![site]);
        }
        other => panic!("expected a runtime error, got {:?}", other),
    }
    assert_eq!(rt.term(failing).errors.len(), 1);
}

#[test]
fn arguments_are_cast_to_declared_input_types() {
    let mut rt = Runtime::new();
    let b = rt.new_branch();
    let number = rt.types.core().number;
    let identity = rt.declare_subroutine(b, "identity", &[("x", number)], number);
    let body = rt.subroutine_body(identity).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    rt.finish_subroutine(identity, Some(x)).unwrap();

    assert_eq!(rt.call(identity, &[Value::Int(2)]), Ok(Value::Float(2.0)));
}
