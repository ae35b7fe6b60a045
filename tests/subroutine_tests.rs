use trellis::{
    BranchId, EvalError, Runtime, TermId, Value,
    runtime::{function::Control, value::StateMap},
};

fn kernel(rt: &Runtime, name: &str) -> TermId {
    rt.lookup(rt.kernel(), name).unwrap()
}

struct Factorial {
    function: TermId,
    seen: TermId,
    recursive_call: TermId,
}

/// ```text
/// factorial(int n) -> int {
///     state int seen
///     seen = copy(n)
///     if n < 2 { return 1 }
///     n * factorial(n - 1)
/// }
/// ```
fn declare_factorial(rt: &mut Runtime, branch: BranchId) -> Factorial {
    let int = rt.types.core().int;
    let less_than = kernel(rt, "less_than");
    let sub = kernel(rt, "sub");
    let mult = kernel(rt, "mult");
    let copy = kernel(rt, "copy");

    let function = rt.declare_subroutine(branch, "factorial", &[("n", int)], int);
    let body = rt.subroutine_body(function).unwrap();
    let n = rt.lookup(body, "n").unwrap();
    let seen = rt.declare_state(body, "seen", int, None);
    rt.apply(body, copy, &[Some(n)], Some("seen"));

    let two = rt.create_int(body, 2, None);
    let small = rt.apply(body, less_than, &[Some(n), Some(two)], None);
    let block = rt.begin_if_block(body);
    let base = rt.add_if_case(block, small).unwrap();
    let one = rt.create_int(base, 1, None);
    rt.create_return(base, Some(one));
    rt.finish_if_block(block).unwrap();

    let unit = rt.create_int(body, 1, None);
    let smaller = rt.apply(body, sub, &[Some(n), Some(unit)], None);
    let recursive_call = rt.apply(body, function, &[Some(smaller)], None);
    let product = rt.apply(body, mult, &[Some(n), Some(recursive_call)], None);
    rt.finish_subroutine(function, Some(product)).unwrap();

    Factorial {
        function,
        seen,
        recursive_call,
    }
}

#[test]
fn recursive_factorial() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let factorial = declare_factorial(&mut rt, branch);
    let four = rt.create_int(branch, 4, None);
    let site = rt.apply(branch, factorial.function, &[Some(four)], None);

    rt.evaluate_branch(branch).unwrap();

    assert_eq!(rt.value_of(site), &Value::Int(24));
    assert_eq!(rt.call(factorial.function, &[Value::Int(5)]), Ok(Value::Int(120)));
    assert_eq!(rt.call(factorial.function, &[Value::Int(0)]), Ok(Value::Int(1)));
}

#[test]
fn declared_state_follows_the_call_tree() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let factorial = declare_factorial(&mut rt, branch);
    let four = rt.create_int(branch, 4, None);
    let site = rt.apply(branch, factorial.function, &[Some(four)], None);
    assert!(rt.is_stateful(site));

    rt.evaluate_branch(branch).unwrap();

    let mut chain = Vec::new();
    let mut state: Option<StateMap> = rt.term(site).state.clone().map(Value::into_state_map);
    while let Some(map) = state {
        if let Some(seen) = map.get(&factorial.seen) {
            chain.push(seen.clone());
        }
        state = map
            .get(&factorial.recursive_call)
            .cloned()
            .map(Value::into_state_map);
    }
    assert_eq!(
        chain,
        vec![Value::Int(4), Value::Int(3), Value::Int(2), Value::Int(1)]
    );
}

#[test]
fn stateful_subroutine_keeps_state_per_call_site() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let int = rt.types.core().int;
    let counter = kernel(&rt, "counter");
    let tick = rt.declare_subroutine(branch, "tick", &[], int);
    let body = rt.subroutine_body(tick).unwrap();
    let count = rt.apply(body, counter, &[], None);
    rt.finish_subroutine(tick, Some(count)).unwrap();

    let first = rt.apply(branch, tick, &[], Some("first"));
    let second = rt.apply(branch, tick, &[], Some("second"));
    assert!(rt.is_stateful(first));

    for _ in 0..3 {
        rt.evaluate_branch(branch).unwrap();
    }
    assert_eq!(rt.value_of(first), &Value::Int(3));
    assert_eq!(rt.value_of(second), &Value::Int(3));

    assert_eq!(rt.evaluate_term(first), Ok(Value::Int(4)));
    assert_eq!(rt.value_of(second), &Value::Int(3));
}

#[test]
fn call_sites_created_before_the_body_pick_up_state() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let int = rt.types.core().int;
    let counter = kernel(&rt, "counter");
    let tick = rt.declare_subroutine(branch, "tick", &[], int);
    let early = rt.apply(branch, tick, &[], None);
    assert_eq!(rt.term(early).state, None);

    let body = rt.subroutine_body(tick).unwrap();
    let count = rt.apply(body, counter, &[], None);
    rt.finish_subroutine(tick, Some(count)).unwrap();

    assert_eq!(rt.term(early).state, Some(Value::State(Default::default())));
}

#[test]
fn return_from_inside_a_loop_ends_the_call() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let int = rt.types.core().int;
    let list_type = rt.types.core().list;
    let greater_than = kernel(&rt, "greater_than");

    // first_over(List items, int limit) -> int
    let first_over =
        rt.declare_subroutine(branch, "first_over", &[("items", list_type), ("limit", int)], int);
    let body = rt.subroutine_body(first_over).unwrap();
    let items = rt.lookup(body, "items").unwrap();
    let limit = rt.lookup(body, "limit").unwrap();
    let for_loop = rt.begin_for_loop(body, "x", items);
    let loop_body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(loop_body, "x").unwrap();
    let over = rt.apply(loop_body, greater_than, &[Some(x), Some(limit)], None);
    let block = rt.begin_if_block(loop_body);
    let case = rt.add_if_case(block, over).unwrap();
    rt.create_return(case, Some(x));
    rt.finish_if_block(block).unwrap();
    rt.finish_for_loop(for_loop, false).unwrap();
    let none_found = rt.create_int(body, -1, None);
    rt.finish_subroutine(first_over, Some(none_found)).unwrap();

    let list = Value::list(vec![Value::Int(1), Value::Int(5), Value::Int(9)]);
    assert_eq!(
        rt.call(first_over, &[list.clone(), Value::Int(3)]),
        Ok(Value::Int(5))
    );
    assert_eq!(rt.call(first_over, &[list, Value::Int(10)]), Ok(Value::Int(-1)));
}

#[test]
fn return_without_a_value_yields_none_cast_to_the_output() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let void = rt.types.core().void;
    let nothing = rt.declare_subroutine(branch, "nothing", &[], void);
    let body = rt.subroutine_body(nothing).unwrap();
    rt.create_return(body, None);
    let unreachable = rt.create_int(body, 7, None);
    rt.finish_subroutine(nothing, Some(unreachable)).unwrap();

    assert_eq!(rt.call(nothing, &[]), Ok(Value::None));
}

#[test]
fn subroutine_body_with_a_static_error_refuses_to_run() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let int = rt.types.core().int;
    let broken = rt.declare_subroutine(branch, "broken", &[], int);
    let body = rt.subroutine_body(broken).unwrap();
    let unknown = rt.apply_named(body, "missing", &[], None);
    rt.finish_subroutine(broken, Some(unknown)).unwrap();

    match rt.call(broken, &[]) {
        Err(EvalError::Static { term, .. }) => assert_eq!(term, unknown),
        other => panic!("expected a static error, got {:?}", other),
    }
    assert_eq!(rt.control_of(unknown), Some(Control::UnknownFunction));
}
