use trellis::{
    EvalError, Runtime, RuntimeConfig, TermId, Value,
    runtime::{evaluator::Limit, function::Control},
};

fn kernel(rt: &Runtime, name: &str) -> TermId {
    rt.lookup(rt.kernel(), name).unwrap()
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn rebound_name_is_carried_between_iterations() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let a = rt.create_int(branch, 0, Some("a"));
    let one = rt.create_int(branch, 1, None);
    let items = rt.create_list(branch, ints(&[0, 0, 0]), None);
    let for_loop = rt.begin_for_loop(branch, "i", items);
    let body = rt.loop_body(for_loop).unwrap();
    rt.apply(body, add, &[Some(a), Some(one)], Some("a"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let exported = rt.lookup(branch, "a").unwrap();
    assert_eq!(rt.control_of(exported), Some(Control::LoopExit));
    assert_eq!(rt.value_of(exported), &Value::Int(3));
    assert_eq!(rt.value_of(a), &Value::Int(0));
}

#[test]
fn iterator_values_accumulate() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let total = rt.create_int(branch, 0, Some("total"));
    let items = rt.create_list(branch, ints(&[1, 2, 3, 4]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    rt.apply(body, add, &[Some(total), Some(x)], Some("total"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let total = rt.lookup(branch, "total").unwrap();
    assert_eq!(rt.value_of(total), &Value::Int(10));
}

#[test]
fn rebind_flag_replaces_the_list_with_the_outputs() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let mult = kernel(&rt, "mult");
    let ten = rt.create_int(branch, 10, None);
    let xs = rt.create_list(branch, ints(&[1, 2]), Some("xs"));
    let for_loop = rt.begin_for_loop(branch, "x", xs);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    rt.apply(body, mult, &[Some(x), Some(ten)], Some("x"));
    rt.finish_for_loop(for_loop, true).unwrap();

    rt.evaluate_branch(branch).unwrap();

    assert_eq!(rt.lookup(branch, "xs"), Some(for_loop));
    assert_eq!(rt.value_of(for_loop), &Value::list(ints(&[10, 20])));
    assert_eq!(rt.value_of(xs), &Value::list(ints(&[1, 2])));
}

#[test]
fn state_is_isolated_per_iteration() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let counter = kernel(&rt, "counter");
    let items = rt.create_list(branch, ints(&[7, 8, 9]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let count = rt.apply(body, counter, &[], None);
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();
    rt.evaluate_branch(branch).unwrap();

    let states = rt.term(for_loop).state.clone().unwrap().into_list();
    assert_eq!(states.len(), 3);
    for state in &states {
        let map = state.as_state().unwrap();
        assert_eq!(map.get(&count), Some(&Value::Int(2)));
    }
    assert_eq!(rt.value_of(count), &Value::Int(2));
}

#[test]
fn discard_drops_the_output_but_keeps_state() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let counter = kernel(&rt, "counter");
    let greater_than = kernel(&rt, "greater_than");
    let two = rt.create_int(branch, 2, None);
    let items = rt.create_list(branch, ints(&[1, 2, 3, 4]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let count = rt.apply(body, counter, &[], None);
    let big = rt.apply(body, greater_than, &[Some(x), Some(two)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, big).unwrap();
    rt.create_loop_control(case, Control::Discard);
    rt.finish_if_block(block).unwrap();
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    assert_eq!(rt.value_of(for_loop), &Value::list(ints(&[1, 2])));
    let states = rt.term(for_loop).state.clone().unwrap().into_list();
    assert_eq!(states.len(), 4);
    assert!(
        states
            .iter()
            .all(|s| s.as_state().and_then(|m| m.get(&count)) == Some(&Value::Int(1)))
    );
}

#[test]
fn continue_skips_the_rest_of_the_body() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let equals = kernel(&rt, "equals");
    let total = rt.create_int(branch, 0, Some("total"));
    let two = rt.create_int(branch, 2, None);
    let items = rt.create_list(branch, ints(&[1, 2, 3]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let is_two = rt.apply(body, equals, &[Some(x), Some(two)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, is_two).unwrap();
    rt.create_loop_control(case, Control::Continue);
    rt.finish_if_block(block).unwrap();
    rt.apply(body, add, &[Some(total), Some(x)], Some("total"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let total = rt.lookup(branch, "total").unwrap();
    assert_eq!(rt.value_of(total), &Value::Int(4));
    assert_eq!(rt.value_of(for_loop), &Value::list(ints(&[1, 2, 3])));
}

#[test]
fn while_loop_counts_down() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let greater_than = kernel(&rt, "greater_than");
    let sub = kernel(&rt, "sub");
    let n = rt.create_int(branch, 5, Some("n"));
    let zero = rt.create_int(branch, 0, None);
    let one = rt.create_int(branch, 1, None);
    let w = rt.begin_while_loop(branch);
    let body = rt.loop_body(w).unwrap();
    let positive = rt.apply(body, greater_than, &[Some(n), Some(zero)], None);
    rt.set_while_condition(w, positive).unwrap();
    rt.apply(body, sub, &[Some(n), Some(one)], Some("n"));
    rt.finish_while_loop(w).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let n = rt.lookup(branch, "n").unwrap();
    assert_eq!(rt.value_of(n), &Value::Int(0));
}

#[test]
fn while_loop_that_never_runs_exports_the_initial_value() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let no = rt.create_bool(branch, false, None);
    let n = rt.create_int(branch, 5, Some("n"));
    let w = rt.begin_while_loop(branch);
    let body = rt.loop_body(w).unwrap();
    rt.set_while_condition(w, no).unwrap();
    rt.apply(body, add, &[Some(n), Some(n)], Some("n"));
    rt.finish_while_loop(w).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let n = rt.lookup(branch, "n").unwrap();
    assert_eq!(rt.value_of(n), &Value::Int(5));
    assert_eq!(
        rt.term(w).state.as_ref().and_then(Value::as_list).map(<[_]>::len),
        Some(0)
    );
}

#[test]
fn break_in_a_while_loop_stops_it() {
    let config = RuntimeConfig {
        max_loop_iterations: 100,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config);
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let equals = kernel(&rt, "equals");
    let yes = rt.create_bool(branch, true, None);
    let i = rt.create_int(branch, 0, Some("i"));
    let one = rt.create_int(branch, 1, None);
    let four = rt.create_int(branch, 4, None);
    let w = rt.begin_while_loop(branch);
    let body = rt.loop_body(w).unwrap();
    rt.set_while_condition(w, yes).unwrap();
    let next = rt.apply(body, add, &[Some(i), Some(one)], Some("i"));
    let done = rt.apply(body, equals, &[Some(next), Some(four)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, done).unwrap();
    rt.create_loop_control(case, Control::Break);
    rt.finish_if_block(block).unwrap();
    rt.finish_while_loop(w).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let i = rt.lookup(branch, "i").unwrap();
    assert_eq!(rt.value_of(i), &Value::Int(4));
}

#[test]
fn loop_limit_is_reported_on_the_loop_term() {
    let config = RuntimeConfig {
        max_loop_iterations: 3,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config);
    let branch = rt.new_branch();
    let items = rt.create_list(branch, ints(&[1, 2, 3, 4, 5]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    rt.finish_for_loop(for_loop, false).unwrap();

    assert_eq!(
        rt.evaluate_branch(branch),
        Err(EvalError::LimitExceeded {
            term: for_loop,
            limit: Limit::LoopIterations(3),
        })
    );
}

#[test]
fn else_less_if_inside_a_loop_joins_with_the_carried_value() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let greater_than = kernel(&rt, "greater_than");
    let total = rt.create_int(branch, 0, Some("total"));
    let two = rt.create_int(branch, 2, None);
    let items = rt.create_list(branch, ints(&[1, 2, 3, 4]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let big = rt.apply(body, greater_than, &[Some(x), Some(two)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, big).unwrap();
    rt.apply(case, add, &[Some(total), Some(x)], Some("total"));
    rt.create_int(case, 1, Some("scratch"));
    rt.finish_if_block(block).unwrap();
    rt.finish_for_loop(for_loop, false).unwrap();

    assert_eq!(rt.lookup(body, "scratch"), None);
    assert_eq!(rt.lookup(branch, "scratch"), None);
    assert!(!rt.has_static_errors(branch));

    rt.evaluate_branch(branch).unwrap();

    let exported = rt.lookup(branch, "total").unwrap();
    assert_eq!(rt.control_of(exported), Some(Control::LoopExit));
    assert_eq!(rt.value_of(exported), &Value::Int(7));
    assert_eq!(rt.value_of(total), &Value::Int(0));
}

#[test]
fn continue_before_a_rebind_carries_the_current_value() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let equals = kernel(&rt, "equals");
    let total = rt.create_int(branch, 5, Some("total"));
    let two = rt.create_int(branch, 2, None);
    let items = rt.create_list(branch, ints(&[2, 3]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let is_two = rt.apply(body, equals, &[Some(x), Some(two)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, is_two).unwrap();
    rt.create_loop_control(case, Control::Continue);
    rt.finish_if_block(block).unwrap();
    rt.apply(body, add, &[Some(total), Some(x)], Some("total"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let exported = rt.lookup(branch, "total").unwrap();
    assert_eq!(rt.value_of(exported), &Value::Int(8));
}

#[test]
fn continue_between_rebinds_keeps_the_first_one() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let equals = kernel(&rt, "equals");
    let a = rt.create_int(branch, 0, Some("a"));
    let one = rt.create_int(branch, 1, None);
    let two = rt.create_int(branch, 2, None);
    let ten = rt.create_int(branch, 10, None);
    let items = rt.create_list(branch, ints(&[1, 2, 3]), None);
    let for_loop = rt.begin_for_loop(branch, "i", items);
    let body = rt.loop_body(for_loop).unwrap();
    let i = rt.lookup(body, "i").unwrap();
    let bumped = rt.apply(body, add, &[Some(a), Some(ten)], Some("a"));
    let is_two = rt.apply(body, equals, &[Some(i), Some(two)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, is_two).unwrap();
    rt.create_loop_control(case, Control::Continue);
    rt.finish_if_block(block).unwrap();
    rt.apply(body, add, &[Some(bumped), Some(one)], Some("a"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let exported = rt.lookup(branch, "a").unwrap();
    assert_eq!(rt.value_of(exported), &Value::Int(32));
}

#[test]
fn continue_before_an_iterator_rebind_outputs_the_item() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let mult = kernel(&rt, "mult");
    let equals = kernel(&rt, "equals");
    let two = rt.create_int(branch, 2, None);
    let ten = rt.create_int(branch, 10, None);
    let items = rt.create_list(branch, ints(&[1, 2, 3]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let is_two = rt.apply(body, equals, &[Some(x), Some(two)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, is_two).unwrap();
    rt.create_loop_control(case, Control::Continue);
    rt.finish_if_block(block).unwrap();
    rt.apply(body, mult, &[Some(x), Some(ten)], Some("x"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();

    assert_eq!(rt.value_of(for_loop), &Value::list(ints(&[10, 2, 30])));
}

#[test]
fn break_on_the_first_iteration_exports_the_value_from_before_the_loop() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let equals = kernel(&rt, "equals");
    let total = rt.create_int(branch, 5, Some("total"));
    let one = rt.create_int(branch, 1, None);
    let items = rt.create_list(branch, ints(&[1, 2]), None);
    let for_loop = rt.begin_for_loop(branch, "x", items);
    let body = rt.loop_body(for_loop).unwrap();
    let x = rt.lookup(body, "x").unwrap();
    let is_one = rt.apply(body, equals, &[Some(x), Some(one)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, is_one).unwrap();
    rt.create_loop_control(case, Control::Break);
    rt.finish_if_block(block).unwrap();
    rt.apply(body, add, &[Some(total), Some(x)], Some("total"));
    rt.finish_for_loop(for_loop, false).unwrap();

    rt.evaluate_branch(branch).unwrap();
    rt.evaluate_branch(branch).unwrap();

    let exported = rt.lookup(branch, "total").unwrap();
    assert_eq!(rt.value_of(exported), &Value::Int(5));
    assert_eq!(rt.value_of(for_loop), &Value::list(ints(&[1])));
}

#[test]
fn break_between_rebinds_in_a_while_loop_exports_the_first_one() {
    let config = RuntimeConfig {
        max_loop_iterations: 100,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config);
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let equals = kernel(&rt, "equals");
    let yes = rt.create_bool(branch, true, None);
    let n = rt.create_int(branch, 0, Some("n"));
    let one = rt.create_int(branch, 1, None);
    let ten = rt.create_int(branch, 10, None);
    let twelve = rt.create_int(branch, 12, None);
    let w = rt.begin_while_loop(branch);
    let body = rt.loop_body(w).unwrap();
    rt.set_while_condition(w, yes).unwrap();
    let stepped = rt.apply(body, add, &[Some(n), Some(one)], Some("n"));
    let done = rt.apply(body, equals, &[Some(stepped), Some(twelve)], None);
    let block = rt.begin_if_block(body);
    let case = rt.add_if_case(block, done).unwrap();
    rt.create_loop_control(case, Control::Break);
    rt.finish_if_block(block).unwrap();
    rt.apply(body, add, &[Some(stepped), Some(ten)], Some("n"));
    rt.finish_while_loop(w).unwrap();

    rt.evaluate_branch(branch).unwrap();

    let exported = rt.lookup(branch, "n").unwrap();
    assert_eq!(rt.value_of(exported), &Value::Int(12));
}
