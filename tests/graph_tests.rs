use trellis::{BranchId, Runtime, TermId, Value};

fn kernel(rt: &Runtime, name: &str) -> TermId {
    rt.lookup(rt.kernel(), name).unwrap()
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::Int).collect())
}

/// `a = 2; b = 3; c = a * b + a`
fn arithmetic(rt: &mut Runtime) -> (BranchId, TermId, TermId) {
    let branch = rt.new_branch();
    let add = kernel(rt, "add");
    let mult = kernel(rt, "mult");
    let a = rt.create_int(branch, 2, Some("a"));
    let b = rt.create_int(branch, 3, Some("b"));
    let product = rt.apply(branch, mult, &[Some(a), Some(b)], None);
    let c = rt.apply(branch, add, &[Some(product), Some(a)], Some("c"));
    (branch, a, c)
}

#[test]
fn evaluates_a_straight_line_branch() {
    let mut rt = Runtime::new();
    let (branch, _, c) = arithmetic(&mut rt);

    rt.evaluate_branch(branch).unwrap();

    assert_eq!(rt.value_of(c), &Value::Int(8));
    assert_eq!(rt.lookup(branch, "c"), Some(c));
    rt.verify_users().unwrap();
}

#[test]
fn mixed_numbers_widen_to_float() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let add = kernel(&rt, "add");
    let a = rt.create_int(branch, 1, None);
    let b = rt.create_float(branch, 0.5, None);
    let sum = rt.apply(branch, add, &[Some(a), Some(b)], None);

    rt.evaluate_branch(branch).unwrap();
    assert_eq!(rt.value_of(sum), &Value::Float(1.5));
}

#[test]
fn list_builtins_compose() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let range = kernel(&rt, "range");
    let append = kernel(&rt, "append");
    let length = kernel(&rt, "length");
    let get_index = kernel(&rt, "get_index");

    let zero = rt.create_int(branch, 0, None);
    let three = rt.create_int(branch, 3, None);
    let nine = rt.create_int(branch, 9, None);
    let items = rt.apply(branch, range, &[Some(zero), Some(three)], None);
    let longer = rt.apply(branch, append, &[Some(items), Some(nine)], None);
    let count = rt.apply(branch, length, &[Some(longer)], None);
    let last = rt.apply(branch, get_index, &[Some(longer), Some(three)], None);

    rt.evaluate_branch(branch).unwrap();

    assert_eq!(rt.value_of(items), &ints(&[0, 1, 2]));
    assert_eq!(rt.value_of(longer), &ints(&[0, 1, 2, 9]));
    assert_eq!(rt.value_of(count), &Value::Int(4));
    assert_eq!(rt.value_of(last), &Value::Int(9));
}

#[test]
fn type_terms_construct_default_values() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let string_type = rt.lookup(branch, "string").unwrap();
    let list_type = rt.lookup(branch, "List").unwrap();

    let empty = rt.apply(branch, string_type, &[], Some("s"));
    let items = rt.apply(branch, list_type, &[], Some("items"));

    assert_eq!(rt.value_of(empty), &Value::string(""));
    assert_eq!(rt.value_of(items), &ints(&[]));
}

#[test]
fn evaluate_term_only_touches_stale_dependencies() {
    let mut rt = Runtime::new();
    let (branch, a, c) = arithmetic(&mut rt);
    let counter = kernel(&rt, "counter");
    let ticks = rt.apply(branch, counter, &[], None);

    rt.evaluate_branch(branch).unwrap();
    assert_eq!(rt.value_of(ticks), &Value::Int(1));

    rt.set_value(a, Value::Int(10));
    assert_eq!(rt.evaluate_term(c), Ok(Value::Int(40)));
    assert_eq!(rt.value_of(ticks), &Value::Int(1));
    assert!(!rt.term(c).needs_update);
}

#[test]
fn runtimes_are_independent() {
    let mut first = Runtime::new();
    let mut second = Runtime::new();
    let (b1, _, c1) = arithmetic(&mut first);
    let (b2, a2, c2) = arithmetic(&mut second);

    second.set_value(a2, Value::Int(1));
    first.evaluate_branch(b1).unwrap();
    second.evaluate_branch(b2).unwrap();

    assert_eq!(first.value_of(c1), &Value::Int(8));
    assert_eq!(second.value_of(c2), &Value::Int(4));
}

#[test]
fn error_builtin_fails_with_its_message() {
    let mut rt = Runtime::new();
    let branch = rt.new_branch();
    let error = kernel(&rt, "error");
    let message = rt.create_string(branch, "boom", None);
    let failing = rt.apply(branch, error, &[Some(message)], None);

    let err = rt.evaluate_branch(branch).unwrap_err();
    assert_eq!(err.term(), failing);
    assert_eq!(err.to_string(), format!("{}: boom", failing));
    assert_eq!(rt.term(failing).errors, vec!["boom".to_string()]);
}
