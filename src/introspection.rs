//! Branch dumps for debugging, as indented text or as a serializable tree.

use std::fmt::Write;

use serde::Serialize;

use crate::{
    graph::{BranchId, TermId},
    runtime::{Runtime, function::Control, value::Value},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchSummary {
    pub id: BranchId,
    pub terms: Vec<TermSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSummary {
    pub id: TermId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub function: String,
    pub inputs: Vec<Option<TermId>>,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    pub needs_update: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<BranchSummary>,
}

pub fn summarize_branch(rt: &Runtime, branch: BranchId) -> BranchSummary {
    let terms = rt
        .branch(branch)
        .terms
        .iter()
        .map(|&id| {
            let term = rt.term(id);
            TermSummary {
                id,
                name: term.name().map(str::to_string),
                function: rt.function_name(id),
                inputs: term.inputs.clone(),
                value: term.value.clone(),
                state: term.state.clone(),
                needs_update: term.needs_update,
                errors: term.errors.clone(),
                nested: term.nested.map(|nested| summarize_branch(rt, nested)),
            }
        })
        .collect();
    BranchSummary { id: branch, terms }
}

/// One line per term, nested branches indented below their owner:
///
/// ```text
/// #12 a = 1
/// #14 sum = add(#12, #13) -> 3
/// #15 = for(#11) -> [1, 2]
///   #16 x = loop_iterator() -> 2
/// ```
pub fn dump_branch(rt: &Runtime, branch: BranchId) -> String {
    let mut out = String::new();
    dump_into(rt, branch, 0, &mut out);
    out
}

fn dump_into(rt: &Runtime, branch: BranchId, depth: usize, out: &mut String) {
    for &id in &rt.branch(branch).terms {
        let term = rt.term(id);
        let _ = write!(out, "{}{}", "  ".repeat(depth), id);
        match term.name() {
            Some(name) => {
                let _ = write!(out, " {} = ", name);
            }
            None => out.push_str(" = "),
        }

        if rt.control_of(id) == Some(Control::Value) {
            let _ = write!(out, "{}", term.value);
        } else {
            let inputs: Vec<String> = term
                .inputs
                .iter()
                .map(|input| input.map_or_else(|| "null".to_string(), |i| i.to_string()))
                .collect();
            let _ = write!(
                out,
                "{}({}) -> {}",
                rt.function_name(id),
                inputs.join(", "),
                term.value
            );
        }

        if let Some(state) = &term.state {
            let _ = write!(out, " state={}", state);
        }
        if term.needs_update {
            out.push_str(" *");
        }
        out.push('\n');

        if let Some(nested) = term.nested
            && !rt.is_function(id)
        {
            dump_into(rt, nested, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_lists_terms_and_values() {
        let mut rt = Runtime::new();
        let b = rt.new_branch();
        let add = rt.lookup(rt.kernel(), "add").unwrap();
        let a = rt.create_int(b, 1, Some("a"));
        let c = rt.create_int(b, 2, None);
        let sum = rt.apply(b, add, &[Some(a), Some(c)], Some("sum"));
        rt.evaluate_branch(b).unwrap();

        assert_eq!(
            dump_branch(&rt, b),
            format!(
                "{a} a = 1\n{c} = 2\n{sum} sum = add({a}, {c}) -> 3\n",
                a = a,
                c = c,
                sum = sum
            )
        );
    }

    #[test]
    fn test_dump_marks_dirty_terms_and_null_inputs() {
        let mut rt = Runtime::new();
        let b = rt.new_branch();
        let neg = rt.lookup(rt.kernel(), "neg").unwrap();
        let term = rt.apply(b, neg, &[None], None);

        assert_eq!(dump_branch(&rt, b), format!("{} = neg(null) -> 0.0 *\n", term));
    }

    #[test]
    fn test_summary_nests_container_branches() {
        let mut rt = Runtime::new();
        let b = rt.new_branch();
        let flag = rt.create_bool(b, true, None);
        let block = rt.begin_if_block(b);
        let case = rt.add_if_case(block, flag).unwrap();
        rt.create_int(case, 4, Some("x"));
        rt.finish_if_block(block).unwrap();

        let summary = summarize_branch(&rt, b);
        assert_eq!(summary.terms.len(), 2);
        let contents = summary.terms[1].nested.as_ref().unwrap();
        let functions: Vec<&str> = contents.terms.iter().map(|t| t.function.as_str()).collect();
        assert_eq!(functions, vec!["if", "else", "#joining"]);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["terms"][1]["function"], "if_block");
    }
}
