//! Diagnostics for static and runtime errors.
//!
//! Every problem becomes a [`Diagnostic`]: an [`ErrorCode`] with its template
//! filled in, the term it is attached to, and a short location such as
//! `[#14 total]`. Diagnostics render as text for people and serialize as JSON
//! for tools.

use serde::Serialize;

use crate::{
    check::{StaticError, StaticErrorKind, check_term},
    graph::{BranchId, TermId},
    runtime::{
        Runtime,
        evaluator::{EvalError, Limit},
        value::Value,
    },
};

pub mod error_code;
mod render;


pub use error_code::{ErrorCode, ErrorType, static_error_code};
pub use render::{render_diagnostics, render_eval_error};

use error_code::{
    BLOCKED_BY_STATIC_ERROR, CALL_DEPTH_EXCEEDED, LOOP_LIMIT_EXCEEDED, RUNTIME_FAILURE,
    TOO_FEW_INPUTS, TOO_MANY_INPUTS,
};

/// Format error message by replacing {} placeholders with values
pub fn format_message(template: &str, values: &[&str]) -> String {
    let mut result = template.to_string();
    for value in values {
        result = result.replacen("{}", value, 1);
    }
    result
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub title: &'static str,
    pub error_type: ErrorType,
    pub term: TermId,
    pub location: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    /// Active call sites, innermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
}

impl Diagnostic {
    pub fn make(rt: &Runtime, code: &ErrorCode, values: &[&str], term: TermId) -> Self {
        Diagnostic {
            code: code.code,
            title: code.title,
            error_type: code.error_type,
            term,
            location: short_location(rt, term),
            message: format_message(code.message, values),
            hint: code.hint,
            stack: Vec::new(),
        }
    }

    pub fn with_stack(mut self, stack: Vec<String>) -> Self {
        self.stack = stack;
        self
    }
}

/// `[#id]`, or `[#id name]` for a named term.
pub fn short_location(rt: &Runtime, term: TermId) -> String {
    match rt.try_term(term).and_then(|t| t.name()) {
        Some(name) => format!("[{} {}]", term, name),
        None => format!("[{}]", term),
    }
}

pub fn static_diagnostic(rt: &Runtime, error: &StaticError) -> Diagnostic {
    let term = error.term;
    let t = rt.term(term);
    let function = rt.function_name(term);
    match error.kind {
        StaticErrorKind::WrongInputCount => {
            let actual = t.inputs.len();
            let (declared, minimum) = rt
                .applied_function(term)
                .map_or((0, 0), |f| (f.inputs.len(), f.min_inputs()));
            if actual > declared {
                let values = [actual.to_string(), function, declared.to_string()];
                Diagnostic::make(rt, &TOO_MANY_INPUTS, &as_strs(&values), term)
            } else {
                let values = [actual.to_string(), function, minimum.to_string()];
                Diagnostic::make(rt, &TOO_FEW_INPUTS, &as_strs(&values), term)
            }
        }
        kind => {
            let value = match kind {
                StaticErrorKind::UnknownFunction | StaticErrorKind::NotAFunction => function,
                StaticErrorKind::NullInput => error.input.unwrap_or(0).to_string(),
                StaticErrorKind::UnknownIdentifier => string_property(rt, term, "syntax:identifier")
                    .or_else(|| t.name().map(str::to_string))
                    .unwrap_or_default(),
                StaticErrorKind::UnrecognizedExpression => {
                    string_property(rt, term, "message").unwrap_or_default()
                }
                StaticErrorKind::LoopControlOutsideLoop => function,
                _ => String::new(),
            };
            Diagnostic::make(rt, static_error_code(kind), &[value.as_str()], term)
        }
    }
}

pub fn eval_diagnostic(rt: &Runtime, error: &EvalError) -> Diagnostic {
    match error {
        EvalError::Static { term, error } => {
            let cause = static_diagnostic(
                rt,
                &StaticError {
                    term: *term,
                    kind: *error,
                    input: first_null_input(rt, *term),
                },
            );
            let target = rt.function_name(*term);
            Diagnostic::make(rt, &BLOCKED_BY_STATIC_ERROR, &[target.as_str(), cause.message.as_str()], *term)
        }
        EvalError::Runtime {
            term,
            message,
            stack,
        } => {
            let stack = stack
                .iter()
                .map(|caller| format!("{} ({})", rt.function_name(*caller), caller))
                .collect();
            Diagnostic::make(rt, &RUNTIME_FAILURE, &[message.as_str()], *term).with_stack(stack)
        }
        EvalError::LimitExceeded { term, limit } => match limit {
            Limit::CallDepth(max) => {
                Diagnostic::make(rt, &CALL_DEPTH_EXCEEDED, &[max.to_string().as_str()], *term)
            }
            Limit::LoopIterations(max) => {
                Diagnostic::make(rt, &LOOP_LIMIT_EXCEEDED, &[max.to_string().as_str()], *term)
            }
        },
    }
}

/// One static error as a single line, location first.
pub fn format_static_error(rt: &Runtime, error: &StaticError) -> String {
    let diagnostic = static_diagnostic(rt, error);
    format!("{} {}", diagnostic.location, diagnostic.message)
}

/// Every static error of `branch` under an `N static errors:` header, or
/// `None` when the branch is clean.
pub fn format_static_errors(rt: &mut Runtime, branch: BranchId) -> Option<String> {
    let errors = rt.static_errors(branch);
    if errors.is_empty() {
        return None;
    }
    let mut out = format!(
        "{} static error{}:\n",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors.iter() {
        out.push_str(&format_static_error(rt, error));
        out.push('\n');
    }
    Some(out)
}

pub fn static_diagnostics(rt: &mut Runtime, branch: BranchId) -> Vec<Diagnostic> {
    let errors = rt.static_errors(branch);
    errors.iter().map(|e| static_diagnostic(rt, e)).collect()
}

/// Message for the first static error of `term` alone.
pub fn get_static_error_message(rt: &Runtime, term: TermId) -> Option<String> {
    check_term(rt, term)
        .first()
        .map(|error| format_static_error(rt, error))
}

/// The most recent runtime error recorded on `term`.
pub fn runtime_error_message(rt: &Runtime, term: TermId) -> Option<&str> {
    rt.try_term(term)?.errors.last().map(String::as_str)
}

fn first_null_input(rt: &Runtime, term: TermId) -> Option<usize> {
    check_term(rt, term).into_iter().find_map(|e| e.input)
}

fn string_property(rt: &Runtime, term: TermId, key: &str) -> Option<String> {
    match rt.term(term).property(key) {
        Some(Value::String(s)) => Some(s.to_string()),
        _ => None,
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
