//! Static checking: structural problems that stop a term from being evaluated.
//!
//! Results are cached per branch and dropped whenever the branch, or any
//! branch nested inside it, changes shape.

use std::rc::Rc;

use serde::Serialize;

use crate::{
    graph::{BranchId, TermId},
    runtime::{Runtime, function::Control},
};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticErrorKind {
    NullFunction,
    UnknownFunction,
    NotAFunction,
    WrongInputCount,
    NullInput,
    UnknownIdentifier,
    UnrecognizedExpression,
    LoopControlOutsideLoop,
    ReturnOutsideSubroutine,
}

impl StaticErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StaticErrorKind::NullFunction => "null_function",
            StaticErrorKind::UnknownFunction => "unknown_function",
            StaticErrorKind::NotAFunction => "not_a_function",
            StaticErrorKind::WrongInputCount => "wrong_input_count",
            StaticErrorKind::NullInput => "null_input",
            StaticErrorKind::UnknownIdentifier => "unknown_identifier",
            StaticErrorKind::UnrecognizedExpression => "unrecognized_expression",
            StaticErrorKind::LoopControlOutsideLoop => "loop_control_outside_loop",
            StaticErrorKind::ReturnOutsideSubroutine => "return_outside_subroutine",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticError {
    pub term: TermId,
    pub kind: StaticErrorKind,
    /// Offending input slot, for `null_input`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<usize>,
}

impl StaticError {
    fn new(term: TermId, kind: StaticErrorKind) -> Self {
        Self {
            term,
            kind,
            input: None,
        }
    }
}

/// Problems with `term` alone, in a fixed order. A problem with the function
/// itself or with the input count hides the checks after it.
pub fn check_term(rt: &Runtime, term: TermId) -> Vec<StaticError> {
    let t = rt.term(term);
    let Some(function) = t.function.filter(|f| rt.contains_term(*f)) else {
        return vec![StaticError::new(term, StaticErrorKind::NullFunction)];
    };

    let control = rt.control_of(term);
    if control == Some(Control::UnknownFunction) {
        return vec![StaticError::new(term, StaticErrorKind::UnknownFunction)];
    }

    let Some(descriptor) = rt.function_of(function) else {
        return vec![StaticError::new(term, StaticErrorKind::NotAFunction)];
    };

    if !descriptor.accepts_input_count(t.inputs.len()) {
        return vec![StaticError::new(term, StaticErrorKind::WrongInputCount)];
    }

    let mut errors = Vec::new();
    for (index, input) in t.inputs.iter().enumerate() {
        let present = input.is_some_and(|i| rt.contains_term(i));
        let required = descriptor
            .input_spec(index)
            .is_some_and(|spec| !spec.optional && !spec.meta);
        if !present && required {
            errors.push(StaticError {
                term,
                kind: StaticErrorKind::NullInput,
                input: Some(index),
            });
        }
    }

    match control {
        Some(Control::UnknownIdentifier) => {
            errors.push(StaticError::new(term, StaticErrorKind::UnknownIdentifier));
        }
        Some(Control::UnrecognizedExpression) => {
            errors.push(StaticError::new(term, StaticErrorKind::UnrecognizedExpression));
        }
        Some(c) if c.is_loop_control() && !inside_loop(rt, term) => {
            errors.push(StaticError::new(term, StaticErrorKind::LoopControlOutsideLoop));
        }
        Some(Control::Return) if !inside_subroutine(rt, term) => {
            errors.push(StaticError::new(term, StaticErrorKind::ReturnOutsideSubroutine));
        }
        _ => {}
    }
    errors
}

/// Every problem in `branch` and the branches nested in it, uncached.
pub fn check_branch(rt: &Runtime, branch: BranchId) -> Vec<StaticError> {
    let mut errors = Vec::new();
    for &term in &rt.branch(branch).terms {
        errors.extend(check_term(rt, term));
        if let Some(nested) = rt.term(term).nested {
            errors.extend(check_branch(rt, nested));
        }
    }
    errors
}

/// Terms that own the branches enclosing `term`, innermost first.
fn enclosing_terms(rt: &Runtime, term: TermId) -> impl Iterator<Item = TermId> + '_ {
    let mut branch = rt.term(term).owner;
    std::iter::from_fn(move || {
        let owner = rt.try_branch(branch?)?.owning_term?;
        branch = rt.try_term(owner).and_then(|t| t.owner);
        Some(owner)
    })
}

fn inside_loop(rt: &Runtime, term: TermId) -> bool {
    for owner in enclosing_terms(rt, term) {
        match rt.control_of(owner) {
            Some(c) if c.is_loop() => return true,
            Some(Control::IfCase | Control::Else | Control::IfBlock | Control::Branch) => {}
            _ => return false,
        }
    }
    false
}

fn inside_subroutine(rt: &Runtime, term: TermId) -> bool {
    enclosing_terms(rt, term).any(|owner| {
        rt.function_of(owner)
            .is_some_and(|f| f.subroutine_body().is_some())
    })
}

impl Runtime {
    /// Cached [`check_branch`].
    pub fn static_errors(&mut self, branch: BranchId) -> Rc<Vec<StaticError>> {
        if let Some(cached) = &self.branch(branch).static_errors {
            return cached.clone();
        }
        let terms = self.branch(branch).terms.clone();
        let mut errors = Vec::new();
        for term in terms {
            errors.extend(check_term(self, term));
            if let Some(nested) = self.term(term).nested {
                errors.extend(self.static_errors(nested).iter().cloned());
            }
        }
        let errors = Rc::new(errors);
        self.branch_mut(branch).static_errors = Some(errors.clone());
        errors
    }

    pub fn has_static_errors(&mut self, branch: BranchId) -> bool {
        !self.static_errors(branch).is_empty()
    }

    pub fn count_static_errors(&mut self, branch: BranchId) -> usize {
        self.static_errors(branch).len()
    }
}
