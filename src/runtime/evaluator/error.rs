use std::fmt;

use serde::Serialize;

use crate::{check::StaticErrorKind, graph::TermId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "limit", content = "max", rename_all = "snake_case")]
pub enum Limit {
    CallDepth(usize),
    LoopIterations(usize),
}

/// Why an evaluation request stopped early.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvalError {
    /// The term is structurally invalid and was not run.
    Static { term: TermId, error: StaticErrorKind },
    /// A native function or an explicit `error` call failed. `stack` lists the
    /// call-site terms that were active, innermost first.
    Runtime {
        term: TermId,
        message: String,
        stack: Vec<TermId>,
    },
    LimitExceeded { term: TermId, limit: Limit },
}

impl EvalError {
    /// Term the error is attached to.
    pub fn term(&self) -> TermId {
        match self {
            EvalError::Static { term, .. }
            | EvalError::Runtime { term, .. }
            | EvalError::LimitExceeded { term, .. } => *term,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, EvalError::Static { .. })
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Static { term, error } => {
                write!(f, "{} blocked by static error: {}", term, error.as_str())
            }
            EvalError::Runtime { term, message, .. } => write!(f, "{}: {}", term, message),
            EvalError::LimitExceeded { term, limit } => match limit {
                Limit::CallDepth(max) => {
                    write!(f, "{}: call depth exceeded the limit of {}", term, max)
                }
                Limit::LoopIterations(max) => {
                    write!(f, "{}: loop exceeded the limit of {} iterations", term, max)
                }
            },
        }
    }
}

impl core::error::Error for EvalError {}
