pub mod check;
pub mod diagnostics;
pub mod graph;
pub mod introspection;
pub mod lowering;
pub mod runtime;

pub use check::{StaticError, StaticErrorKind};
pub use graph::{BranchId, TermId};
pub use runtime::{
    Runtime,
    config::RuntimeConfig,
    evaluator::{EvalError, Stack},
    value::Value,
};
