//! Plain text rendering

use crate::runtime::{Runtime, evaluator::EvalError};

use super::{Diagnostic, eval_diagnostic};

impl Diagnostic {
    /// Header line, the located message, an optional hint and, for runtime
    /// failures inside subroutines, the active call sites.
    pub fn render(&self) -> String {
        let mut out = format!(
            "-- {}: {} [{}]\n\n{} {}",
            self.error_type.prefix(),
            self.title.to_lowercase(),
            self.code,
            self.location,
            self.message
        );

        if let Some(hint) = self.hint {
            out.push_str("\n\nHint: ");
            out.push_str(hint);
        }

        if !self.stack.is_empty() {
            out.push_str("\n\nStack trace:");
            for entry in &self.stack {
                out.push_str("\n  at ");
                out.push_str(entry);
            }
        }
        out
    }
}

pub fn render_eval_error(rt: &Runtime, error: &EvalError) -> String {
    eval_diagnostic(rt, error).render()
}

/// Render multiple diagnostics with double newline separation
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}
