use serde::Serialize;

use crate::{
    graph::TermId,
    runtime::{Runtime, value::Value},
};

use super::Stack;

/// One evaluated term, recorded when [`RuntimeConfig::trace`] is on.
///
/// [`RuntimeConfig::trace`]: crate::runtime::config::RuntimeConfig::trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub term: TermId,
    pub function: String,
    /// Frame depth the term ran at, 1 for the outermost branch.
    pub depth: usize,
    pub value: Value,
}

impl Stack {
    pub(super) fn record(&mut self, rt: &Runtime, term: TermId, value: &Value) {
        let entry = TraceEntry {
            term,
            function: rt.function_name(term),
            depth: self.frames.len(),
            value: value.clone(),
        };
        log::trace!("{}", format_entry(&entry));
        self.trace.push(entry);
    }
}

/// Renders a trace one term per line, indented by frame depth.
pub fn format_trace(entries: &[TraceEntry]) -> String {
    entries
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_entry(entry: &TraceEntry) -> String {
    format!(
        "{:indent$}{} {} = {}",
        "",
        entry.term,
        entry.function,
        entry.value,
        indent = entry.depth.saturating_sub(1) * 2
    )
}
