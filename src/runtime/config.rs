use std::env;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 1_000_000;

/// Evaluation limits and tracing switches for a [`Runtime`](super::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deepest subroutine nesting a stack may reach.
    pub max_call_depth: usize,
    /// Iterations a single loop activation may run.
    pub max_loop_iterations: usize,
    /// Record every evaluated term on the stack's trace.
    pub trace: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            trace: false,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `TRELLIS_MAX_CALL_DEPTH`,
    /// `TRELLIS_MAX_LOOP_ITERATIONS` and `TRELLIS_TRACE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(depth) = parse_var(&lookup, "TRELLIS_MAX_CALL_DEPTH") {
            config.max_call_depth = depth;
        }
        if let Some(iterations) = parse_var(&lookup, "TRELLIS_MAX_LOOP_ITERATIONS") {
            config.max_loop_iterations = iterations;
        }
        if let Some(trace) = lookup("TRELLIS_TRACE") {
            config.trace = matches!(trace.trim(), "1" | "true" | "yes" | "on");
        }
        config
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: expected a non-negative integer", key, raw);
            None
        }
    }
}
