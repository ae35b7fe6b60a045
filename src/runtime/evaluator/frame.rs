use std::{collections::HashMap, rc::Rc};

use crate::{
    graph::{BranchId, TermId},
    runtime::value::{StateMap, Value},
};

/// Values produced during one subroutine activation. Recursive calls run the
/// same body terms, so each activation keeps its own results instead of
/// reading the terms' shared `value` slots.
#[derive(Debug, Default)]
pub(crate) struct Activation {
    pub env: HashMap<TermId, Value>,
    pub args: Vec<Value>,
}

#[derive(Debug)]
pub(crate) struct LoopProgress {
    pub term: TermId,
    /// Items of a for loop; `None` for a while loop.
    pub items: Option<Rc<Vec<Value>>>,
    pub iterator_name: Option<Rc<str>>,
    pub iteration: usize,
    pub outputs: Vec<Value>,
    pub states: Vec<Value>,
}

#[derive(Debug)]
pub(crate) enum FrameKind {
    /// Outermost frame of a request; state lives in the terms' own slots.
    Root,
    Call {
        caller: Option<TermId>,
        function: TermId,
    },
    Case {
        block: TermId,
        index: usize,
    },
    Join {
        block: TermId,
        index: usize,
    },
    Loop(LoopProgress),
    Exit {
        iterations: usize,
    },
    Nested {
        term: TermId,
    },
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub branch: BranchId,
    /// First term this frame runs; the range is `start..end`.
    pub start: usize,
    pub pc: usize,
    pub end: usize,
    pub kind: FrameKind,
    pub activation: usize,
    /// State of the stateful terms in `branch`, keyed by term. Unused by
    /// [`FrameKind::Root`].
    pub state: StateMap,
}

impl Frame {
    pub fn new(branch: BranchId, end: usize, kind: FrameKind, activation: usize) -> Self {
        Frame {
            branch,
            start: 0,
            pc: 0,
            end,
            kind,
            activation,
            state: StateMap::new(),
        }
    }

    pub fn with_state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, FrameKind::Root)
    }

    pub fn loop_progress(&self) -> Option<&LoopProgress> {
        match &self.kind {
            FrameKind::Loop(progress) => Some(progress),
            _ => None,
        }
    }
}

/// How the rest of a frame should run after a term.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Discard,
    /// A while loop's condition was false.
    Exit,
    Return(Value),
}
