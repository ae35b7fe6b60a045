//! Frame-based evaluator.
//!
//! A [`Stack`] walks branches term by term. Plain terms run their native
//! function; container terms (if-blocks, loops, nested branches) and
//! subroutine calls push a frame for the branch they run and resume the
//! caller once that frame completes.
//!
//! State follows the frames: the outermost frame reads and writes the terms'
//! own `state` slots, while every nested frame holds a map from term to state
//! that is loaded from, and written back into, the slot of the container or
//! call site that pushed it. Two call sites of one stateful subroutine
//! therefore never share state, and neither do two iterations of a loop.

use std::{collections::HashSet, rc::Rc};

use crate::{
    check::StaticError,
    graph::{BranchId, TermId},
    runtime::{
        Runtime,
        config::RuntimeConfig,
        function::Control,
        value::Value,
    },
};

mod control_flow;
mod dispatch;
pub mod error;
mod frame;
mod function_call;
pub mod trace;

#[cfg(test)]
mod dispatch_test;
#[cfg(test)]
mod function_call_test;

pub use error::{EvalError, Limit};
pub use trace::TraceEntry;

use frame::{Activation, Flow, Frame, FrameKind};

/// What the run loop does after a term has been dispatched.
pub(crate) enum Step {
    Next,
    Pushed,
    Signal(Flow),
}

pub struct Stack {
    frames: Vec<Frame>,
    activations: Vec<Activation>,
    config: RuntimeConfig,
    trace: Vec<TraceEntry>,
    result: Option<Value>,
    call_depth: usize,
}

impl Stack {
    pub fn new(config: RuntimeConfig) -> Self {
        Stack {
            frames: Vec::new(),
            activations: Vec::new(),
            config,
            trace: Vec::new(),
            result: None,
            call_depth: 0,
        }
    }

    /// Number of active frames; zero between requests.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.trace)
    }

    /// Evaluates every term of `branch` from the start. Nothing runs if the
    /// branch, or anything nested in it, has a static error.
    pub fn evaluate_branch(&mut self, rt: &mut Runtime, branch: BranchId) -> Result<(), EvalError> {
        if let Some(first) = rt.static_errors(branch).first() {
            return Err(blocked(first));
        }
        log::debug!("evaluating {} ({} terms)", branch, rt.branch(branch).len());
        let end = rt.branch(branch).len();
        self.push_root(branch, 0, end);
        self.run(rt)
    }

    /// Evaluates `term` after every input it transitively depends on that is
    /// marked as needing an update, and returns its new value.
    pub fn evaluate_term(&mut self, rt: &mut Runtime, term: TermId) -> Result<Value, EvalError> {
        for t in dependency_order(rt, term) {
            let Some(owner) = rt.term(t).owner else {
                continue;
            };
            let Some(index) = rt.branch(owner).position(t) else {
                continue;
            };
            self.push_root(owner, index, index + 1);
            self.run(rt)?;
        }
        Ok(rt.term(term).value.clone())
    }

    fn push_root(&mut self, branch: BranchId, start: usize, end: usize) {
        self.activations.push(Activation::default());
        let mut frame = Frame::new(branch, end, FrameKind::Root, self.activations.len() - 1);
        frame.start = start;
        frame.pc = start;
        self.frames.push(frame);
    }

    pub(crate) fn run(&mut self, rt: &mut Runtime) -> Result<(), EvalError> {
        let result = self.run_inner(rt);
        if result.is_err() {
            self.frames.clear();
            self.activations.clear();
            self.call_depth = 0;
        }
        result
    }

    fn run_inner(&mut self, rt: &mut Runtime) -> Result<(), EvalError> {
        while let Some(frame) = self.frames.last() {
            if frame.pc >= frame.end {
                self.finish_frame(rt, Flow::Normal)?;
                continue;
            }
            let term = rt.branch(frame.branch).terms[frame.pc];
            match self.step(rt, term)? {
                Step::Next => self.advance(),
                Step::Pushed => {}
                Step::Signal(flow) => self.deliver(rt, flow)?,
            }
        }
        Ok(())
    }

    fn top(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn advance(&mut self) {
        self.top_mut().pc += 1;
    }

    fn push_frame(&mut self, frame: Frame) {
        log::trace!("push {:?} frame for {}", frame.kind, frame.branch);
        self.frames.push(frame);
    }

    /// Value of `term` as seen from the current activation.
    fn lookup(&self, rt: &Runtime, term: TermId) -> Value {
        let activation = &self.activations[self.top().activation];
        match activation.env.get(&term) {
            Some(value) => value.clone(),
            None => rt
                .try_term(term)
                .map(|t| t.value.clone())
                .unwrap_or(Value::None),
        }
    }

    fn input(&self, rt: &Runtime, term: TermId, index: usize) -> Value {
        match rt.term(term).input(index) {
            Some(input) => self.lookup(rt, input),
            None => Value::None,
        }
    }

    fn inputs(&self, rt: &Runtime, term: TermId) -> Vec<Value> {
        (0..rt.term(term).inputs.len())
            .map(|index| self.input(rt, term, index))
            .collect()
    }

    fn store(&mut self, rt: &mut Runtime, term: TermId, value: Value) {
        if self.config.trace {
            self.record(rt, term, &value);
        }
        let activation = self.top().activation;
        self.activations[activation].env.insert(term, value.clone());
        let t = rt.term_mut(term);
        t.value = value;
        t.needs_update = false;
    }

    /// State slot of `term` in the current frame, removed from the frame until
    /// [`put_state`](Self::put_state) returns it.
    fn take_state(&mut self, rt: &Runtime, term: TermId) -> Value {
        if self.top().is_root() {
            if let Some(state) = &rt.term(term).state {
                return state.clone();
            }
        } else if let Some(state) = self.top_mut().state.remove(&term) {
            return state;
        }
        fresh_state(rt, term)
    }

    fn read_state(&self, rt: &Runtime, term: TermId) -> Value {
        let stored = if self.top().is_root() {
            rt.term(term).state.as_ref()
        } else {
            self.top().state.get(&term)
        };
        stored.cloned().unwrap_or_else(|| fresh_state(rt, term))
    }

    fn put_state(&mut self, rt: &mut Runtime, term: TermId, state: Value) {
        if self.top().is_root() {
            rt.term_mut(term).state = Some(state);
        } else {
            self.top_mut().state.insert(term, state);
        }
    }

    /// Writes the latest binding of every declared state name in the current
    /// frame's branch into that declaration's state slot.
    fn persist_declared_state(&mut self, rt: &mut Runtime) {
        let (branch, start, end) = (self.top().branch, self.top().start, self.top().end);
        let declarations: Vec<(TermId, Rc<str>)> = rt.branch(branch).terms[start..end]
            .iter()
            .filter(|t| rt.control_of(**t) == Some(Control::DeclaredState))
            .filter_map(|t| rt.term(*t).name.clone().map(|name| (*t, name)))
            .collect();
        for (declaration, name) in declarations {
            let latest = rt.branch(branch).get(&name).unwrap_or(declaration);
            let value = self.lookup(rt, latest);
            self.put_state(rt, declaration, value);
        }
    }

    /// Attaches `message` to `term` and builds the error that unwinds the
    /// whole stack.
    fn runtime_error(&self, rt: &mut Runtime, term: TermId, message: String) -> EvalError {
        log::debug!("runtime error at {}: {}", term, message);
        rt.term_mut(term).errors.push(message.clone());
        let stack = self
            .frames
            .iter()
            .rev()
            .filter_map(|frame| match frame.kind {
                FrameKind::Call { caller, .. } => caller,
                _ => None,
            })
            .collect();
        EvalError::Runtime {
            term,
            message,
            stack,
        }
    }
}

fn blocked(error: &StaticError) -> EvalError {
    EvalError::Static {
        term: error.term,
        error: error.kind,
    }
}

fn fresh_state(rt: &Runtime, term: TermId) -> Value {
    rt.applied_function(term)
        .and_then(|f| f.state_type)
        .map(|ty| rt.types.default_value(ty))
        .unwrap_or(Value::None)
}

/// `term` and the stale inputs it transitively depends on, inputs first.
fn dependency_order(rt: &Runtime, term: TermId) -> Vec<TermId> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut pending = vec![(term, false)];
    while let Some((t, expanded)) = pending.pop() {
        if expanded {
            order.push(t);
            continue;
        }
        if !seen.insert(t) {
            continue;
        }
        pending.push((t, true));
        for input in rt.term(t).inputs.iter().flatten().rev() {
            let stale = rt.try_term(*input).is_some_and(|i| i.needs_update);
            if stale && !seen.contains(input) {
                pending.push((*input, false));
            }
        }
    }
    order
}

impl Runtime {
    /// Evaluates `branch` on a fresh [`Stack`].
    pub fn evaluate_branch(&mut self, branch: BranchId) -> Result<(), EvalError> {
        Stack::new(self.config.clone()).evaluate_branch(self, branch)
    }

    /// Evaluates `term` and its stale dependencies on a fresh [`Stack`].
    pub fn evaluate_term(&mut self, term: TermId) -> Result<Value, EvalError> {
        Stack::new(self.config.clone()).evaluate_term(self, term)
    }

    /// Calls `function` with explicit arguments on a fresh [`Stack`].
    pub fn call(&mut self, function: TermId, args: &[Value]) -> Result<Value, EvalError> {
        Stack::new(self.config.clone()).call(self, function, args)
    }
}
