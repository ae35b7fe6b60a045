//! Frames for if-blocks, loops and nested branches, and the unwinding of
//! `break`, `continue`, `discard` and `return`.

use std::rc::Rc;

use crate::{
    graph::{BranchId, TermId, names::is_hidden_name},
    runtime::{
        Runtime,
        function::Control,
        value::{StateMap, Value},
    },
};

use super::{
    EvalError, Limit, Stack, Step,
    frame::{Flow, Frame, FrameKind, LoopProgress},
};

impl Stack {
    /// Pops the current frame after it ran to its end (`Flow::Normal`) or was
    /// cut short by `flow`, and resumes whatever pushed it.
    pub(super) fn finish_frame(&mut self, rt: &mut Runtime, flow: Flow) -> Result<(), EvalError> {
        if self.top().loop_progress().is_some() {
            return self.end_iteration(rt, flow);
        }
        self.persist_declared_state(rt);
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        log::trace!("pop frame for {}", frame.branch);

        match frame.kind {
            FrameKind::Root => {
                self.activations.truncate(frame.activation);
                Ok(())
            }
            FrameKind::Call { caller, function } => {
                self.complete_call(rt, frame.activation, frame.state, caller, function, flow)
            }
            FrameKind::Case { block, index } => {
                self.store_case_state(rt, block, index, frame.state);
                match flow {
                    Flow::Normal => {
                        self.enter_join(rt, block, index);
                        Ok(())
                    }
                    other => self.deliver(rt, other),
                }
            }
            FrameKind::Nested { term } => {
                self.put_state(rt, term, Value::State(Rc::new(frame.state)));
                match flow {
                    Flow::Normal => {
                        self.store(rt, term, Value::None);
                        self.advance();
                        Ok(())
                    }
                    other => self.deliver(rt, other),
                }
            }
            FrameKind::Join { block, .. } => {
                self.store(rt, block, Value::None);
                self.advance();
                Ok(())
            }
            FrameKind::Exit { .. } => {
                self.advance();
                Ok(())
            }
            FrameKind::Loop(_) => Ok(()),
        }
    }

    /// Passes a control signal raised in the current frame to the construct
    /// that handles it: loops take `break`, `continue`, `discard` and the end
    /// of a while loop, calls take `return`. Frames in between are closed on
    /// the way out.
    pub(super) fn deliver(&mut self, rt: &mut Runtime, flow: Flow) -> Result<(), EvalError> {
        match (&self.top().kind, &flow) {
            (FrameKind::Loop(_), _) => self.end_iteration(rt, flow),
            (FrameKind::Call { .. }, Flow::Return(_)) => self.finish_frame(rt, flow),
            (FrameKind::Call { .. }, _) => {
                // A loop signal that escaped every loop of this body.
                self.advance();
                Ok(())
            }
            _ => self.finish_frame(rt, flow),
        }
    }

    pub(super) fn enter_nested(&mut self, rt: &mut Runtime, term: TermId) -> Step {
        let Some(branch) = rt.term(term).nested else {
            self.store(rt, term, Value::None);
            return Step::Next;
        };
        let state = self.take_state(rt, term).into_state_map();
        let end = rt.branch(branch).len();
        let activation = self.top().activation;
        self.push_frame(
            Frame::new(branch, end, FrameKind::Nested { term }, activation).with_state(state),
        );
        Step::Pushed
    }

    /// Runs the first case whose condition holds, or `else`. Only the chosen
    /// case keeps its state; the others are reset.
    pub(super) fn enter_if_block(&mut self, rt: &mut Runtime, block: TermId) -> Step {
        let cases = rt.if_block_cases(block);
        let chosen = cases.iter().position(|case| match rt.control_of(*case) {
            Some(Control::IfCase) => self.input(rt, *case, 0).is_truthy(),
            _ => true,
        });

        let mut states = self.take_state(rt, block).into_list();
        states.resize(cases.len(), Value::None);
        for (index, state) in states.iter_mut().enumerate() {
            if Some(index) != chosen {
                *state = Value::None;
            }
        }
        let Some((index, branch)) =
            chosen.and_then(|index| Some((index, rt.case_branch(cases[index])?)))
        else {
            self.put_state(rt, block, Value::list(states));
            self.store(rt, block, Value::None);
            return Step::Next;
        };
        let case_state = std::mem::replace(&mut states[index], Value::None).into_state_map();
        self.put_state(rt, block, Value::list(states));

        log::trace!("{} takes case {}", block, index);
        let end = rt.branch(branch).len();
        let activation = self.top().activation;
        self.push_frame(
            Frame::new(branch, end, FrameKind::Case { block, index }, activation)
                .with_state(case_state),
        );
        Step::Pushed
    }

    fn store_case_state(&mut self, rt: &mut Runtime, block: TermId, index: usize, state: StateMap) {
        let mut states = self.take_state(rt, block).into_list();
        if states.len() <= index {
            states.resize(index + 1, Value::None);
        }
        states[index] = Value::State(Rc::new(state));
        self.put_state(rt, block, Value::list(states));
    }

    /// Runs the join terms that pick the finished case's bindings.
    fn enter_join(&mut self, rt: &mut Runtime, block: TermId, index: usize) {
        match rt.exit_branch(block) {
            Some(branch) => {
                let end = rt.branch(branch).len();
                let activation = self.top().activation;
                self.push_frame(Frame::new(
                    branch,
                    end,
                    FrameKind::Join { block, index },
                    activation,
                ));
            }
            None => {
                self.store(rt, block, Value::None);
                self.advance();
            }
        }
    }

    pub(super) fn enter_for_loop(
        &mut self,
        rt: &mut Runtime,
        term: TermId,
    ) -> Result<Step, EvalError> {
        let list = self.input(rt, term, 0);
        let Value::List(items) = list else {
            let message = format!("for loop expects a List, found {}", list.type_name());
            return Err(self.runtime_error(rt, term, message));
        };
        let Some(body) = rt.term(term).nested else {
            self.store(rt, term, Value::list(Vec::new()));
            return Ok(Step::Next);
        };

        let mut states = self.take_state(rt, term).into_list();
        states.resize(items.len(), Value::None);
        if items.is_empty() {
            self.put_state(rt, term, Value::list(states));
            self.store(rt, term, Value::list(Vec::new()));
            self.enter_exits(rt, term, 0);
            return Ok(Step::Pushed);
        }

        let first = std::mem::replace(&mut states[0], Value::None).into_state_map();
        let progress = LoopProgress {
            term,
            items: Some(items),
            iterator_name: rt.loop_iterator_name(term).map(Rc::from),
            iteration: 0,
            outputs: Vec::new(),
            states,
        };
        self.push_loop(rt, body, progress, first);
        Ok(Step::Pushed)
    }

    pub(super) fn enter_while_loop(&mut self, rt: &mut Runtime, term: TermId) -> Step {
        let Some(body) = rt.term(term).nested else {
            self.store(rt, term, Value::None);
            return Step::Next;
        };
        let mut states = self.take_state(rt, term).into_list();
        let first = states
            .first_mut()
            .map(|state| std::mem::replace(state, Value::None).into_state_map())
            .unwrap_or_default();
        let progress = LoopProgress {
            term,
            items: None,
            iterator_name: None,
            iteration: 0,
            outputs: Vec::new(),
            states,
        };
        self.push_loop(rt, body, progress, first);
        Step::Pushed
    }

    fn push_loop(&mut self, rt: &Runtime, body: BranchId, progress: LoopProgress, state: StateMap) {
        let end = body_end(rt, body);
        let activation = self.top().activation;
        self.push_frame(
            Frame::new(body, end, FrameKind::Loop(progress), activation).with_state(state),
        );
    }

    /// Stores each name's value at `signal` under the innermost loop body's
    /// final binding for that name. The carries, the exits and the
    /// iteration output read those final bindings.
    pub(super) fn capture_loop_bindings(&mut self, rt: &Runtime, signal: TermId) {
        let body = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| match frame.kind {
                FrameKind::Loop(_) => Some(Some(frame.branch)),
                FrameKind::Call { .. } => Some(None),
                _ => None,
            })
            .flatten();
        let Some(body) = body else {
            return;
        };
        let Some(owner) = rt.term(signal).owner else {
            return;
        };
        let Some(position) = rt.branch(owner).position(signal) else {
            return;
        };

        let finals: Vec<(String, TermId)> = rt
            .branch(body)
            .names
            .iter()
            .filter(|(name, _)| !is_hidden_name(name))
            .map(|(name, term)| (name.to_string(), *term))
            .collect();
        let activation = self.top().activation;
        for (name, last) in finals {
            let Some(current) = rt.find_name_at(owner, &name, position) else {
                continue;
            };
            if current != last {
                let value = self.lookup(rt, current);
                self.activations[activation].env.insert(last, value);
            }
        }
    }

    /// Closes the current iteration of the loop frame on top. The iteration's
    /// state is recorded even when its output is discarded.
    pub(super) fn end_iteration(&mut self, rt: &mut Runtime, flow: Flow) -> Result<(), EvalError> {
        if flow == Flow::Exit {
            return self.complete_loop(rt, None);
        }
        self.persist_declared_state(rt);
        let output = match flow {
            Flow::Discard => None,
            _ => self.iteration_output(rt),
        };
        let limit = self.config.max_loop_iterations;

        let frame = self.top_mut();
        let state = std::mem::take(&mut frame.state);
        let FrameKind::Loop(progress) = &mut frame.kind else {
            return Ok(());
        };
        let iteration = progress.iteration;
        if progress.states.len() <= iteration {
            progress.states.resize(iteration + 1, Value::None);
        }
        progress.states[iteration] = Value::State(Rc::new(state));
        if let Some(output) = output {
            progress.outputs.push(output);
        }
        progress.iteration += 1;

        let finished = match flow {
            Flow::Break | Flow::Return(_) => true,
            _ => progress
                .items
                .as_ref()
                .is_some_and(|items| progress.iteration >= items.len()),
        };
        if finished {
            let propagate = matches!(flow, Flow::Return(_)).then_some(flow);
            return self.complete_loop(rt, propagate);
        }
        if progress.iteration >= limit {
            return Err(EvalError::LimitExceeded {
                term: progress.term,
                limit: Limit::LoopIterations(limit),
            });
        }

        let next = progress
            .states
            .get_mut(progress.iteration)
            .map(|state| std::mem::replace(state, Value::None).into_state_map())
            .unwrap_or_default();
        frame.state = next;
        frame.pc = 0;
        Ok(())
    }

    /// Final binding of the iterator name in this iteration, for for loops.
    fn iteration_output(&self, rt: &Runtime) -> Option<Value> {
        let frame = self.top();
        let progress = frame.loop_progress()?;
        progress.items.as_ref()?;
        let name = progress.iterator_name.as_ref()?;
        let binding = rt.branch(frame.branch).get(name)?;
        Some(self.lookup(rt, binding))
    }

    /// Pops the loop frame, stores the loop's state and value, then either
    /// keeps unwinding a `return` or runs the exit terms.
    fn complete_loop(&mut self, rt: &mut Runtime, propagate: Option<Flow>) -> Result<(), EvalError> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        let FrameKind::Loop(mut progress) = frame.kind else {
            return Ok(());
        };
        let value = match progress.items {
            Some(_) => Value::list(progress.outputs),
            None => {
                progress.states.truncate(progress.iteration);
                Value::None
            }
        };
        log::trace!(
            "{} finished after {} iterations",
            progress.term,
            progress.iteration
        );
        self.put_state(rt, progress.term, Value::list(progress.states));
        self.store(rt, progress.term, value);

        if let Some(flow) = propagate {
            return self.deliver(rt, flow);
        }
        self.enter_exits(rt, progress.term, progress.iteration);
        Ok(())
    }

    /// Runs the exit terms that export a loop's final bindings.
    fn enter_exits(&mut self, rt: &Runtime, term: TermId, iterations: usize) {
        match rt.exit_branch(term) {
            Some(branch) => {
                let end = rt.branch(branch).len();
                let activation = self.top().activation;
                self.push_frame(Frame::new(
                    branch,
                    end,
                    FrameKind::Exit { iterations },
                    activation,
                ));
            }
            None => self.advance(),
        }
    }
}

/// A loop body runs up to its trailing `#exit` term.
fn body_end(rt: &Runtime, body: BranchId) -> usize {
    let terms = &rt.branch(body).terms;
    match terms.last() {
        Some(last) if rt.control_of(*last) == Some(Control::Joining) => terms.len() - 1,
        _ => terms.len(),
    }
}
