use crate::{
    check::{StaticErrorKind, check_term},
    graph::TermId,
    runtime::{
        Runtime,
        function::{Control, FunctionBody, NativeCall, NativeFn},
        value::Value,
    },
};

use super::{
    EvalError, Stack, Step,
    frame::{Flow, FrameKind},
};

impl Stack {
    /// Runs one term of the current frame. The term is checked again here
    /// because the graph may have been edited since the last full check.
    pub(super) fn step(&mut self, rt: &mut Runtime, term: TermId) -> Result<Step, EvalError> {
        if let Some(error) = check_term(rt, term).first() {
            log::debug!("{} blocked by {}", term, error.kind.as_str());
            return Err(EvalError::Static {
                term,
                error: error.kind,
            });
        }
        let Some(function) = rt.applied_function(term) else {
            return Err(EvalError::Static {
                term,
                error: StaticErrorKind::NotAFunction,
            });
        };
        let body = function.body;
        let stateful = function.is_stateful();
        log::trace!("step {} {}", term, function.name);

        match body {
            FunctionBody::Native(func) => self.call_native(rt, term, func, stateful),
            FunctionBody::Subroutine(_) => self.enter_call(rt, term),
            FunctionBody::Control(control) => self.dispatch_control(rt, term, control),
        }
    }

    fn call_native(
        &mut self,
        rt: &mut Runtime,
        term: TermId,
        func: NativeFn,
        stateful: bool,
    ) -> Result<Step, EvalError> {
        let inputs = self.inputs(rt, term);
        let mut state = stateful.then(|| self.take_state(rt, term));
        let result = func(&mut NativeCall {
            inputs: &inputs,
            state: state.as_mut(),
            types: &rt.types,
        });
        if let Some(state) = state {
            self.put_state(rt, term, state);
        }
        match result {
            Ok(value) => {
                self.store(rt, term, value);
                Ok(Step::Next)
            }
            Err(message) => Err(self.runtime_error(rt, term, message)),
        }
    }

    fn dispatch_control(
        &mut self,
        rt: &mut Runtime,
        term: TermId,
        control: Control,
    ) -> Result<Step, EvalError> {
        let value = match control {
            Control::Value
            | Control::IfCase
            | Control::Else
            | Control::Joining
            | Control::UnknownFunction
            | Control::UnknownIdentifier
            | Control::UnrecognizedExpression => {
                rt.term_mut(term).needs_update = false;
                return Ok(Step::Next);
            }
            Control::Branch => return Ok(self.enter_nested(rt, term)),
            Control::IfBlock => return Ok(self.enter_if_block(rt, term)),
            Control::ForLoop => return self.enter_for_loop(rt, term),
            Control::WhileLoop => return Ok(self.enter_while_loop(rt, term)),
            Control::Break | Control::Continue | Control::Discard => {
                self.capture_loop_bindings(rt, term);
                return Ok(Step::Signal(match control {
                    Control::Break => Flow::Break,
                    Control::Continue => Flow::Continue,
                    _ => Flow::Discard,
                }));
            }
            Control::Return => {
                let value = self.input(rt, term, 0);
                return Ok(Step::Signal(Flow::Return(value)));
            }
            Control::LoopCondition => {
                let holds = self.input(rt, term, 0).is_truthy();
                self.store(rt, term, Value::Bool(holds));
                return Ok(if holds {
                    Step::Next
                } else {
                    Step::Signal(Flow::Exit)
                });
            }
            Control::Join => match self.top().kind {
                FrameKind::Join { index, .. } => self.input(rt, term, index),
                _ => rt.term(term).value.clone(),
            },
            Control::LoopIterator => match self.top().loop_progress() {
                Some(progress) => progress
                    .items
                    .as_ref()
                    .and_then(|items| items.get(progress.iteration))
                    .cloned()
                    .unwrap_or(Value::None),
                None => rt.term(term).value.clone(),
            },
            Control::LoopCarry => {
                let first = self
                    .top()
                    .loop_progress()
                    .is_none_or(|progress| progress.iteration == 0);
                self.input(rt, term, if first { 0 } else { 1 })
            }
            Control::LoopExit => match self.top().kind {
                FrameKind::Exit { iterations } if iterations > 0 => self.input(rt, term, 1),
                _ => self.input(rt, term, 0),
            },
            Control::InputPlaceholder => self.placeholder_argument(rt, term),
            Control::OutputPlaceholder => self.input(rt, term, 0),
            Control::DeclaredState => self.declared_state(rt, term),
        };
        self.store(rt, term, value);
        Ok(Step::Next)
    }

    fn placeholder_argument(&self, rt: &Runtime, term: TermId) -> Value {
        let t = rt.term(term);
        let index = t
            .property("index")
            .and_then(Value::as_int)
            .and_then(|i| usize::try_from(i).ok())
            .unwrap_or(0);
        match self.activations[self.top().activation].args.get(index) {
            Some(arg) => rt
                .types
                .cast(arg, t.declared_type)
                .unwrap_or_else(|| arg.clone()),
            None => t.value.clone(),
        }
    }

    /// Stored state cast to the declared type, else the initial input, else
    /// the type's default.
    fn declared_state(&self, rt: &Runtime, term: TermId) -> Value {
        let declared = rt.term(term).declared_type;
        let stored = self.read_state(rt, term);
        if !stored.is_none()
            && let Some(value) = rt.types.cast(&stored, declared)
        {
            return value;
        }
        match rt.term(term).input(0) {
            Some(initial) => {
                let value = self.lookup(rt, initial);
                rt.types.cast(&value, declared).unwrap_or(value)
            }
            None => rt.types.default_value(declared),
        }
    }
}
