use std::rc::Rc;

use crate::{
    check::StaticErrorKind,
    graph::TermId,
    runtime::{
        Runtime,
        function::{Control, Function, FunctionBody, NativeCall},
        value::{StateMap, Value},
    },
};

use super::{
    EvalError, Limit, Stack, Step, blocked,
    frame::{Activation, Flow, Frame, FrameKind},
};

impl Stack {
    /// Calls `function` with `args` and runs it to completion. Stateful
    /// functions start from fresh state and nothing is kept afterwards.
    pub fn call(
        &mut self,
        rt: &mut Runtime,
        function: TermId,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let Some(descriptor) = rt.function_of(function) else {
            return Err(EvalError::Static {
                term: function,
                error: StaticErrorKind::NotAFunction,
            });
        };
        let (body, state_type) = (descriptor.body, descriptor.state_type);
        match body {
            FunctionBody::Native(func) => {
                let mut state = state_type.map(|ty| rt.types.default_value(ty));
                let result = func(&mut NativeCall {
                    inputs: args,
                    state: state.as_mut(),
                    types: &rt.types,
                });
                result.map_err(|message| EvalError::Runtime {
                    term: function,
                    message,
                    stack: Vec::new(),
                })
            }
            FunctionBody::Subroutine(body) => {
                if let Some(first) = rt.static_errors(body).first() {
                    return Err(blocked(first));
                }
                self.push_call(rt, None, function, args.to_vec())?;
                self.run(rt)?;
                Ok(self.result.take().unwrap_or(Value::None))
            }
            FunctionBody::Control(control) => Err(EvalError::Runtime {
                term: function,
                message: format!("{} cannot be called directly", control.name()),
                stack: Vec::new(),
            }),
        }
    }

    pub(super) fn enter_call(&mut self, rt: &mut Runtime, term: TermId) -> Result<Step, EvalError> {
        let args = self.inputs(rt, term);
        let Some(function) = rt.term(term).function else {
            return Err(EvalError::Static {
                term,
                error: StaticErrorKind::NullFunction,
            });
        };
        self.push_call(rt, Some(term), function, args)?;
        Ok(Step::Pushed)
    }

    /// Pushes a frame for the body of `function`. A stateful call site hands
    /// its state slot to the new frame.
    fn push_call(
        &mut self,
        rt: &mut Runtime,
        caller: Option<TermId>,
        function: TermId,
        args: Vec<Value>,
    ) -> Result<(), EvalError> {
        let max = self.config.max_call_depth;
        if self.call_depth >= max {
            return Err(EvalError::LimitExceeded {
                term: caller.unwrap_or(function),
                limit: Limit::CallDepth(max),
            });
        }
        let Some(body) = rt.function_of(function).and_then(Function::subroutine_body) else {
            return Err(EvalError::Static {
                term: caller.unwrap_or(function),
                error: StaticErrorKind::NotAFunction,
            });
        };
        let state = match caller {
            Some(caller) if rt.is_stateful(caller) => self.take_state(rt, caller).into_state_map(),
            _ => StateMap::new(),
        };

        self.activations.push(Activation {
            env: Default::default(),
            args,
        });
        let end = rt.branch(body).len();
        let kind = FrameKind::Call { caller, function };
        let frame = Frame::new(body, end, kind, self.activations.len() - 1).with_state(state);
        self.push_frame(frame);
        self.call_depth += 1;
        Ok(())
    }

    /// Hands the result of a finished call to its call site, or keeps it as
    /// the request's result when the call came from [`call`](Self::call).
    pub(super) fn complete_call(
        &mut self,
        rt: &mut Runtime,
        activation: usize,
        state: StateMap,
        caller: Option<TermId>,
        function: TermId,
        flow: Flow,
    ) -> Result<(), EvalError> {
        self.call_depth = self.call_depth.saturating_sub(1);
        let descriptor = rt.function_of(function);
        let output = descriptor.map(|f| f.output);
        let result = match flow {
            Flow::Return(value) => value,
            _ => descriptor
                .and_then(Function::subroutine_body)
                .and_then(|body| rt.find_control_in(body, Control::OutputPlaceholder))
                .and_then(|placeholder| self.activations[activation].env.get(&placeholder))
                .cloned()
                .unwrap_or(Value::None),
        };
        self.activations.truncate(activation);
        let result = match output.and_then(|ty| rt.types.cast(&result, ty)) {
            Some(cast) => cast,
            None => result,
        };

        match caller {
            Some(caller) => {
                log::trace!("{} returned {}", caller, result);
                if rt.is_stateful(caller) {
                    self.put_state(rt, caller, Value::State(Rc::new(state)));
                }
                self.store(rt, caller, result);
                self.advance();
            }
            None => self.result = Some(result),
        }
        Ok(())
    }
}
