//! Subroutines: functions whose body is a branch of terms.
//!
//! The function term owns the body branch. The body starts with one
//! `input_placeholder` per declared input and ends with an
//! `output_placeholder` whose input is the result. A subroutine is stateful
//! when anything in its body is, and then each call site keeps the state of
//! its own activation.

use crate::{
    graph::{BranchId, GraphError, TermId},
    runtime::{
        Runtime,
        function::{Control, Function, FunctionBody, InputSpec},
        types::TypeId,
        value::Value,
    },
};

impl Runtime {
    /// Declares a subroutine bound to `name` in `branch` and returns its
    /// function term. Build the body in
    /// [`subroutine_body`](Self::subroutine_body), then call
    /// [`finish_subroutine`](Self::finish_subroutine).
    pub fn declare_subroutine(
        &mut self,
        branch: BranchId,
        name: &str,
        inputs: &[(&str, TypeId)],
        output: TypeId,
    ) -> TermId {
        let body = self.alloc_branch(None, Some(branch));
        let term = self.install_function(
            branch,
            Function {
                name: name.into(),
                inputs: inputs
                    .iter()
                    .map(|(input, ty)| InputSpec::new(input, *ty))
                    .collect(),
                output,
                state_type: None,
                variadic: false,
                body: FunctionBody::Subroutine(body),
                term: None,
            },
        );
        self.branch_mut(body).owning_term = Some(term);
        self.term_mut(term).nested = Some(body);

        let placeholder = self.control_function(Control::InputPlaceholder);
        for (index, (input, ty)) in inputs.iter().enumerate() {
            let p = self.create_term(body, placeholder, &[]);
            self.term_mut(p).declared_type = *ty;
            self.set_property(p, "index", Value::Int(index as i64));
            self.bind_name(body, input, p);
        }
        log::debug!("declared subroutine {} as {}", name, term);
        term
    }

    pub fn subroutine_body(&self, function: TermId) -> Result<BranchId, GraphError> {
        self.function_of(function)
            .and_then(Function::subroutine_body)
            .ok_or(GraphError::WrongKind {
                term: function,
                expected: "a subroutine",
            })
    }

    /// Completes a subroutine: appends the output placeholder reading `result`
    /// and decides whether calls need their own state.
    pub fn finish_subroutine(
        &mut self,
        function: TermId,
        result: Option<TermId>,
    ) -> Result<(), GraphError> {
        let body = self.subroutine_body(function)?;
        let output_fn = self.control_function(Control::OutputPlaceholder);
        match self.find_control_in(body, Control::OutputPlaceholder) {
            Some(existing) => self.set_inputs(existing, &[result]),
            None => {
                self.create_term(body, output_fn, &[result]);
            }
        }

        let stateful = self.branch_has_state(body);
        let state_type = stateful.then(|| self.types.core().state);
        if let Some(id) = self.function_id_of(function) {
            self.function_mut(id).state_type = state_type;
        }

        // Call sites created before the body was known pick up a state slot now.
        let callers: Vec<TermId> = self.term(function).users.iter().copied().collect();
        for caller in callers {
            if self.term(caller).function != Some(function) {
                continue;
            }
            let slot = state_type.map(|ty| self.types.default_value(ty));
            let t = self.term_mut(caller);
            if t.state.is_none() || slot.is_none() {
                t.state = slot;
            }
        }
        log::debug!(
            "finished subroutine {} (stateful: {})",
            self.function_name_of(function),
            stateful
        );
        Ok(())
    }

    fn function_name_of(&self, function: TermId) -> String {
        self.function_of(function)
            .map(|f| f.name.to_string())
            .unwrap_or_default()
    }

    /// Whether any term in `branch`, or in a branch nested below it, keeps state.
    pub fn branch_has_state(&self, branch: BranchId) -> bool {
        self.branch(branch).terms.iter().any(|&term| {
            self.is_stateful(term)
                || (!self.is_function(term)
                    && self.term(term).nested.is_some_and(|n| self.branch_has_state(n)))
        })
    }

    /// Appends `return value` to `branch`.
    pub fn create_return(&mut self, branch: BranchId, value: Option<TermId>) -> TermId {
        let function = self.control_function(Control::Return);
        self.create_term(branch, function, &[value])
    }

    /// Appends a `break`, `continue` or `discard` to `branch`.
    pub fn create_loop_control(&mut self, branch: BranchId, control: Control) -> TermId {
        assert!(
            control.is_loop_control(),
            "{} is not a loop control",
            control.name()
        );
        let function = self.control_function(control);
        self.create_term(branch, function, &[])
    }
}
