//! Graph construction: creating branches and terms, wiring inputs and names.
//!
//! `create_term` is the one place a term comes into existence; it registers
//! the new term as a user of its function and of each input, and seeds the
//! call-site state slot from the function's state type.

use std::rc::Rc;

use crate::{
    graph::{Branch, BranchId, Term, TermId},
    runtime::{Runtime, function::Control, types::TypeId, value::Value},
};

impl Runtime {
    pub(crate) fn alloc_branch(
        &mut self,
        owning_term: Option<TermId>,
        outer_scope: Option<BranchId>,
    ) -> BranchId {
        let id = BranchId::new(self.branches.len());
        self.branches.push(Some(Branch {
            id,
            terms: Vec::new(),
            names: Default::default(),
            owning_term,
            outer_scope,
            static_errors: None,
        }));
        id
    }

    /// Allocates a bare term at `index` in `branch` without wiring any edges.
    pub(crate) fn alloc_term(
        &mut self,
        branch: BranchId,
        index: usize,
        function: Option<TermId>,
    ) -> TermId {
        let id = TermId::new(self.terms.len());
        let any = self.types.core().any;
        self.terms.push(Some(Term {
            id,
            name: None,
            owner: Some(branch),
            function,
            inputs: Vec::new(),
            value: Value::None,
            declared_type: any,
            state: None,
            nested: None,
            users: Default::default(),
            needs_update: true,
            errors: Vec::new(),
            properties: Default::default(),
        }));
        self.branch_mut(branch).terms.insert(index, id);
        self.invalidate_static_errors(branch);
        id
    }

    /// A fresh top-level branch whose names fall back to the kernel.
    pub fn new_branch(&mut self) -> BranchId {
        let kernel = self.kernel();
        self.alloc_branch(None, Some(kernel))
    }

    /// Gives `term` an empty nested branch scoped inside the term's owner.
    pub fn create_nested_branch(&mut self, term: TermId) -> BranchId {
        if let Some(existing) = self.term(term).nested {
            return existing;
        }
        let outer = self.term(term).owner;
        let nested = self.alloc_branch(Some(term), outer);
        self.term_mut(term).nested = Some(nested);
        nested
    }

    /// Appends a term applying `function` to `inputs` at the end of `branch`.
    pub fn create_term(
        &mut self,
        branch: BranchId,
        function: TermId,
        inputs: &[Option<TermId>],
    ) -> TermId {
        let index = self.branch(branch).len();
        self.create_term_at(branch, index, function, inputs)
    }

    /// Inserts a term applying `function` to `inputs` at `index` in `branch`.
    ///
    /// # Panics
    /// Panics if `function` is not a function term.
    pub fn create_term_at(
        &mut self,
        branch: BranchId,
        index: usize,
        function: TermId,
        inputs: &[Option<TermId>],
    ) -> TermId {
        let Some(descriptor) = self.function_of(function) else {
            panic!(
                "create_term: {} ({}) is not a function",
                function,
                self.try_term(function)
                    .and_then(Term::name)
                    .unwrap_or("<anonymous>")
            );
        };
        let output = descriptor.output;
        let state = descriptor
            .state_type
            .map(|state_type| self.types.default_value(state_type));
        let initial = self.types.default_value(output);

        let id = self.alloc_term(branch, index, Some(function));
        {
            let term = self.term_mut(id);
            term.inputs = inputs.to_vec();
            term.declared_type = output;
            term.value = initial;
            term.state = state;
        }

        self.term_mut(function).users.insert(id);
        for input in inputs.iter().flatten() {
            self.term_mut(*input).users.insert(id);
        }

        log::trace!(
            "create_term {} = {}({}) in {}",
            id,
            self.function_name(id),
            inputs.len(),
            branch
        );
        id
    }

    /// Applies `function` to `inputs`, optionally binding the result to `name`.
    ///
    /// A type term used as the function produces a value term holding that
    /// type's default. Input count and declared types are checked loosely;
    /// mismatches are logged and left to the static checker.
    pub fn apply(
        &mut self,
        branch: BranchId,
        function: TermId,
        inputs: &[Option<TermId>],
        name: Option<&str>,
    ) -> TermId {
        let term = if let Some(ty) = self.type_of_term(function) {
            let value = self.types.default_value(ty);
            self.create_value(branch, value, ty)
        } else {
            self.warn_on_input_mismatch(function, inputs);
            self.create_term(branch, function, inputs)
        };
        if let Some(name) = name {
            self.bind_name(branch, name, term);
        }
        term
    }

    fn warn_on_input_mismatch(&self, function: TermId, inputs: &[Option<TermId>]) {
        let Some(descriptor) = self.function_of(function) else {
            return;
        };
        if !descriptor.accepts_input_count(inputs.len()) {
            log::warn!(
                "{} called with {} inputs, expects {}",
                descriptor.name,
                inputs.len(),
                descriptor.inputs.len()
            );
        }
        for (index, input) in inputs.iter().enumerate() {
            let (Some(input), Some(spec)) = (input, descriptor.input_spec(index)) else {
                continue;
            };
            let actual = self.term(*input).declared_type;
            if !self.types.fits(actual, spec.ty) {
                log::warn!(
                    "{} input {} has type {}, expects {}",
                    descriptor.name,
                    index,
                    self.types.name(actual),
                    self.types.name(spec.ty)
                );
            }
        }
    }

    /// Like [`apply`](Self::apply), resolving the function by name. An unknown
    /// name produces an `unknown_function` term that remembers the name.
    pub fn apply_named(
        &mut self,
        branch: BranchId,
        function_name: &str,
        inputs: &[Option<TermId>],
        name: Option<&str>,
    ) -> TermId {
        match self.lookup(branch, function_name) {
            Some(f) if self.is_function(f) || self.is_type(f) => {
                self.apply(branch, f, inputs, name)
            }
            _ => {
                log::debug!("unknown function `{}` in {}", function_name, branch);
                let unknown = self.control_function(Control::UnknownFunction);
                let term = self.create_term(branch, unknown, inputs);
                self.set_property(term, "syntax:functionName", Value::string(function_name));
                if let Some(name) = name {
                    self.bind_name(branch, name, term);
                }
                term
            }
        }
    }

    /// Resolves `name` from `branch`, or creates an `unknown_identifier` term.
    pub fn lookup_or_unknown(&mut self, branch: BranchId, name: &str) -> TermId {
        if let Some(found) = self.lookup(branch, name) {
            return found;
        }
        let unknown = self.control_function(Control::UnknownIdentifier);
        let term = self.create_term(branch, unknown, &[]);
        self.set_property(term, "syntax:identifier", Value::string(name));
        term
    }

    /// A placeholder for input the builder could not make sense of.
    pub fn unrecognized_expression(&mut self, branch: BranchId, message: &str) -> TermId {
        let function = self.control_function(Control::UnrecognizedExpression);
        let term = self.create_term(branch, function, &[]);
        self.set_property(term, "message", Value::string(message));
        term
    }

    /// Appends a constant term holding `value` with declared type `ty`.
    pub fn create_value(&mut self, branch: BranchId, value: Value, ty: TypeId) -> TermId {
        let value_fn = self.value_function();
        let term = self.create_term(branch, value_fn, &[]);
        let t = self.term_mut(term);
        t.value = value;
        t.declared_type = ty;
        t.needs_update = false;
        term
    }

    pub fn create_int(&mut self, branch: BranchId, value: i64, name: Option<&str>) -> TermId {
        let ty = self.types.core().int;
        self.create_named_value(branch, Value::Int(value), ty, name)
    }

    pub fn create_float(&mut self, branch: BranchId, value: f64, name: Option<&str>) -> TermId {
        let ty = self.types.core().number;
        self.create_named_value(branch, Value::Float(value), ty, name)
    }

    pub fn create_bool(&mut self, branch: BranchId, value: bool, name: Option<&str>) -> TermId {
        let ty = self.types.core().bool;
        self.create_named_value(branch, Value::Bool(value), ty, name)
    }

    pub fn create_string(&mut self, branch: BranchId, value: &str, name: Option<&str>) -> TermId {
        let ty = self.types.core().string;
        self.create_named_value(branch, Value::string(value), ty, name)
    }

    pub fn create_list(
        &mut self,
        branch: BranchId,
        items: Vec<Value>,
        name: Option<&str>,
    ) -> TermId {
        let ty = self.types.core().list;
        self.create_named_value(branch, Value::list(items), ty, name)
    }

    fn create_named_value(
        &mut self,
        branch: BranchId,
        value: Value,
        ty: TypeId,
        name: Option<&str>,
    ) -> TermId {
        let term = self.create_value(branch, value, ty);
        if let Some(name) = name {
            self.bind_name(branch, name, term);
        }
        term
    }

    /// Replaces the value of a constant term and marks its users dirty.
    pub fn set_value(&mut self, term: TermId, value: Value) {
        self.term_mut(term).value = value;
        self.mark_dirty(term);
        self.term_mut(term).needs_update = false;
    }

    /// Binds `name` to `term` in `branch`; the binding becomes the most recent
    /// one for that name.
    pub fn bind_name(&mut self, branch: BranchId, name: &str, term: TermId) {
        let name: Rc<str> = Rc::from(name);
        let t = self.term_mut(term);
        if t.name.is_none() {
            t.name = Some(name.clone());
        }
        self.branch_mut(branch).names.insert(name, term);
    }

    pub fn set_property(&mut self, term: TermId, key: &str, value: Value) {
        self.term_mut(term).properties.insert(Rc::from(key), value);
    }

    /// Points input `index` of `term` at `input`, padding with nulls if needed.
    pub fn set_input(&mut self, term: TermId, index: usize, input: Option<TermId>) {
        let previous = {
            let t = self.term_mut(term);
            if t.inputs.len() <= index {
                t.inputs.resize(index + 1, None);
            }
            std::mem::replace(&mut t.inputs[index], input)
        };
        if previous == input {
            return;
        }

        if let Some(previous) = previous {
            self.forget_user_if_unused(previous, term);
        }
        if let Some(input) = input {
            self.term_mut(input).users.insert(term);
        }
        self.touch_structure(term);
    }

    /// Replaces every input of `term`.
    pub fn set_inputs(&mut self, term: TermId, inputs: &[Option<TermId>]) {
        let previous = std::mem::replace(&mut self.term_mut(term).inputs, inputs.to_vec());
        for old in previous.into_iter().flatten() {
            self.forget_user_if_unused(old, term);
        }
        for input in inputs.iter().flatten() {
            self.term_mut(*input).users.insert(term);
        }
        self.touch_structure(term);
    }

    /// Drops `user` from `usee`'s users unless it still references `usee`.
    pub(crate) fn forget_user_if_unused(&mut self, usee: TermId, user: TermId) {
        if usee == user {
            return;
        }
        let still_used = self.try_term(user).is_some_and(|u| u.uses(usee));
        if !still_used && let Some(t) = self.terms[usee.index()].as_mut() {
            t.users.remove(&user);
        }
    }

    /// Marks `term` dirty and drops cached static errors around it.
    pub(crate) fn touch_structure(&mut self, term: TermId) {
        if let Some(owner) = self.term(term).owner {
            self.invalidate_static_errors(owner);
        }
        self.mark_dirty(term);
    }

    /// Clears the cached static errors of `branch` and every enclosing branch.
    pub(crate) fn invalidate_static_errors(&mut self, branch: BranchId) {
        let mut current = Some(branch);
        while let Some(id) = current {
            let Some(b) = self.branches.get_mut(id.index()).and_then(Option::as_mut) else {
                break;
            };
            b.static_errors = None;
            current = b
                .owning_term
                .and_then(|owner| self.try_term(owner))
                .and_then(|owner| owner.owner);
        }
    }
}
