//! Live editing: removing, rewriting and replacing terms in a graph that may
//! already hold evaluated values and state.

use std::collections::{BTreeSet, VecDeque};

use crate::{
    graph::{BranchId, TermId},
    runtime::{Runtime, value::Value},
};

impl Runtime {
    /// Marks `term`, everything downstream of it, and every container holding
    /// one of those terms as needing evaluation.
    pub fn mark_dirty(&mut self, term: TermId) {
        let mut queue = VecDeque::from([term]);
        let mut seen = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(t) = self.terms[id.index()].as_mut() else {
                continue;
            };
            t.needs_update = true;
            queue.extend(t.users.iter().copied().filter(|u| *u != id));
            if let Some(owner) = t.owner
                && let Some(container) = self.branch(owner).owning_term
            {
                queue.push_back(container);
            }
        }
    }

    /// Rewrites every reference to `old` held by `term` (function, inputs and
    /// `Ref` values) into a reference to `new`, keeping user sets consistent.
    pub fn remap_pointers(&mut self, term: TermId, old: TermId, new: Option<TermId>) {
        if new == Some(old) {
            return;
        }
        let mut touched = false;
        {
            let t = self.term_mut(term);
            if t.function == Some(old) {
                t.function = new;
                touched = true;
            }
            for input in t.inputs.iter_mut() {
                if *input == Some(old) {
                    *input = new;
                    touched = true;
                }
            }
            if t.value.remap_refs(old, new) {
                touched = true;
            }
            if let Some(state) = t.state.as_mut() {
                state.remap_refs(old, new);
            }
        }
        if !touched {
            return;
        }
        self.forget_user_if_unused(old, term);
        if let Some(new) = new {
            self.term_mut(new).users.insert(term);
        }
        self.touch_structure(term);
    }

    /// Applies [`remap_pointers`](Self::remap_pointers) to every term in
    /// `branch`, descending into nested branches.
    pub fn remap_pointers_in_branch(&mut self, branch: BranchId, old: TermId, new: Option<TermId>) {
        let terms = self.branch(branch).terms.clone();
        for term in terms {
            self.remap_pointers(term, old, new);
            if let Some(nested) = self.term(term).nested {
                self.remap_pointers_in_branch(nested, old, new);
            }
        }
    }

    /// Points every user of `old` at `new` instead.
    pub fn redirect_users(&mut self, old: TermId, new: Option<TermId>) {
        let users: Vec<TermId> = self.term(old).users.iter().copied().collect();
        for user in users {
            if user != old && Some(user) != new {
                self.remap_pointers(user, old, new);
            }
        }
    }

    /// Deletes `term`. Users keep their input slot, now null, and names bound
    /// to the term fall back to the previous binding.
    pub fn remove_term(&mut self, term: TermId) {
        if !self.contains_term(term) {
            return;
        }
        if let Some(nested) = self.term(term).nested {
            self.remove_branch_contents(nested);
            self.branches[nested.index()] = None;
        }

        self.redirect_users(term, None);

        let (function, inputs, owner) = {
            let t = self.term(term);
            (t.function, t.inputs.clone(), t.owner)
        };
        if let Some(function) = function
            && function != term
            && let Some(f) = self.terms[function.index()].as_mut()
        {
            f.users.remove(&term);
        }
        for input in inputs.into_iter().flatten() {
            if let Some(t) = self.terms[input.index()].as_mut() {
                t.users.remove(&term);
            }
        }

        if let Some(owner) = owner {
            self.branch_mut(owner).terms.retain(|t| *t != term);
            self.invalidate_static_errors(owner);
        }
        self.terms[term.index()] = None;

        if let Some(owner) = owner {
            self.unbind_removed(owner, term);
        }
        log::debug!("removed term {}", term);
    }

    fn unbind_removed(&mut self, owner: BranchId, term: TermId) {
        let stale: Vec<String> = self
            .branch(owner)
            .names
            .iter()
            .filter(|(_, bound)| **bound == term)
            .map(|(n, _)| n.to_string())
            .collect();
        for name in &stale {
            self.recompute_binding(owner, name);
        }

        // Join and exit terms are also bound in the branch holding their container.
        let container = self
            .branch(owner)
            .owning_term
            .and_then(|joining| self.try_term(joining))
            .and_then(|joining| joining.owner)
            .and_then(|nested| self.try_branch(nested))
            .and_then(|nested| nested.owning_term)
            .and_then(|container| self.try_term(container))
            .and_then(|container| container.owner);
        if let Some(outer) = container {
            let stale: Vec<String> = self
                .branch(outer)
                .names
                .iter()
                .filter(|(_, bound)| **bound == term)
                .map(|(n, _)| n.to_string())
                .collect();
            for name in &stale {
                self.recompute_binding(outer, name);
            }
        }
    }

    /// Removes every term of `branch`, innermost first.
    pub(crate) fn remove_branch_contents(&mut self, branch: BranchId) {
        while let Some(&last) = self.branch(branch).terms.last() {
            self.remove_term(last);
        }
    }

    /// Changes the function `term` applies, resetting its state slot if the
    /// new function's state type differs.
    pub fn change_function(&mut self, term: TermId, function: TermId) {
        let Some(descriptor) = self.function_of(function) else {
            panic!("change_function: {} is not a function", function);
        };
        let output = descriptor.output;
        let new_state_type = descriptor.state_type;
        let old_state_type = self.applied_function(term).and_then(|f| f.state_type);

        let old = self.term_mut(term).function.replace(function);
        if let Some(old) = old {
            self.forget_user_if_unused(old, term);
        }
        self.term_mut(function).users.insert(term);

        if new_state_type != old_state_type {
            let state = new_state_type.map(|ty| self.types.default_value(ty));
            self.term_mut(term).state = state;
        }
        self.term_mut(term).declared_type = output;
        self.touch_structure(term);
    }

    /// Rewrites `term` in place to apply `function` to `inputs`.
    pub fn rewrite(&mut self, term: TermId, function: TermId, inputs: &[Option<TermId>]) {
        self.change_function(term, function);
        self.set_inputs(term, inputs);
    }

    /// Replaces `old` with a new term applying `function` to `inputs` at the
    /// same position and under the same name. Every user of `old` is pointed
    /// at the replacement, which inherits `old`'s state when it still fits.
    pub fn replace_term(
        &mut self,
        old: TermId,
        function: TermId,
        inputs: &[Option<TermId>],
    ) -> TermId {
        let (owner, name, state) = {
            let t = self.term(old);
            (t.owner, t.name.clone(), t.state.clone())
        };
        let Some(owner) = owner else {
            panic!("replace_term: {} has no owning branch", old);
        };
        let index = self.branch(owner).position(old).unwrap_or(0);

        let new = self.create_term_at(owner, index, function, inputs);
        if let Some(name) = &name {
            self.term_mut(new).name = Some(name.clone());
            let names = &mut self.branch_mut(owner).names;
            for bound in names.values_mut() {
                if *bound == old {
                    *bound = new;
                }
            }
        }

        let new_state_type = self.applied_function(new).and_then(|f| f.state_type);
        if let (Some(state), Some(state_type)) = (state, new_state_type) {
            let migrated = match self.types.cast(&state, state_type) {
                Some(migrated) => migrated,
                None => {
                    log::debug!("replace_term: state of {} does not fit, reset", old);
                    self.types.default_value(state_type)
                }
            };
            self.term_mut(new).state = Some(migrated);
        }

        self.redirect_users(old, Some(new));
        self.remove_term(old);
        self.mark_dirty(new);
        log::debug!("replaced term {} with {}", old, new);
        new
    }

    /// Checks that inputs and users mirror each other across the whole arena.
    pub fn verify_users(&self) -> Result<(), String> {
        for term in self.terms() {
            let mut referenced: Vec<TermId> = term.inputs.iter().flatten().copied().collect();
            referenced.extend(term.function);
            for usee in referenced {
                let Some(target) = self.try_term(usee) else {
                    return Err(format!("{} references removed term {}", term.id, usee));
                };
                if !target.users.contains(&term.id) {
                    return Err(format!("{} uses {} but is not in its users", term.id, usee));
                }
            }
            for user in &term.users {
                match self.try_term(*user) {
                    Some(u) if u.uses(term.id) => {}
                    Some(_) => {
                        return Err(format!("{} lists user {} that does not use it", term.id, user));
                    }
                    None => return Err(format!("{} lists removed user {}", term.id, user)),
                }
            }
        }
        Ok(())
    }

    /// Value held by a term, for inspection after evaluation.
    pub fn value_of(&self, term: TermId) -> &Value {
        &self.term(term).value
    }
}
