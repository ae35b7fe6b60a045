//! For and while loop construction.
//!
//! A loop term's nested branch (the body) is laid out as:
//!
//! ```text
//! [iterator]           for loops only, bound to the iterator name
//! loop_carry(a0, aN)*  one per outer name the body rebinds
//! ...body terms...
//! #exit                holds loop_exit(a0, aN) terms bound in the outer branch
//! ```
//!
//! A carry yields the outer value on the first iteration and the previous
//! iteration's final binding afterwards. Body references to the outer binding
//! are redirected to the carry when the loop is finished. An exit term yields
//! the outer value if the loop never ran, else the last final binding.

use std::collections::BTreeMap;

use crate::{
    graph::{BranchId, GraphError, TermId, names::is_hidden_name},
    runtime::{Runtime, function::Control, value::Value},
};

const ITERATOR_NAME: &str = "iterator_name";

impl Runtime {
    /// Starts `for <iterator_name> in <list>` at the end of `branch`.
    pub fn begin_for_loop(&mut self, branch: BranchId, iterator_name: &str, list: TermId) -> TermId {
        let function = self.control_function(Control::ForLoop);
        let term = self.create_term(branch, function, &[Some(list)]);
        let body = self.create_nested_branch(term);
        self.set_property(term, ITERATOR_NAME, Value::string(iterator_name));

        let iterator_fn = self.control_function(Control::LoopIterator);
        let iterator = self.create_term(body, iterator_fn, &[]);
        self.bind_name(body, iterator_name, iterator);
        term
    }

    /// Starts a while loop at the end of `branch`. Build the condition inside
    /// [`loop_body`](Self::loop_body), then call
    /// [`set_while_condition`](Self::set_while_condition).
    pub fn begin_while_loop(&mut self, branch: BranchId) -> TermId {
        let function = self.control_function(Control::WhileLoop);
        let term = self.create_term(branch, function, &[]);
        self.create_nested_branch(term);
        term
    }

    /// Appends the check that ends the loop once `condition` is false.
    pub fn set_while_condition(
        &mut self,
        while_loop: TermId,
        condition: TermId,
    ) -> Result<TermId, GraphError> {
        let body = self.loop_body_of_kind(while_loop, Some(Control::WhileLoop))?;
        let function = self.control_function(Control::LoopCondition);
        Ok(self.create_term(body, function, &[Some(condition)]))
    }

    pub fn loop_body(&self, loop_term: TermId) -> Result<BranchId, GraphError> {
        self.loop_body_of_kind(loop_term, None)
    }

    pub fn loop_iterator_name(&self, loop_term: TermId) -> Option<&str> {
        self.term(loop_term).property(ITERATOR_NAME).and_then(Value::as_str)
    }

    /// Completes a for loop. With `rebind_list`, the list's name is rebound to
    /// the loop term, whose value is the list of per-iteration results.
    pub fn finish_for_loop(&mut self, for_loop: TermId, rebind_list: bool) -> Result<(), GraphError> {
        self.loop_body_of_kind(for_loop, Some(Control::ForLoop))?;
        self.finish_loop(for_loop)?;

        if rebind_list {
            let list = self
                .term(for_loop)
                .input(0)
                .ok_or(GraphError::Unnamed { term: for_loop })?;
            let name = self
                .term(list)
                .name
                .clone()
                .ok_or(GraphError::Unnamed { term: list })?;
            let outer = self
                .term(for_loop)
                .owner
                .ok_or(GraphError::Removed { term: for_loop })?;
            self.term_mut(for_loop).name = Some(name.clone());
            self.recompute_binding(outer, &name);
            self.set_property(for_loop, "rebinds", Value::String(name));
        }
        Ok(())
    }

    pub fn finish_while_loop(&mut self, while_loop: TermId) -> Result<(), GraphError> {
        self.loop_body_of_kind(while_loop, Some(Control::WhileLoop))?;
        self.finish_loop(while_loop)
    }

    fn finish_loop(&mut self, loop_term: TermId) -> Result<(), GraphError> {
        let body = self.loop_body(loop_term)?;
        let outer = self
            .term(loop_term)
            .owner
            .ok_or(GraphError::Removed { term: loop_term })?;
        let loop_index = self.branch(outer).position(loop_term).unwrap_or(0);
        let iterator_name = self.loop_iterator_name(loop_term).map(str::to_string);

        let carries: BTreeMap<String, TermId> = self
            .branch(body)
            .terms
            .iter()
            .copied()
            .filter(|t| self.control_of(*t) == Some(Control::LoopCarry))
            .filter_map(|t| self.term(t).name().map(|n| (n.to_string(), t)))
            .collect();

        // (name, binding before the loop, binding at the end of an iteration)
        let carried: Vec<(String, TermId, TermId)> = self
            .branch(body)
            .names
            .iter()
            .filter(|(name, _)| !is_hidden_name(name))
            .filter(|(name, _)| iterator_name.as_deref() != Some(&***name))
            .filter(|(_, last)| self.control_of(**last) != Some(Control::LoopCarry))
            .filter_map(|(name, &last)| {
                let before = self.find_name_at(outer, name, loop_index)?;
                Some((name.to_string(), before, last))
            })
            .collect();

        for (name, before, last) in &carried {
            let carry = match carries.get(name) {
                Some(existing) => *existing,
                None => {
                    let index = self.carry_insert_position(body);
                    let function = self.control_function(Control::LoopCarry);
                    let carry = self.create_term_at(body, index, function, &[]);
                    self.term_mut(carry).name = Some(name.as_str().into());
                    carry
                }
            };
            self.remap_pointers_in_branch(body, *before, Some(carry));
            self.set_inputs(carry, &[Some(*before), Some(*last)]);
            let declared = self.common_declared_type(&[Some(*before), Some(*last)]);
            self.term_mut(carry).declared_type = declared;
        }

        for (name, carry) in &carries {
            if carried.iter().any(|(n, _, _)| n == name) {
                continue;
            }
            let before = self.term(*carry).input(0);
            self.redirect_users(*carry, before);
            self.remove_term(*carry);
        }

        self.rebuild_loop_exits(loop_term, body, outer, loop_index, &carried);
        log::debug!(
            "finished loop {} carrying {:?}",
            loop_term,
            carried.iter().map(|(n, _, _)| n.as_str()).collect::<Vec<_>>()
        );
        Ok(())
    }

    fn rebuild_loop_exits(
        &mut self,
        loop_term: TermId,
        body: BranchId,
        outer: BranchId,
        loop_index: usize,
        carried: &[(String, TermId, TermId)],
    ) {
        let previous = self.find_control_in(body, Control::Joining);
        let is_last = previous.is_some() && self.branch(body).terms.last().copied() == previous;
        let joining = match previous {
            Some(existing) if is_last => existing,
            _ => {
                let function = self.control_function(Control::Joining);
                let term = self.create_term(body, function, &[]);
                self.bind_name(body, "#exit", term);
                term
            }
        };
        let exit_branch = self.create_nested_branch(joining);
        let old_exits: Vec<TermId> = match previous {
            Some(existing) => self
                .term(existing)
                .nested
                .map(|b| self.branch(b).terms.clone())
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let exit_fn = self.control_function(Control::LoopExit);
        for (name, before, last) in carried {
            let exit = self.create_term(exit_branch, exit_fn, &[Some(*before), Some(*last)]);
            let declared = self.common_declared_type(&[Some(*before), Some(*last)]);
            self.term_mut(exit).declared_type = declared;
            self.bind_name(exit_branch, name, exit);
        }

        for old in old_exits {
            let name = self.term(old).name.clone();
            let replacement = name.as_deref().and_then(|name| {
                self.branch(exit_branch)
                    .get(name)
                    .filter(|e| *e != old)
                    .or_else(|| self.find_name_at(outer, name, loop_index))
            });
            self.redirect_users(old, replacement);
            self.remove_term(old);
        }
        if let Some(previous) = previous
            && previous != joining
        {
            self.remove_term(previous);
        }

        for (name, _, _) in carried {
            self.recompute_binding(outer, name);
        }
        self.mark_dirty(loop_term);
    }

    fn carry_insert_position(&self, body: BranchId) -> usize {
        self.branch(body)
            .terms
            .iter()
            .take_while(|t| {
                matches!(
                    self.control_of(**t),
                    Some(Control::LoopIterator | Control::LoopCarry)
                )
            })
            .count()
    }

    fn loop_body_of_kind(
        &self,
        loop_term: TermId,
        kind: Option<Control>,
    ) -> Result<BranchId, GraphError> {
        if !self.contains_term(loop_term) {
            return Err(GraphError::Removed { term: loop_term });
        }
        let control = self.control_of(loop_term);
        let matches = match kind {
            Some(kind) => control == Some(kind),
            None => control.is_some_and(Control::is_loop),
        };
        match (matches, self.term(loop_term).nested) {
            (true, Some(body)) => Ok(body),
            _ => Err(GraphError::WrongKind {
                term: loop_term,
                expected: match kind {
                    Some(Control::ForLoop) => "a for loop",
                    Some(Control::WhileLoop) => "a while loop",
                    _ => "a loop",
                },
            }),
        }
    }
}
