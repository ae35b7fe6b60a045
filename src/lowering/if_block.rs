//! If-block construction.
//!
//! An if-block is a container term whose nested branch holds one case term per
//! condition, a trailing `else` case, and a `#joining` term. Each case term
//! owns the branch that runs when it is chosen. The `#joining` term's branch
//! holds one `join` term per name the block rebinds, each selecting among the
//! per-case bindings by the index of the case that ran. Join terms are bound
//! in the enclosing branch, so code after the block sees the joined value.

use std::collections::BTreeSet;

use crate::{
    graph::{BranchId, GraphError, TermId, names::is_hidden_name},
    runtime::{Runtime, function::Control, types::TypeId},
};

impl Runtime {
    /// Starts an if-block at the end of `branch`.
    pub fn begin_if_block(&mut self, branch: BranchId) -> TermId {
        let function = self.control_function(Control::IfBlock);
        let block = self.create_term(branch, function, &[]);
        self.create_nested_branch(block);
        block
    }

    /// Adds a case guarded by `condition` and returns the branch it runs.
    /// Cases added after `else` or the join are placed before them.
    pub fn add_if_case(
        &mut self,
        block: TermId,
        condition: TermId,
    ) -> Result<BranchId, GraphError> {
        let contents = self.if_block_contents(block)?;
        let index = self.case_insert_position(contents, false);
        let function = self.control_function(Control::IfCase);
        let case = self.create_term_at(contents, index, function, &[Some(condition)]);
        Ok(self.create_nested_branch(case))
    }

    /// Adds (or returns) the `else` case.
    pub fn add_else_case(&mut self, block: TermId) -> Result<BranchId, GraphError> {
        let contents = self.if_block_contents(block)?;
        if let Some(existing) = self.find_control_in(contents, Control::Else) {
            return Ok(self.create_nested_branch(existing));
        }
        let index = self.case_insert_position(contents, true);
        let function = self.control_function(Control::Else);
        let case = self.create_term_at(contents, index, function, &[]);
        Ok(self.create_nested_branch(case))
    }

    /// Case terms of an if-block in evaluation order, `else` last.
    pub fn if_block_cases(&self, block: TermId) -> Vec<TermId> {
        let Some(contents) = self.term(block).nested else {
            return Vec::new();
        };
        self.branch(contents)
            .terms
            .iter()
            .copied()
            .filter(|t| self.control_of(*t).is_some_and(Control::is_case))
            .collect()
    }

    /// Branch run by a case term.
    pub fn case_branch(&self, case: TermId) -> Option<BranchId> {
        self.term(case).nested
    }

    /// Completes the block: adds an empty `else` if there is none and rebuilds
    /// the join terms. Safe to call again after the cases change.
    pub fn finish_if_block(&mut self, block: TermId) -> Result<(), GraphError> {
        let contents = self.if_block_contents(block)?;
        self.add_else_case(block)?;
        let outer = self
            .term(block)
            .owner
            .ok_or(GraphError::Removed { term: block })?;
        let block_index = self.branch(outer).position(block).unwrap_or(0);

        let case_branches: Vec<BranchId> = self
            .if_block_cases(block)
            .into_iter()
            .filter_map(|case| self.term(case).nested)
            .collect();

        // A name is joined if some case binds it and the block can fall back
        // to an outer binding, or if every case binds it.
        let mut candidates = BTreeSet::new();
        for &case in &case_branches {
            for name in self.branch(case).names.keys() {
                if !is_hidden_name(name) {
                    candidates.insert(name.to_string());
                }
            }
        }
        let joined: Vec<String> = candidates
            .into_iter()
            .filter(|name| {
                self.find_name_at(outer, name, block_index).is_some()
                    || case_branches
                        .iter()
                        .all(|case| self.branch(*case).get(name).is_some())
            })
            .collect();

        let joining = match self.find_control_in(contents, Control::Joining) {
            Some(existing) => existing,
            None => {
                let function = self.control_function(Control::Joining);
                let term = self.create_term(contents, function, &[]);
                self.bind_name(contents, "#joining", term);
                term
            }
        };
        let join_branch = self.create_nested_branch(joining);
        let old_joins = self.branch(join_branch).terms.clone();

        let join_fn = self.control_function(Control::Join);
        for name in &joined {
            let fallback = self.find_name_at(outer, name, block_index);
            let inputs: Vec<Option<TermId>> = case_branches
                .iter()
                .map(|case| self.branch(*case).get(name).or(fallback))
                .collect();
            let join = self.create_term(join_branch, join_fn, &inputs);
            let declared = self.common_declared_type(&inputs);
            self.term_mut(join).declared_type = declared;
            self.bind_name(join_branch, name, join);
        }

        // Retire the previous joins: users move to the new join for the same
        // name, or to whatever the name meant before the block.
        for old in old_joins {
            let name = self.term(old).name.clone();
            let replacement = name.as_deref().and_then(|name| {
                self.branch(join_branch)
                    .get(name)
                    .filter(|j| *j != old)
                    .or_else(|| self.find_name_at(outer, name, block_index))
            });
            self.redirect_users(old, replacement);
            self.remove_term(old);
        }

        for name in &joined {
            self.recompute_binding(outer, name);
        }
        log::debug!(
            "finished if-block {} with {} cases, joins: {:?}",
            block,
            case_branches.len(),
            joined
        );
        Ok(())
    }

    fn if_block_contents(&self, block: TermId) -> Result<BranchId, GraphError> {
        if !self.contains_term(block) {
            return Err(GraphError::Removed { term: block });
        }
        match (self.control_of(block), self.term(block).nested) {
            (Some(Control::IfBlock), Some(contents)) => Ok(contents),
            _ => Err(GraphError::WrongKind {
                term: block,
                expected: "an if-block",
            }),
        }
    }

    /// Conditional cases go before `else`; everything goes before `#joining`.
    fn case_insert_position(&self, contents: BranchId, is_else: bool) -> usize {
        let terms = &self.branch(contents).terms;
        terms
            .iter()
            .position(|t| match self.control_of(*t) {
                Some(Control::Joining) => true,
                Some(Control::Else) => !is_else,
                _ => false,
            })
            .unwrap_or(terms.len())
    }

    pub(crate) fn find_control_in(&self, branch: BranchId, control: Control) -> Option<TermId> {
        self.branch(branch)
            .terms
            .iter()
            .copied()
            .find(|t| self.control_of(*t) == Some(control))
    }

    /// The declared type shared by every non-null input, else `any`.
    pub(crate) fn common_declared_type(&self, inputs: &[Option<TermId>]) -> TypeId {
        let mut types = inputs.iter().flatten().map(|t| self.term(*t).declared_type);
        match types.next() {
            Some(first) if types.all(|ty| ty == first) => first,
            _ => self.types.core().any,
        }
    }
}
