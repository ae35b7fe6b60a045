//! Name resolution.
//!
//! `lookup` answers "what does this name mean now" from a branch's name map
//! and its outer scopes. `find_name_at` answers "what did this name mean just
//! before position N", which is what join and loop-carry construction need:
//! it scans backwards through the branch, looks through containers that expose
//! names (if-block joins, loop exits), then continues in the enclosing branch
//! from the owning term's position.

use crate::{
    graph::{BranchId, TermId},
    runtime::{Runtime, function::Control},
};

/// Names starting with `#` are internal and never exposed or joined.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('#')
}

impl Runtime {
    /// Resolves `name` from `branch` outward through its outer scopes.
    pub fn lookup(&self, branch: BranchId, name: &str) -> Option<TermId> {
        let mut current = Some(branch);
        while let Some(id) = current {
            let b = self.branch(id);
            if let Some(found) = b.get(name) {
                return Some(found);
            }
            current = b.outer_scope;
        }
        None
    }

    /// Resolves `name` as seen just before `position` in `branch`.
    pub fn find_name_at(&self, branch: BranchId, name: &str, position: usize) -> Option<TermId> {
        let b = self.branch(branch);
        let end = position.min(b.len());
        for &term in b.terms[..end].iter().rev() {
            if self.term(term).name() == Some(name) {
                return Some(term);
            }
            if let Some(exposed) = self.exposed_binding(term, name) {
                return Some(exposed);
            }
        }

        if let Some(owner) = b.owning_term
            && let Some(parent) = self.term(owner).owner
        {
            let index = self.branch(parent).position(owner).unwrap_or(0);
            // A subroutine body sees its own function term, which allows recursion.
            let position = if self.is_function(owner) { index + 1 } else { index };
            return self.find_name_at(parent, name, position);
        }

        b.outer_scope.and_then(|outer| self.lookup(outer, name))
    }

    /// The term a container exposes under `name` to the branch it sits in.
    pub fn exposed_binding(&self, term: TermId, name: &str) -> Option<TermId> {
        let exit = self.exit_branch(term)?;
        self.branch(exit).get(name)
    }

    /// Branch of the trailing `#joining`/`#exit` term of a container, which
    /// holds the terms the container exposes to its parent.
    pub fn exit_branch(&self, container: TermId) -> Option<BranchId> {
        let nested = self.term(container).nested?;
        let last = *self.branch(nested).terms.last()?;
        if self.control_of(last) == Some(Control::Joining) {
            self.term(last).nested
        } else {
            None
        }
    }

    /// Recomputes the most recent binding of `name` within `branch` itself,
    /// removing the entry if nothing binds it any more.
    pub(crate) fn recompute_binding(&mut self, branch: BranchId, name: &str) {
        let len = self.branch(branch).len();
        let found = {
            let b = self.branch(branch);
            b.terms[..len].iter().rev().find_map(|&term| {
                if self.term(term).name() == Some(name) {
                    Some(term)
                } else {
                    self.exposed_binding(term, name)
                }
            })
        };
        let names = &mut self.branch_mut(branch).names;
        match found {
            Some(term) => {
                names.insert(name.into(), term);
            }
            None => {
                names.remove(name);
            }
        }
    }
}
