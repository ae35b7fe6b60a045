//! Declared state: `state <type> <name> = <initial>`.
//!
//! A `declared_state` term reads its slot when evaluated: the stored value
//! cast to the declared type, else the initial input, else the type default.
//! When the enclosing activation finishes, whatever the name is bound to at
//! the end of the branch is written back to the slot.

use crate::{
    graph::{BranchId, TermId},
    runtime::{Runtime, function::Control, types::TypeId, value::Value},
};

impl Runtime {
    pub fn declare_state(
        &mut self,
        branch: BranchId,
        name: &str,
        ty: TypeId,
        initial: Option<TermId>,
    ) -> TermId {
        let function = self.control_function(Control::DeclaredState);
        let term = self.create_term(branch, function, &[initial]);
        let default = self.types.default_value(ty);
        let t = self.term_mut(term);
        t.declared_type = ty;
        t.value = default;
        self.bind_name(branch, name, term);
        term
    }

    /// Stored slot value of a declared-state term evaluated at the top level.
    pub fn declared_state_value(&self, term: TermId) -> Option<&Value> {
        match self.control_of(term) {
            Some(Control::DeclaredState) => self.term(term).state.as_ref(),
            _ => None,
        }
    }
}
