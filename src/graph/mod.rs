//! Term/branch arena.
//!
//! Terms and branches live in the [`Runtime`](crate::runtime::Runtime) arenas
//! and refer to each other by id. Ids are never reused, so an id held across
//! edits either still names the same node or names a removed slot.
//!
//! Edges are kept in both directions: a term's `inputs` point at the terms it
//! reads, and every input's `users` set points back. All mutation goes through
//! the `Runtime` methods in [`building`] and [`editing`], which keep the two
//! directions consistent.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
};

use serde::Serialize;

use crate::{
    check::StaticError,
    runtime::{signature::SignatureError, types::TypeId, value::Value},
};

pub mod building;
pub mod editing;
pub mod names;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TermId(u32);

impl TermId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BranchId(u32);

impl BranchId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

pub type Name = Rc<str>;

/// One node of the program graph: a function applied to inputs.
#[derive(Debug, Clone)]
pub struct Term {
    pub id: TermId,
    pub name: Option<Name>,
    pub owner: Option<BranchId>,
    /// Function term this term applies. Only `None` while bootstrapping.
    pub function: Option<TermId>,
    pub inputs: Vec<Option<TermId>>,
    pub value: Value,
    pub declared_type: TypeId,
    /// Call-site state slot, present when the function is stateful.
    pub state: Option<Value>,
    pub nested: Option<BranchId>,
    pub users: BTreeSet<TermId>,
    pub needs_update: bool,
    /// Messages from runtime failures of this term, oldest first.
    pub errors: Vec<String>,
    pub properties: BTreeMap<Name, Value>,
}

impl Term {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn input(&self, index: usize) -> Option<TermId> {
        self.inputs.get(index).copied().flatten()
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn uses(&self, other: TermId) -> bool {
        self.function == Some(other) || self.inputs.contains(&Some(other))
    }
}

/// Ordered list of terms plus the names bound in it.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub terms: Vec<TermId>,
    /// Most recent binding for each name. Entries may point at a term nested
    /// below this branch when a container exposes the name.
    pub names: BTreeMap<Name, TermId>,
    pub owning_term: Option<TermId>,
    /// Branch searched for names not bound here.
    pub outer_scope: Option<BranchId>,
    pub(crate) static_errors: Option<Rc<Vec<StaticError>>>,
}

impl Branch {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn position(&self, term: TermId) -> Option<usize> {
        self.terms.iter().position(|t| *t == term)
    }

    pub fn get(&self, name: &str) -> Option<TermId> {
        self.names.get(name).copied()
    }
}

/// Misuse of the graph-building API that the caller can recover from.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    BadSignature {
        signature: String,
        error: SignatureError,
    },
    UnknownType {
        name: String,
    },
    WrongKind {
        term: TermId,
        expected: &'static str,
    },
    Unnamed {
        term: TermId,
    },
    Removed {
        term: TermId,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSignature { signature, error } => {
                write!(f, "bad signature `{}`: {}", signature, error)
            }
            Self::UnknownType { name } => write!(f, "unknown type name: {}", name),
            Self::WrongKind { term, expected } => {
                write!(f, "term {} is not {}", term, expected)
            }
            Self::Unnamed { term } => write!(f, "term {} has no name", term),
            Self::Removed { term } => write!(f, "term {} has been removed", term),
        }
    }
}

impl core::error::Error for GraphError {}
