use std::{collections::BTreeMap, fmt, rc::Rc};

use serde::Serialize;

use crate::{
    graph::TermId,
    runtime::{function::FunctionId, types::TypeId},
};

/// Persistent state for one activation, keyed by the stateful term that owns
/// each slot. Nested activations store their own map as a `Value::State`
/// inside the parent's slot, so state forms a tree mirroring the call tree.
pub type StateMap = BTreeMap<TermId, Value>;

/// Runtime value carried by terms, frames and state slots.
///
/// Heap payloads are `Rc`-shared; mutation goes through [`Rc::make_mut`], so
/// cloning a value is a logical copy and never aliases a mutable slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Rc<str>),
    List(Rc<Vec<Value>>),
    Ref(Option<TermId>),
    Type(TypeId),
    Function(FunctionId),
    State(Rc<StateMap>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Int(_) => "int",
            Value::Float(_) => "number",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::List(_) => "List",
            Value::Ref(_) => "Ref",
            Value::Type(_) => "Type",
            Value::Function(_) => "Function",
            Value::State(_) => "State",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Ref(target) => target.is_some(),
            Value::State(map) => !map.is_empty(),
            Value::Type(_) | Value::Function(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&StateMap> {
        match self {
            Value::State(map) => Some(map),
            _ => None,
        }
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn empty_state() -> Self {
        Value::State(Rc::new(StateMap::new()))
    }

    /// Takes the state map out of a `State` value, copying only when shared.
    /// Any other value (including `None` after a reset) yields an empty map.
    pub fn into_state_map(self) -> StateMap {
        match self {
            Value::State(map) => Rc::try_unwrap(map).unwrap_or_else(|shared| (*shared).clone()),
            _ => StateMap::new(),
        }
    }

    /// Takes the items out of a `List` value, copying only when shared.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(items) => Rc::try_unwrap(items).unwrap_or_else(|shared| (*shared).clone()),
            _ => Vec::new(),
        }
    }

    /// Rewrites every `Ref` to `old` into a `Ref` to `new`, descending into
    /// lists and state maps. Returns true if anything changed.
    pub fn remap_refs(&mut self, old: TermId, new: Option<TermId>) -> bool {
        match self {
            Value::Ref(target) if *target == Some(old) => {
                *target = new;
                true
            }
            Value::List(items) => {
                if !items.iter().any(|v| v.mentions(old)) {
                    return false;
                }
                Rc::make_mut(items)
                    .iter_mut()
                    .fold(false, |changed, v| v.remap_refs(old, new) || changed)
            }
            Value::State(map) => {
                if !map.values().any(|v| v.mentions(old)) {
                    return false;
                }
                Rc::make_mut(map)
                    .values_mut()
                    .fold(false, |changed, v| v.remap_refs(old, new) || changed)
            }
            _ => false,
        }
    }

    fn mentions(&self, id: TermId) -> bool {
        match self {
            Value::Ref(target) => *target == Some(id),
            Value::List(items) => items.iter().any(|v| v.mentions(id)),
            Value::State(map) => map.values().any(|v| v.mentions(id)),
            _ => false,
        }
    }

    /// Renders the value without quoting strings.
    pub fn to_string_value(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "null"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Ref(Some(id)) => write!(f, "ref({})", id),
            Value::Ref(None) => write!(f, "ref(null)"),
            Value::Type(id) => write!(f, "<type {}>", id.index()),
            Value::Function(id) => write!(f, "<function {}>", id.index()),
            Value::State(map) => {
                let items: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::string("hi").to_string(), "\"hi\"");
        assert_eq!(Value::string("hi").to_string_value(), "hi");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::Bool(true)]).to_string(),
            "[1, true]"
        );
        assert_eq!(Value::Ref(Some(TermId::new(4))).to_string(), "ref(#4)");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_clone_is_logical_copy() {
        let original = Value::list(vec![Value::Int(1)]);
        let mut copy = original.clone();
        if let Value::List(items) = &mut copy {
            Rc::make_mut(items).push(Value::Int(2));
        }
        assert_eq!(original.as_list().map(|l| l.len()), Some(1));
        assert_eq!(copy.as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_remap_refs_descends_into_containers() {
        let old = TermId::new(1);
        let new = TermId::new(2);
        let mut state = StateMap::new();
        state.insert(TermId::new(9), Value::Ref(Some(old)));
        let mut value = Value::list(vec![
            Value::Ref(Some(old)),
            Value::State(Rc::new(state)),
            Value::Ref(Some(TermId::new(7))),
        ]);

        assert!(value.remap_refs(old, Some(new)));
        assert_eq!(
            value.to_string(),
            "[ref(#2), {#9: ref(#2)}, ref(#7)]"
        );
        assert!(!value.remap_refs(old, Some(new)));
    }

    #[test]
    fn test_into_state_map_of_reset_slot_is_empty() {
        assert!(Value::None.into_state_map().is_empty());
    }
}
