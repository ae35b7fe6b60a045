use std::{collections::BTreeSet, fmt, rc::Rc};

use serde::Serialize;

use crate::{graph::TermId, runtime::value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of value shapes a type can describe.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Any,
    Void,
    Int,
    Number,
    Bool,
    String,
    List,
    Ref,
    Type,
    Function,
    State,
    /// Fixed-arity record stored as a `List`; fields are (name, type).
    Compound(Vec<(Rc<str>, TypeId)>),
}

pub type InitialFn = fn() -> Value;
pub type RenderFn = fn(&Value) -> String;

/// Optional per-type overrides for the default value and for rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeHooks {
    pub initial: Option<InitialFn>,
    pub render: Option<RenderFn>,
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: Rc<str>,
    pub kind: TypeKind,
    pub hooks: TypeHooks,
    /// Type term that names this type in some branch, once created.
    pub term: Option<TermId>,
}

/// Ids of the types every runtime registers at startup.
#[derive(Debug, Clone, Copy)]
pub struct CoreTypes {
    pub any: TypeId,
    pub void: TypeId,
    pub int: TypeId,
    pub number: TypeId,
    pub bool: TypeId,
    pub string: TypeId,
    pub list: TypeId,
    pub ref_: TypeId,
    pub type_: TypeId,
    pub function: TypeId,
    pub state: TypeId,
}

pub struct TypeRegistry {
    defs: Vec<TypeDef>,
    coercions: BTreeSet<(TypeId, TypeId)>,
    core: CoreTypes,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut defs = Vec::new();
        let mut add = |name: &str, kind: TypeKind| {
            defs.push(TypeDef {
                name: Rc::from(name),
                kind,
                hooks: TypeHooks::default(),
                term: None,
            });
            TypeId((defs.len() - 1) as u32)
        };

        let core = CoreTypes {
            any: add("any", TypeKind::Any),
            void: add("void", TypeKind::Void),
            int: add("int", TypeKind::Int),
            number: add("number", TypeKind::Number),
            bool: add("bool", TypeKind::Bool),
            string: add("string", TypeKind::String),
            list: add("List", TypeKind::List),
            ref_: add("Ref", TypeKind::Ref),
            type_: add("Type", TypeKind::Type),
            function: add("Function", TypeKind::Function),
            state: add("State", TypeKind::State),
        };

        let mut coercions = BTreeSet::new();
        coercions.insert((core.int, core.number));

        Self {
            defs,
            coercions,
            core,
        }
    }

    pub fn core(&self) -> CoreTypes {
        self.core
    }

    pub fn register(&mut self, name: &str, kind: TypeKind, hooks: TypeHooks) -> TypeId {
        self.defs.push(TypeDef {
            name: Rc::from(name),
            kind,
            hooks,
            term: None,
        });
        TypeId((self.defs.len() - 1) as u32)
    }

    /// Declares that values of `from` may stand in for `to`.
    pub fn add_coercion(&mut self, from: TypeId, to: TypeId) {
        self.coercions.insert((from, to));
    }

    pub fn get(&self, id: TypeId) -> &TypeDef {
        &self.defs[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: TypeId) -> &mut TypeDef {
        &mut self.defs[id.index()]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.defs[id.index()].name
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + use<> {
        (0..self.defs.len() as u32).map(TypeId)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn default_value(&self, id: TypeId) -> Value {
        let def = self.get(id);
        if let Some(initial) = def.hooks.initial {
            return initial();
        }
        match &def.kind {
            TypeKind::Any | TypeKind::Void | TypeKind::Function => Value::None,
            TypeKind::Int => Value::Int(0),
            TypeKind::Number => Value::Float(0.0),
            TypeKind::Bool => Value::Bool(false),
            TypeKind::String => Value::string(""),
            TypeKind::List => Value::list(Vec::new()),
            TypeKind::Ref => Value::Ref(None),
            TypeKind::Type => Value::Type(self.core.any),
            TypeKind::State => Value::empty_state(),
            TypeKind::Compound(fields) => {
                Value::list(fields.iter().map(|(_, ty)| self.default_value(*ty)).collect())
            }
        }
    }

    /// The most specific core type describing a runtime value.
    pub fn type_of_value(&self, value: &Value) -> TypeId {
        match value {
            Value::None => self.core.void,
            Value::Int(_) => self.core.int,
            Value::Float(_) => self.core.number,
            Value::Bool(_) => self.core.bool,
            Value::String(_) => self.core.string,
            Value::List(_) => self.core.list,
            Value::Ref(_) => self.core.ref_,
            Value::Type(_) => self.core.type_,
            Value::Function(_) => self.core.function,
            Value::State(_) => self.core.state,
        }
    }

    /// Whether a term declared as `actual` may feed a slot requiring `required`.
    pub fn fits(&self, actual: TypeId, required: TypeId) -> bool {
        actual == required
            || required == self.core.any
            || actual == self.core.any
            || self.coercions.contains(&(actual, required))
            || matches!(
                (&self.get(actual).kind, &self.get(required).kind),
                (TypeKind::Compound(_), TypeKind::List)
            )
    }

    /// Converts `value` to type `ty`, or `None` if it cannot be represented.
    pub fn cast(&self, value: &Value, ty: TypeId) -> Option<Value> {
        match (&self.get(ty).kind, value) {
            (TypeKind::Any, v) => Some(v.clone()),
            (TypeKind::Void, _) => Some(Value::None),
            (TypeKind::Int, Value::Int(_)) => Some(value.clone()),
            (TypeKind::Number, Value::Int(v)) => Some(Value::Float(*v as f64)),
            (TypeKind::Number, Value::Float(_)) => Some(value.clone()),
            (TypeKind::Bool, Value::Bool(_)) => Some(value.clone()),
            (TypeKind::String, Value::String(_)) => Some(value.clone()),
            (TypeKind::List, Value::List(_)) => Some(value.clone()),
            (TypeKind::Ref, Value::Ref(_)) => Some(value.clone()),
            (TypeKind::Type, Value::Type(_)) => Some(value.clone()),
            (TypeKind::Function, Value::Function(_)) => Some(value.clone()),
            (TypeKind::State, Value::State(_)) => Some(value.clone()),
            (TypeKind::Compound(fields), Value::List(items)) if items.len() == fields.len() => {
                let cast: Option<Vec<Value>> = fields
                    .iter()
                    .zip(items.iter())
                    .map(|((_, field_ty), item)| self.cast(item, *field_ty))
                    .collect();
                cast.map(Value::list)
            }
            _ => None,
        }
    }

    /// Renders a value the way its declared type wants it shown.
    pub fn render(&self, value: &Value, ty: TypeId) -> String {
        match self.get(ty).hooks.render {
            Some(render) => render(value),
            None => match value {
                Value::Type(id) => self.name(*id).to_string(),
                _ => value.to_string(),
            },
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.defs.len())
            .finish()
    }
}
