//! Runtime context: the term and branch arenas, the type registry, function
//! descriptors and the kernel branch every program scope ultimately sees.
//!
//! # Ownership
//! A [`Runtime`] owns every node of the program graph. Terms and branches are
//! addressed by [`TermId`]/[`BranchId`] and stay in their arena slot until
//! removed, so ids are stable across edits. Nothing is shared between two
//! runtimes, and any number of evaluation [`Stack`](evaluator::Stack)s may run
//! against one runtime, one at a time.
use std::collections::HashMap;

use crate::{
    graph::{Branch, BranchId, GraphError, Term, TermId},
    runtime::{
        builtins::BUILTINS,
        config::RuntimeConfig,
        function::{Control, Function, FunctionBody, FunctionId, InputSpec, NativeFn},
        signature::parse_signature,
        types::{TypeHooks, TypeId, TypeKind, TypeRegistry},
        value::Value,
    },
};

pub mod builtins;
pub mod config;
pub mod evaluator;
pub mod function;
pub mod signature;
pub mod types;
pub mod value;


/// Ids of the functions the kernel branch defines at startup.
#[derive(Debug, Clone)]
struct Kernel {
    branch: BranchId,
    value: TermId,
    controls: HashMap<Control, TermId>,
}

pub struct Runtime {
    pub(crate) terms: Vec<Option<Term>>,
    pub(crate) branches: Vec<Option<Branch>>,
    pub(crate) functions: Vec<Function>,
    pub types: TypeRegistry,
    pub config: RuntimeConfig,
    kernel: Kernel,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut rt = Runtime {
            terms: Vec::new(),
            branches: Vec::new(),
            functions: Vec::new(),
            types: TypeRegistry::new(),
            config,
            kernel: Kernel {
                branch: BranchId::new(0),
                value: TermId::new(0),
                controls: HashMap::new(),
            },
        };
        rt.bootstrap();
        rt
    }

    fn bootstrap(&mut self) {
        let core = self.types.core();
        let kernel = self.alloc_branch(None, None);
        self.kernel.branch = kernel;

        // `value` is the function of every function term, itself included.
        let value_fn = self.push_function(Function {
            name: "value".into(),
            inputs: Vec::new(),
            output: core.any,
            state_type: None,
            variadic: false,
            body: FunctionBody::Control(Control::Value),
            term: None,
        });
        let value_term = self.alloc_term(kernel, 0, None);
        {
            let term = self.term_mut(value_term);
            term.function = Some(value_term);
            term.value = Value::Function(value_fn);
            term.declared_type = core.function;
            term.users.insert(value_term);
            term.needs_update = false;
        }
        self.functions[value_fn.index()].term = Some(value_term);
        self.kernel.value = value_term;
        self.kernel.controls.insert(Control::Value, value_term);
        self.bind_name(kernel, "value", value_term);

        let core_types: Vec<TypeId> = self.types.ids().collect();
        for ty in core_types {
            self.create_type_term(kernel, ty);
        }

        let any = InputSpec::new("value", core.any);
        let controls: Vec<(Control, Vec<InputSpec>, TypeId, Option<TypeId>, bool)> = vec![
            (Control::Branch, vec![], core.any, Some(core.state), false),
            (Control::IfBlock, vec![], core.any, Some(core.list), false),
            (
                Control::IfCase,
                vec![InputSpec::new("condition", core.bool)],
                core.void,
                None,
                false,
            ),
            (Control::Else, vec![], core.void, None, false),
            (Control::Joining, vec![], core.void, None, false),
            (Control::Join, vec![any.clone()], core.any, None, true),
            (
                Control::ForLoop,
                vec![InputSpec::new("list", core.list)],
                core.list,
                Some(core.list),
                false,
            ),
            (Control::WhileLoop, vec![], core.void, Some(core.list), false),
            (Control::LoopIterator, vec![], core.any, None, false),
            (
                Control::LoopCondition,
                vec![InputSpec::new("condition", core.bool)],
                core.bool,
                None,
                false,
            ),
            (
                Control::LoopCarry,
                vec![InputSpec::new("initial", core.any), InputSpec::new("next", core.any)],
                core.any,
                None,
                false,
            ),
            (
                Control::LoopExit,
                vec![InputSpec::new("initial", core.any), InputSpec::new("final", core.any)],
                core.any,
                None,
                false,
            ),
            (Control::Break, vec![], core.void, None, false),
            (Control::Continue, vec![], core.void, None, false),
            (Control::Discard, vec![], core.void, None, false),
            (Control::Return, vec![any.clone().optional()], core.void, None, false),
            (Control::InputPlaceholder, vec![], core.any, None, false),
            (Control::OutputPlaceholder, vec![any.clone().optional()], core.any, None, false),
            (
                Control::DeclaredState,
                vec![InputSpec::new("initial", core.any).optional()],
                core.any,
                Some(core.any),
                false,
            ),
            (Control::UnknownFunction, vec![any.clone().meta()], core.any, None, true),
            (Control::UnknownIdentifier, vec![], core.any, None, false),
            (Control::UnrecognizedExpression, vec![any.meta()], core.any, None, true),
        ];

        for (control, inputs, output, state_type, variadic) in controls {
            let term = self.install_function(
                kernel,
                Function {
                    name: control.name().into(),
                    inputs,
                    output,
                    state_type,
                    variadic,
                    body: FunctionBody::Control(control),
                    term: None,
                },
            );
            self.kernel.controls.insert(control, term);
        }

        for native in BUILTINS {
            if let Err(err) = self.import_function(kernel, native.signature, native.func) {
                panic!("kernel builtin failed to install: {}", err);
            }
        }

        log::debug!(
            "kernel bootstrapped: {} terms, {} functions, {} types",
            self.branch(kernel).len(),
            self.functions.len(),
            self.types.len()
        );
    }

    pub fn kernel(&self) -> BranchId {
        self.kernel.branch
    }

    /// The `value` function every constant and function term applies.
    pub fn value_function(&self) -> TermId {
        self.kernel.value
    }

    pub fn control_function(&self, control: Control) -> TermId {
        self.kernel.controls[&control]
    }

    pub fn term(&self, id: TermId) -> &Term {
        match self.terms.get(id.index()).and_then(Option::as_ref) {
            Some(term) => term,
            None => panic!("term {} does not exist", id),
        }
    }

    pub fn try_term(&self, id: TermId) -> Option<&Term> {
        self.terms.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn term_mut(&mut self, id: TermId) -> &mut Term {
        match self.terms.get_mut(id.index()).and_then(Option::as_mut) {
            Some(term) => term,
            None => panic!("term {} does not exist", id),
        }
    }

    pub fn contains_term(&self, id: TermId) -> bool {
        self.try_term(id).is_some()
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        match self.branches.get(id.index()).and_then(Option::as_ref) {
            Some(branch) => branch,
            None => panic!("branch {} does not exist", id),
        }
    }

    pub fn try_branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn branch_mut(&mut self, id: BranchId) -> &mut Branch {
        match self.branches.get_mut(id.index()).and_then(Option::as_mut) {
            Some(branch) => branch,
            None => panic!("branch {} does not exist", id),
        }
    }

    /// Live terms, in id order.
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter().filter_map(Option::as_ref)
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    /// Descriptor behind a function term, if `term` is one.
    pub fn function_of(&self, term: TermId) -> Option<&Function> {
        self.function_id_of(term).map(|id| self.function(id))
    }

    pub fn function_id_of(&self, term: TermId) -> Option<FunctionId> {
        let term = self.try_term(term)?;
        match term.value {
            Value::Function(id) if term.declared_type == self.types.core().function => Some(id),
            _ => None,
        }
    }

    pub fn is_function(&self, term: TermId) -> bool {
        self.function_id_of(term).is_some()
    }

    pub fn is_type(&self, term: TermId) -> bool {
        self.try_term(term).is_some_and(|t| {
            matches!(t.value, Value::Type(_)) && t.declared_type == self.types.core().type_
        })
    }

    /// Descriptor of the function `term` applies.
    pub fn applied_function(&self, term: TermId) -> Option<&Function> {
        self.term(term).function.and_then(|f| self.function_of(f))
    }

    pub fn control_of(&self, term: TermId) -> Option<Control> {
        self.applied_function(term).and_then(Function::control)
    }

    /// Name of the function `term` applies, as shown in diagnostics.
    pub fn function_name(&self, term: TermId) -> String {
        let term = self.term(term);
        if let Some(Value::String(name)) = term.property("syntax:functionName") {
            return name.to_string();
        }
        match term.function {
            Some(f) => match self.function_of(f) {
                Some(function) => function.name.to_string(),
                None => self.term(f).name().unwrap_or("<anonymous>").to_string(),
            },
            None => "<null>".to_string(),
        }
    }

    pub fn is_stateful(&self, term: TermId) -> bool {
        self.applied_function(term).is_some_and(Function::is_stateful)
    }

    pub(crate) fn push_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId((self.functions.len() - 1) as u32)
    }

    /// Registers `function` and binds a function term for it in `branch`.
    pub fn install_function(&mut self, branch: BranchId, function: Function) -> TermId {
        let name = function.name.clone();
        let id = self.push_function(function);
        let term = self.create_value(branch, Value::Function(id), self.types.core().function);
        self.functions[id.index()].term = Some(term);
        self.bind_name(branch, &name, term);
        term
    }

    /// Declares a native function from a textual signature and binds it in
    /// `branch`. Type names in the signature resolve from `branch`.
    pub fn import_function(
        &mut self,
        branch: BranchId,
        signature: &str,
        func: NativeFn,
    ) -> Result<TermId, GraphError> {
        let parsed = parse_signature(signature).map_err(|error| GraphError::BadSignature {
            signature: signature.to_string(),
            error,
        })?;

        let mut inputs = Vec::with_capacity(parsed.inputs.len());
        for input in &parsed.inputs {
            let ty = self.resolve_type_name(branch, &input.type_name)?;
            inputs.push(InputSpec {
                name: input.name.as_deref().map(Into::into),
                ty,
                optional: input.optional,
                meta: false,
            });
        }
        let output = match &parsed.output {
            Some(name) => self.resolve_type_name(branch, name)?,
            None => self.types.core().void,
        };
        let state_type = match &parsed.state {
            Some(name) => Some(self.resolve_type_name(branch, name)?),
            None => None,
        };

        Ok(self.install_function(
            branch,
            Function {
                name: parsed.name.as_str().into(),
                inputs,
                output,
                state_type,
                variadic: parsed.variadic,
                body: FunctionBody::Native(func),
                term: None,
            },
        ))
    }

    pub fn resolve_type_name(&self, branch: BranchId, name: &str) -> Result<TypeId, GraphError> {
        match self.lookup(branch, name).map(|t| &self.term(t).value) {
            Some(Value::Type(ty)) => Ok(*ty),
            _ => Err(GraphError::UnknownType {
                name: name.to_string(),
            }),
        }
    }

    /// Registers a new type and binds a type term naming it in `branch`.
    pub fn quick_create_type(
        &mut self,
        branch: BranchId,
        name: &str,
        kind: TypeKind,
        hooks: TypeHooks,
    ) -> TermId {
        let ty = self.types.register(name, kind, hooks);
        self.create_type_term(branch, ty)
    }

    fn create_type_term(&mut self, branch: BranchId, ty: TypeId) -> TermId {
        let term = self.create_value(branch, Value::Type(ty), self.types.core().type_);
        let name = self.types.name(ty).to_string();
        self.bind_name(branch, &name, term);
        self.types.get_mut(ty).term = Some(term);
        term
    }

    pub fn type_term(&self, ty: TypeId) -> Option<TermId> {
        self.types.get(ty).term
    }

    /// Type of a type term, if `term` is one.
    pub fn type_of_term(&self, term: TermId) -> Option<TypeId> {
        match self.try_term(term)?.value {
            Value::Type(ty) if self.is_type(term) => Some(ty),
            _ => None,
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
