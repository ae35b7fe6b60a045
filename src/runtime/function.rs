use std::rc::Rc;

use serde::Serialize;

use crate::{
    graph::{BranchId, TermId},
    runtime::{
        types::{TypeId, TypeRegistry},
        value::Value,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FunctionId(pub(crate) u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declared input slot.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub name: Option<Rc<str>>,
    pub ty: TypeId,
    /// A missing (null) input is allowed.
    pub optional: bool,
    /// The slot is structural and never read as a value.
    pub meta: bool,
}

impl InputSpec {
    pub fn new(name: &str, ty: TypeId) -> Self {
        Self {
            name: Some(Rc::from(name)),
            ty,
            optional: false,
            meta: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Arguments handed to a native implementation.
pub struct NativeCall<'a> {
    pub inputs: &'a [Value],
    /// The calling term's state slot, present when the function is stateful.
    pub state: Option<&'a mut Value>,
    pub types: &'a TypeRegistry,
}

impl NativeCall<'_> {
    pub fn arg(&self, index: usize) -> &Value {
        self.inputs.get(index).unwrap_or(&Value::None)
    }
}

pub type NativeFn = fn(&mut NativeCall<'_>) -> Result<Value, String>;

/// Evaluation strategies owned by the evaluator itself rather than by a
/// native function or a subroutine body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Value,
    Branch,
    IfBlock,
    IfCase,
    Else,
    Joining,
    Join,
    ForLoop,
    WhileLoop,
    LoopIterator,
    LoopCondition,
    LoopCarry,
    LoopExit,
    Break,
    Continue,
    Discard,
    Return,
    InputPlaceholder,
    OutputPlaceholder,
    DeclaredState,
    UnknownFunction,
    UnknownIdentifier,
    UnrecognizedExpression,
}

impl Control {
    pub fn name(self) -> &'static str {
        match self {
            Control::Value => "value",
            Control::Branch => "branch",
            Control::IfBlock => "if_block",
            Control::IfCase => "if",
            Control::Else => "else",
            Control::Joining => "#joining",
            Control::Join => "join",
            Control::ForLoop => "for",
            Control::WhileLoop => "while",
            Control::LoopIterator => "loop_iterator",
            Control::LoopCondition => "loop_condition",
            Control::LoopCarry => "loop_carry",
            Control::LoopExit => "loop_exit",
            Control::Break => "break",
            Control::Continue => "continue",
            Control::Discard => "discard",
            Control::Return => "return",
            Control::InputPlaceholder => "input_placeholder",
            Control::OutputPlaceholder => "output_placeholder",
            Control::DeclaredState => "declared_state",
            Control::UnknownFunction => "unknown_function",
            Control::UnknownIdentifier => "unknown_identifier",
            Control::UnrecognizedExpression => "unrecognized_expression",
        }
    }

    pub fn is_loop(self) -> bool {
        matches!(self, Control::ForLoop | Control::WhileLoop)
    }

    pub fn is_case(self) -> bool {
        matches!(self, Control::IfCase | Control::Else)
    }

    pub fn is_loop_control(self) -> bool {
        matches!(self, Control::Break | Control::Continue | Control::Discard)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FunctionBody {
    Native(NativeFn),
    Subroutine(BranchId),
    Control(Control),
}

/// Function descriptor referenced by a function term's value.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Rc<str>,
    pub inputs: Vec<InputSpec>,
    pub output: TypeId,
    /// Type of the per-call-site state slot; `None` for stateless functions.
    pub state_type: Option<TypeId>,
    /// The last declared input may repeat.
    pub variadic: bool,
    pub body: FunctionBody,
    pub term: Option<TermId>,
}

impl Function {
    pub fn is_stateful(&self) -> bool {
        self.state_type.is_some()
    }

    pub fn control(&self) -> Option<Control> {
        match self.body {
            FunctionBody::Control(control) => Some(control),
            _ => None,
        }
    }

    pub fn subroutine_body(&self) -> Option<BranchId> {
        match self.body {
            FunctionBody::Subroutine(branch) => Some(branch),
            _ => None,
        }
    }

    /// Declared slot for input `index`, folding variadic repeats onto the last slot.
    pub fn input_spec(&self, index: usize) -> Option<&InputSpec> {
        if self.variadic && !self.inputs.is_empty() && index >= self.inputs.len() - 1 {
            self.inputs.last()
        } else {
            self.inputs.get(index)
        }
    }

    /// Smallest number of inputs a term may carry. A fixed function needs
    /// everything up to its last required slot. A variadic one only needs its
    /// first slot, and only when that slot is a required fixed input.
    pub fn min_inputs(&self) -> usize {
        if self.variadic {
            return match self.inputs.first() {
                Some(first) if self.inputs.len() > 1 && !first.optional => 1,
                _ => 0,
            };
        }
        self.inputs
            .iter()
            .rposition(|spec| !spec.optional)
            .map_or(0, |index| index + 1)
    }

    pub fn accepts_input_count(&self, count: usize) -> bool {
        count >= self.min_inputs() && (self.variadic || count <= self.inputs.len())
    }
}
