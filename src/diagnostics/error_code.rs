//! Error codes and message templates.

use serde::Serialize;

use crate::check::StaticErrorKind;

/// Distinguishes problems found by the static checker from failures during
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Static,
    Runtime,
}

impl ErrorType {
    /// Returns the prefix string used in error headers
    pub fn prefix(&self) -> &'static str {
        match self {
            ErrorType::Static => "Static error",
            ErrorType::Runtime => "Runtime error",
        }
    }
}

/// Error code with a `{}` message template and optional hint.
#[derive(Debug, Clone, Copy)]
pub struct ErrorCode {
    pub code: &'static str,
    pub title: &'static str,
    pub error_type: ErrorType,
    pub message: &'static str,
    pub hint: Option<&'static str>,
}

pub const NULL_FUNCTION: ErrorCode = ErrorCode {
    code: "E001",
    title: "NULL FUNCTION",
    error_type: ErrorType::Static,
    message: "NULL function reference",
    hint: None,
};

pub const UNKNOWN_FUNCTION: ErrorCode = ErrorCode {
    code: "E002",
    title: "UNKNOWN FUNCTION",
    error_type: ErrorType::Static,
    message: "Unknown function: {}",
    hint: Some("Declare or import the function before calling it."),
};

pub const NOT_A_FUNCTION: ErrorCode = ErrorCode {
    code: "E003",
    title: "NOT A FUNCTION",
    error_type: ErrorType::Static,
    message: "Not a function: {}",
    hint: None,
};

pub const TOO_MANY_INPUTS: ErrorCode = ErrorCode {
    code: "E004",
    title: "WRONG INPUT COUNT",
    error_type: ErrorType::Static,
    message: "Too many inputs ({}), function {} expects only {}",
    hint: None,
};

pub const TOO_FEW_INPUTS: ErrorCode = ErrorCode {
    code: "E005",
    title: "WRONG INPUT COUNT",
    error_type: ErrorType::Static,
    message: "Too few inputs ({}), function {} expects {}",
    hint: None,
};

pub const NULL_INPUT: ErrorCode = ErrorCode {
    code: "E006",
    title: "NULL INPUT",
    error_type: ErrorType::Static,
    message: "NULL input reference for input {}",
    hint: None,
};

pub const UNKNOWN_IDENTIFIER: ErrorCode = ErrorCode {
    code: "E007",
    title: "UNKNOWN IDENTIFIER",
    error_type: ErrorType::Static,
    message: "Unknown identifier: {}",
    hint: Some("Bind the name before it is used."),
};

pub const UNRECOGNIZED_EXPRESSION: ErrorCode = ErrorCode {
    code: "E008",
    title: "UNRECOGNIZED EXPRESSION",
    error_type: ErrorType::Static,
    message: "Unrecognized expression: {}",
    hint: None,
};

pub const LOOP_CONTROL_OUTSIDE_LOOP: ErrorCode = ErrorCode {
    code: "E009",
    title: "LOOP CONTROL OUTSIDE LOOP",
    error_type: ErrorType::Static,
    message: "{} outside of a loop",
    hint: None,
};

pub const RETURN_OUTSIDE_SUBROUTINE: ErrorCode = ErrorCode {
    code: "E010",
    title: "RETURN OUTSIDE SUBROUTINE",
    error_type: ErrorType::Static,
    message: "return outside of a subroutine",
    hint: None,
};

pub const RUNTIME_FAILURE: ErrorCode = ErrorCode {
    code: "E1000",
    title: "RUNTIME FAILURE",
    error_type: ErrorType::Runtime,
    message: "{}",
    hint: None,
};

pub const BLOCKED_BY_STATIC_ERROR: ErrorCode = ErrorCode {
    code: "E1001",
    title: "BLOCKED BY STATIC ERROR",
    error_type: ErrorType::Runtime,
    message: "Evaluation refused to run {}: {}",
    hint: Some("Fix the static errors in the branch first."),
};

pub const CALL_DEPTH_EXCEEDED: ErrorCode = ErrorCode {
    code: "E1002",
    title: "CALL DEPTH EXCEEDED",
    error_type: ErrorType::Runtime,
    message: "Call depth exceeded the limit of {}.",
    hint: Some("Check for recursion without a base case, or raise TRELLIS_MAX_CALL_DEPTH."),
};

pub const LOOP_LIMIT_EXCEEDED: ErrorCode = ErrorCode {
    code: "E1003",
    title: "LOOP LIMIT EXCEEDED",
    error_type: ErrorType::Runtime,
    message: "Loop ran more than {} iterations.",
    hint: Some("Check the loop condition, or raise TRELLIS_MAX_LOOP_ITERATIONS."),
};

/// Code for a static error kind. Wrong input counts have two codes; this
/// returns the one for too many inputs.
pub fn static_error_code(kind: StaticErrorKind) -> &'static ErrorCode {
    match kind {
        StaticErrorKind::NullFunction => &NULL_FUNCTION,
        StaticErrorKind::UnknownFunction => &UNKNOWN_FUNCTION,
        StaticErrorKind::NotAFunction => &NOT_A_FUNCTION,
        StaticErrorKind::WrongInputCount => &TOO_MANY_INPUTS,
        StaticErrorKind::NullInput => &NULL_INPUT,
        StaticErrorKind::UnknownIdentifier => &UNKNOWN_IDENTIFIER,
        StaticErrorKind::UnrecognizedExpression => &UNRECOGNIZED_EXPRESSION,
        StaticErrorKind::LoopControlOutsideLoop => &LOOP_CONTROL_OUTSIDE_LOOP,
        StaticErrorKind::ReturnOutsideSubroutine => &RETURN_OUTSIDE_SUBROUTINE,
    }
}
