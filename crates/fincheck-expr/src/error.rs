use thiserror::Error;

/// 表达式解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Expression is empty")]
    Empty,

    #[error("Expression too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Expression nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

/// 表达式求值错误（只在求值器内部流转，对调用方表现为 false）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Invalid argument to {function}: {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("Type mismatch: {left} {op} {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic result is not finite")]
    NonFinite,
}
