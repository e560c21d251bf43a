use fincheck_expr::{EvalError, ParseError};
use std::path::PathBuf;
use thiserror::Error;

/// 规则加载错误（启动/重载时致命）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rule source: {0}")]
    Malformed(String),

    #[error("Rule #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("Rule `{id}`: invalid severity `{value}` (expected info, warning or critical)")]
    InvalidSeverity { id: String, value: String },

    #[error("Duplicate rule id `{0}`")]
    DuplicateId(String),

    #[error("Rule `{id}`: invalid condition: {reason}")]
    InvalidCondition { id: String, reason: String },
}

/// 单条规则求值错误（仅内部使用，引擎将其视为不匹配）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("Condition does not compile: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
