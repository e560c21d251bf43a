//! 规则条件表达式语言
//!
//! 受限语法：字面量、上下文字段、算术/比较/逻辑运算与固定的内置函数。
//! 没有循环、定义、属性访问，求值代价与表达式长度成线性关系。

pub mod ast;
pub mod condition;
pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod scope;

pub use ast::{ArithOp, CompareOp, Expr, UnaryOp};
pub use condition::{evaluate, Condition};
pub use error::{EvalError, ParseError};
pub use functions::{Builtin, BUILTINS};
pub use parser::{parse, MAX_EXPRESSION_LEN, MAX_NESTING_DEPTH};
pub use scope::Scope;
