use std::collections::BTreeSet;
use std::fmt;

use crate::ast::Expr;
use crate::error::{EvalError, ParseError};
use crate::eval::eval;
use crate::functions;
use crate::parser;
use crate::scope::Scope;

/// 已编译的条件表达式
///
/// 编译一次、求值任意多次；求值只读取作用域，不持有任何可变状态。
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// 解析并编译表达式
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// 求值并按真值判定结果（null、0、空字符串、空列表为假）
    pub fn evaluate<S: Scope + ?Sized>(&self, scope: &S) -> Result<bool, EvalError> {
        Ok(eval(&self.expr, scope)?.truthy())
    }

    /// 失败即不匹配：任何求值错误都返回 false
    pub fn matches<S: Scope + ?Sized>(&self, scope: &S) -> bool {
        match self.evaluate(scope) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::trace!(condition = %self.source, error = %e, "Condition evaluation failed");
                false
            }
        }
    }

    /// 表达式中引用的所有变量名
    pub fn identifiers(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.expr.walk(&mut |node| {
            if let Expr::Field(name) = node {
                names.insert(name.as_str());
            }
        });
        names
    }

    /// 静态检查所有函数调用（函数名与参数个数）
    pub fn check_functions(&self) -> Result<(), EvalError> {
        let mut result = Ok(());
        self.expr.walk(&mut |node| {
            if let Expr::Call { name, args } = node {
                if result.is_ok() {
                    result = functions::check_call(name, args.len());
                }
            }
        });
        result
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// 解析并求值，任何错误都视为不匹配
pub fn evaluate<S: Scope + ?Sized>(expression: &str, scope: &S) -> bool {
    match Condition::compile(expression) {
        Ok(condition) => condition.matches(scope),
        Err(e) => {
            tracing::trace!(condition = %expression, error = %e, "Condition failed to parse");
            false
        }
    }
}
