use fincheck_types::Transaction;
use tracing::debug;

use crate::context::RuleContext;
use crate::loader::RuleSet;
use crate::model::Issue;

/// 合理性检查引擎
///
/// 构造后不可变；`evaluate` 只读取规则集与上下文，可在多个线程中并发调用。
#[derive(Debug, Clone, Default)]
pub struct PlausibilityEngine {
    rules: RuleSet,
}

impl PlausibilityEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// 按声明顺序求值所有规则，返回命中的问题列表
    ///
    /// 单条规则求值失败时记录诊断日志并视为不匹配，不会影响其他规则。
    pub fn evaluate(&self, context: &RuleContext) -> Vec<Issue> {
        self.rules
            .iter()
            .filter_map(|rule| match rule.evaluate(context) {
                Ok(true) => Some(Issue::from(rule)),
                Ok(false) => None,
                Err(e) => {
                    debug!(rule_id = %rule.id, error = %e, "Rule evaluation failed, treated as no match");
                    None
                }
            })
            .collect()
    }

    /// 由交易记录构造上下文并求值
    pub fn check(&self, transaction: &Transaction) -> Vec<Issue> {
        self.evaluate(&RuleContext::from(transaction))
    }
}
