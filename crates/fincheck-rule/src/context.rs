use fincheck_expr::Scope;
use fincheck_types::{Transaction, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// 交易上下文中可用的字段
pub const CONTEXT_FIELDS: &[&str] = &[
    "date",
    "amount",
    "currency",
    "description",
    "merchant",
    "category",
];

/// 规则执行上下文（每次求值构造，只读）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleContext {
    fields: BTreeMap<String, Value>,
}

impl RuleContext {
    /// 空上下文，用于测试或部分记录
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&Transaction> for RuleContext {
    fn from(tx: &Transaction) -> Self {
        RuleContext::new()
            .with("date", tx.date)
            .with("amount", tx.amount)
            .with("currency", tx.currency.as_str())
            .with("description", tx.description.clone())
            .with("merchant", tx.merchant.clone())
            .with("category", tx.category.clone())
    }
}

impl Scope for RuleContext {
    fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
