use fincheck_expr::{Condition, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::RuleContext;
use crate::error::EvaluationError;

/// 严重程度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(s.to_string()),
        }
    }
}

/// 编译后的条件；无法解析的条件保留错误，求值时视为不匹配
#[derive(Debug, Clone, PartialEq)]
enum Compiled {
    Ready(Condition),
    Invalid(ParseError),
}

/// 规则定义（加载后不可变）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDefinition {
    /// 规则 ID
    pub id: String,

    /// 规则描述
    pub description: String,

    /// 条件表达式源码
    pub condition: String,

    /// 严重程度
    pub severity: Severity,

    #[serde(skip)]
    compiled: Compiled,
}

impl RuleDefinition {
    pub fn new(id: impl Into<String>, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        let compiled = match Condition::compile(&condition) {
            Ok(c) => Compiled::Ready(c),
            Err(e) => Compiled::Invalid(e),
        };
        Self {
            id: id.into(),
            description: String::new(),
            condition,
            severity: Severity::default(),
            compiled,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// 已编译的条件；解析失败时返回错误
    pub fn compiled(&self) -> Result<&Condition, &ParseError> {
        match &self.compiled {
            Compiled::Ready(c) => Ok(c),
            Compiled::Invalid(e) => Err(e),
        }
    }

    pub fn evaluate(&self, context: &RuleContext) -> Result<bool, EvaluationError> {
        match &self.compiled {
            Compiled::Ready(c) => Ok(c.evaluate(context)?),
            Compiled::Invalid(e) => Err(EvaluationError::Parse(e.clone())),
        }
    }
}

/// 规则命中后产生的问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub description: String,
    pub severity: Severity,
}

impl From<&RuleDefinition> for Issue {
    fn from(rule: &RuleDefinition) -> Self {
        Self {
            id: rule.id.clone(),
            description: rule.description.clone(),
            severity: rule.severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_default_and_parse() {
        assert_eq!(Severity::default(), Severity::Info);
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!(" Critical ".parse::<Severity>(), Ok(Severity::Critical));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_issue_serialization() {
        let rule = RuleDefinition::new("zero_amount", "amount == 0")
            .with_description("Amount is zero")
            .with_severity(Severity::Warning);

        let json = serde_json::to_string(&Issue::from(&rule)).unwrap();
        assert_eq!(
            json,
            r#"{"id":"zero_amount","description":"Amount is zero","severity":"warning"}"#
        );
    }

    #[test]
    fn test_invalid_condition_is_kept() {
        let rule = RuleDefinition::new("broken", "amount >");
        assert!(rule.compiled().is_err());

        let ctx = RuleContext::new().with("amount", 1.0);
        assert!(matches!(rule.evaluate(&ctx), Err(EvaluationError::Parse(_))));
    }

    #[test]
    fn test_rule_serialization_skips_compiled() {
        let rule = RuleDefinition::new("r1", "amount > 1");
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["condition"], "amount > 1");
        assert_eq!(value["severity"], "info");
        assert!(value.get("compiled").is_none());
    }
}
