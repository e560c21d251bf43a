use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::context::CONTEXT_FIELDS;
use crate::error::ConfigError;
use crate::model::{RuleDefinition, Severity};

/// 有序规则集合（声明顺序即求值与输出顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<RuleDefinition>,
}

impl RuleSet {
    /// 从规则列表构造，拒绝重复 ID
    pub fn from_rules(rules: Vec<RuleDefinition>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ConfigError::DuplicateId(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleDefinition> {
        self.rules.iter()
    }

    pub fn get(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a RuleDefinition;
    type IntoIter = std::slice::Iter<'a, RuleDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// 加载选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 严格模式：条件无法解析、引用未知字段或未知函数时拒绝加载
    pub strict: bool,
}

impl LoadOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    rules: Option<Vec<RuleRecord>>,
}

#[derive(Debug, Deserialize)]
struct RuleRecord {
    id: Option<String>,
    description: Option<String>,
    condition: Option<String>,
    severity: Option<String>,
}

/// 规则加载器
#[derive(Debug, Clone, Default)]
pub struct RuleLoader {
    options: LoadOptions,
}

impl RuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoadOptions) -> Self {
        Self { options }
    }

    /// 加载 YAML 规则（JSON 是 YAML 的子集，也可直接使用）
    pub fn load_str(&self, source: &str) -> Result<RuleSet, ConfigError> {
        self.load_yaml_str(source)
    }

    pub fn load_yaml_str(&self, source: &str) -> Result<RuleSet, ConfigError> {
        let document: RuleDocument =
            serde_yaml::from_str(source).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        self.build(document)
    }

    pub fn load_json_str(&self, source: &str) -> Result<RuleSet, ConfigError> {
        let document: RuleDocument =
            serde_json::from_str(source).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        self.build(document)
    }

    /// 从文件加载；`.json` 按 JSON 解析，其余按 YAML
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
        let path = path.as_ref();
        debug!("Loading rules from file: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let rules = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            self.load_json_str(&content)?
        } else {
            self.load_yaml_str(&content)?
        };

        info!(path = %path.display(), rule_count = rules.len(), "Rules loaded");
        Ok(rules)
    }

    fn build(&self, document: RuleDocument) -> Result<RuleSet, ConfigError> {
        let records = document.rules.unwrap_or_default();
        let mut rules = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            rules.push(self.build_rule(index, record)?);
        }

        RuleSet::from_rules(rules)
    }

    fn build_rule(&self, index: usize, record: RuleRecord) -> Result<RuleDefinition, ConfigError> {
        let id = required(record.id, index, "id")?;
        let condition = required(record.condition, index, "condition")?;

        let severity = match record.severity {
            Some(value) => value.parse::<Severity>().map_err(|value| {
                ConfigError::InvalidSeverity {
                    id: id.clone(),
                    value,
                }
            })?,
            None => Severity::default(),
        };

        let rule = RuleDefinition::new(id, condition)
            .with_description(record.description.unwrap_or_default())
            .with_severity(severity);

        if let Err(reason) = validate_condition(&rule) {
            if self.options.strict {
                return Err(ConfigError::InvalidCondition {
                    id: rule.id.clone(),
                    reason,
                });
            }
            warn!(rule_id = %rule.id, reason = %reason, "Rule condition can never match");
        }

        Ok(rule)
    }
}

fn required(value: Option<String>, index: usize, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField { index, field }),
    }
}

/// 静态校验：可解析、只引用上下文字段、只调用已知函数
fn validate_condition(rule: &RuleDefinition) -> Result<(), String> {
    let condition = rule.compiled().map_err(|e| e.to_string())?;

    if let Some(unknown) = condition
        .identifiers()
        .into_iter()
        .find(|name| !CONTEXT_FIELDS.contains(name))
    {
        return Err(format!("unknown field `{}`", unknown));
    }

    condition.check_functions().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_YAML: &str = r#"
rules:
  - id: zero_amount
    description: Amount is zero
    condition: "amount == 0"
    severity: warning
  - id: very_large
    description: Unusually large amount
    condition: "abs(amount) > 10000"
    severity: warning
  - id: no_category
    condition: "category is None"
"#;

    #[test]
    fn test_load_yaml_preserves_order() {
        let rules = RuleLoader::new().load_str(RULES_YAML).unwrap();
        assert_eq!(rules.ids(), vec!["zero_amount", "very_large", "no_category"]);
    }

    #[test]
    fn test_defaults() {
        let rules = RuleLoader::new().load_str(RULES_YAML).unwrap();
        let rule = rules.get("no_category").unwrap();
        assert_eq!(rule.severity, Severity::Info);
        assert_eq!(rule.description, "");
    }

    #[test]
    fn test_load_json() {
        let json = r#"{ "rules": [ { "id": "neg", "condition": "amount < 0", "severity": "critical" } ] }"#;
        let rules = RuleLoader::new().load_json_str(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get("neg").unwrap().severity, Severity::Critical);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let yaml = r#"
rules:
  - id: dup
    condition: "amount == 0"
  - id: dup
    condition: "amount > 1"
"#;
        let err = RuleLoader::new().load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateId(ref id) if id == "dup"));
    }

    #[test]
    fn test_missing_required_fields() {
        let yaml = "rules:\n  - description: no id\n    condition: \"amount > 0\"\n";
        assert!(matches!(
            RuleLoader::new().load_str(yaml),
            Err(ConfigError::MissingField { index: 0, field: "id" })
        ));

        let yaml = "rules:\n  - id: ok\n    condition: \"amount > 0\"\n  - id: no_condition\n";
        assert!(matches!(
            RuleLoader::new().load_str(yaml),
            Err(ConfigError::MissingField { index: 1, field: "condition" })
        ));

        let yaml = "rules:\n  - id: \"  \"\n    condition: \"amount > 0\"\n";
        assert!(matches!(
            RuleLoader::new().load_str(yaml),
            Err(ConfigError::MissingField { index: 0, field: "id" })
        ));
    }

    #[test]
    fn test_invalid_severity() {
        let yaml = "rules:\n  - id: r\n    condition: \"amount > 0\"\n    severity: fatal\n";
        assert!(matches!(
            RuleLoader::new().load_str(yaml),
            Err(ConfigError::InvalidSeverity { ref value, .. }) if value == "fatal"
        ));
    }

    #[test]
    fn test_malformed_source() {
        assert!(matches!(
            RuleLoader::new().load_str("rules: [unclosed"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            RuleLoader::new().load_str("rules: 42"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            RuleLoader::new().load_json_str("{ not json"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_rule_list() {
        assert!(RuleLoader::new().load_str("rules: []").unwrap().is_empty());
        assert!(RuleLoader::new().load_str("rules:").unwrap().is_empty());
    }

    #[test]
    fn test_lenient_keeps_broken_condition() {
        let yaml = "rules:\n  - id: broken\n    condition: \"amount >\"\n  - id: typo\n    condition: \"ammount > 0\"\n";
        let rules = RuleLoader::new().load_str(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules.get("broken").unwrap().compiled().is_err());
    }

    #[test]
    fn test_strict_rejects_broken_condition() {
        let strict = RuleLoader::with_options(LoadOptions::strict());

        let yaml = "rules:\n  - id: broken\n    condition: \"amount >\"\n";
        assert!(matches!(
            strict.load_str(yaml),
            Err(ConfigError::InvalidCondition { ref id, .. }) if id == "broken"
        ));

        let yaml = "rules:\n  - id: typo\n    condition: \"ammount > 0\"\n";
        match strict.load_str(yaml) {
            Err(ConfigError::InvalidCondition { reason, .. }) => {
                assert!(reason.contains("ammount"), "reason: {}", reason)
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let yaml = "rules:\n  - id: func\n    condition: \"open(description) > 0\"\n";
        assert!(matches!(strict.load_str(yaml), Err(ConfigError::InvalidCondition { .. })));

        assert_eq!(strict.load_str(RULES_YAML).unwrap().len(), 3);
    }

    #[test]
    fn test_from_rules_rejects_duplicates() {
        let rules = vec![
            RuleDefinition::new("a", "amount > 0"),
            RuleDefinition::new("a", "amount < 0"),
        ];
        assert!(matches!(RuleSet::from_rules(rules), Err(ConfigError::DuplicateId(_))));
    }
}
