use anyhow::{anyhow, Result};
use fincheck_logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 全局配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FincheckConfig {
    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 规则配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RulesConfig {
    /// 规则文件路径
    #[serde(default = "default_rules_path")]
    pub path: PathBuf,

    /// 严格校验条件表达式
    #[serde(default)]
    pub strict: bool,

    /// 文件变更时自动重载
    #[serde(default)]
    pub watch: bool,

    /// 重载防抖时间（毫秒）
    #[serde(default = "default_reload_debounce_ms")]
    pub reload_debounce_ms: u64,
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("config/rules.yaml")
}

fn default_reload_debounce_ms() -> u64 {
    200
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
            strict: false,
            watch: false,
            reload_debounce_ms: default_reload_debounce_ms(),
        }
    }
}

impl RulesConfig {
    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }
}

impl FincheckConfig {
    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.rules.path.as_os_str().is_empty() {
            return Err(anyhow!("rules.path must not be empty"));
        }

        if self.rules.watch && self.rules.reload_debounce_ms == 0 {
            return Err(anyhow!("rules.reload_debounce_ms must be greater than 0 when watch is enabled"));
        }

        for directive in &self.logging.directives {
            if directive.trim().is_empty() {
                return Err(anyhow!("logging.directives must not contain empty entries"));
            }
        }

        Ok(())
    }
}
