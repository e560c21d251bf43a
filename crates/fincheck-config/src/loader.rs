use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use std::path::{Path, PathBuf};

use crate::FincheckConfig;

/// 默认配置文件名
pub const CONFIG_FILE_NAME: &str = "fincheck.toml";

/// 环境变量前缀，如 `FINCHECK__RULES__STRICT=true`
pub const ENV_PREFIX: &str = "FINCHECK";

/// 配置加载器
///
/// 优先级：环境变量 > 配置文件 > 默认值
pub struct ConfigLoader {
    config_path: PathBuf,
    required: bool,
    env_override: Option<Map<String, String>>,
}

impl ConfigLoader {
    /// 从配置目录加载 `fincheck.toml`，文件不存在时使用默认配置
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_path: config_dir.as_ref().join(CONFIG_FILE_NAME),
            required: false,
            env_override: None,
        }
    }

    /// 从指定文件加载，文件必须存在
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            required: true,
            env_override: None,
        }
    }

    /// 用给定的变量表代替进程环境变量
    pub fn with_env(mut self, vars: Map<String, String>) -> Self {
        self.env_override = Some(vars);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 加载并验证配置
    pub fn load(&self) -> Result<FincheckConfig> {
        if self.required && !self.config_path.exists() {
            return Err(anyhow!("Config file not found: {}", self.config_path.display()));
        }

        let mut builder = Config::builder();

        if self.config_path.exists() {
            builder = builder.add_source(File::new(
                self.config_path
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(self.env_override.clone()),
            )
            .build()
            .with_context(|| format!("Failed to read config {}", self.config_path.display()))?;

        let config: FincheckConfig = config
            .try_deserialize()
            .with_context(|| format!("Invalid config {}", self.config_path.display()))?;
        config.validate()?;

        Ok(config)
    }
}

impl FincheckConfig {
    /// 序列化为 TOML（用于输出生效配置）
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincheck_logging::{LogFormat, LogLevel};
    use std::fs;
    use tempfile::tempdir;

    fn no_env() -> Map<String, String> {
        Map::new()
    }

    #[test]
    fn test_load_default_config() {
        let temp_dir = tempdir().unwrap();
        let loader = ConfigLoader::new(temp_dir.path()).with_env(no_env());

        let config = loader.load().unwrap();
        assert_eq!(config, FincheckConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_content = r#"
[rules]
path = "/etc/fincheck/rules.json"
strict = true
watch = true
reload_debounce_ms = 500

[logging]
level = "debug"
format = "json"
directives = ["fincheck_expr=trace"]
"#;

        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let loader = ConfigLoader::new(temp_dir.path()).with_env(no_env());
        let config = loader.load().unwrap();

        assert_eq!(config.rules.path, PathBuf::from("/etc/fincheck/rules.json"));
        assert!(config.rules.strict);
        assert!(config.rules.watch);
        assert_eq!(config.rules.reload_debounce_ms, 500);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.directives, vec!["fincheck_expr=trace".to_string()]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[rules]\nstrict = true\n").unwrap();

        let config = ConfigLoader::new(temp_dir.path())
            .with_env(no_env())
            .load()
            .unwrap();

        assert!(config.rules.strict);
        assert_eq!(config.rules.path, PathBuf::from("config/rules.yaml"));
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[rules]\npath = \"a.yaml\"\nstrict = false\n",
        )
        .unwrap();

        let mut env = Map::new();
        env.insert("FINCHECK__RULES__STRICT".to_string(), "true".to_string());
        env.insert("FINCHECK__RULES__PATH".to_string(), "b.yaml".to_string());

        let config = ConfigLoader::new(temp_dir.path()).with_env(env).load().unwrap();
        assert!(config.rules.strict);
        assert_eq!(config.rules.path, PathBuf::from("b.yaml"));
    }

    #[test]
    fn test_from_file_requires_existing_file() {
        let temp_dir = tempdir().unwrap();
        let loader = ConfigLoader::from_file(temp_dir.path().join("missing.toml")).with_env(no_env());
        assert!(loader.load().is_err());
    }

    #[test]
    fn test_invalid_value_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

        assert!(ConfigLoader::from_file(&path).with_env(no_env()).load().is_err());
    }

    #[test]
    fn test_toml_output_reloads() {
        let temp_dir = tempdir().unwrap();
        let mut config = FincheckConfig::default();
        config.rules.strict = true;

        let path = temp_dir.path().join("out.toml");
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let reloaded = ConfigLoader::from_file(&path).with_env(no_env()).load().unwrap();
        assert_eq!(reloaded, config);
    }
}
