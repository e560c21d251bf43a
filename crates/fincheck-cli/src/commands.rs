use anyhow::{anyhow, Context, Result};
use fincheck_config::{ConfigLoader, FincheckConfig};
use fincheck_rule::{Issue, LoadOptions, PlausibilityEngine, RuleLoader, SharedEngine};
use fincheck_types::Transaction;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::args::Cli;

/// 默认配置目录
const DEFAULT_CONFIG_DIR: &str = "config";

/// 单笔或多笔交易输入
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TransactionInput {
    One(Transaction),
    Many(Vec<Transaction>),
}

/// 加载配置并应用命令行覆盖
pub fn resolve_config(cli: &Cli) -> Result<FincheckConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::from_file(path),
        None => ConfigLoader::new(DEFAULT_CONFIG_DIR),
    };

    let mut config = loader.load()?;
    if let Some(rules) = &cli.rules {
        config.rules.path = rules.clone();
    }
    if cli.strict {
        config.rules.strict = true;
    }
    if cli.watch {
        config.rules.watch = true;
    }
    config.validate()?;
    Ok(config)
}

fn load_options(config: &FincheckConfig) -> LoadOptions {
    LoadOptions {
        strict: config.rules.strict,
    }
}

fn load_engine(config: &FincheckConfig) -> Result<PlausibilityEngine> {
    let rules = RuleLoader::with_options(load_options(config))
        .load_path(&config.rules.path)
        .with_context(|| format!("Failed to load rules from {}", config.rules.path.display()))?;
    Ok(PlausibilityEngine::new(rules))
}

/// `check`：加载规则并输出摘要
pub fn check(config: &FincheckConfig) -> Result<String> {
    let engine = load_engine(config)?;
    let mut out = format!(
        "{}: {} rule(s) loaded\n",
        config.rules.path.display(),
        engine.rules().len()
    );
    for rule in engine.rules() {
        let status = if rule.compiled().is_ok() { "ok" } else { "never matches" };
        out.push_str(&format!("  {:<24} {:<8} {}\n", rule.id, rule.severity, status));
    }
    Ok(out)
}

/// 解析交易输入并求值
pub fn evaluate_input(engine: &PlausibilityEngine, input: &str) -> Result<serde_json::Value> {
    let input: TransactionInput =
        serde_json::from_str(input).context("Invalid transaction JSON")?;

    let value = match input {
        TransactionInput::One(tx) => serde_json::to_value(engine.check(&tx))?,
        TransactionInput::Many(txs) => {
            let results: Vec<Vec<Issue>> = txs.iter().map(|tx| engine.check(tx)).collect();
            serde_json::to_value(results)?
        }
    };
    Ok(value)
}

/// `eval`：从文件或 stdin 读取交易
pub fn eval(config: &FincheckConfig, source: &str) -> Result<String> {
    let engine = load_engine(config)?;

    let input = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read transaction file {}", source))?
    };

    Ok(serde_json::to_string_pretty(&evaluate_input(&engine, &input)?)?)
}

/// `rules.watch` 开启时监听规则文件并热重载
pub fn start_reload(config: &FincheckConfig, shared: &Arc<SharedEngine>) -> Result<Option<JoinHandle<()>>> {
    if !config.rules.watch {
        return Ok(None);
    }

    let handle = shared
        .clone()
        .spawn_watcher(
            config.rules.path.clone(),
            load_options(config),
            config.rules.reload_debounce(),
        )
        .map_err(|e| anyhow!("Failed to watch {}: {}", config.rules.path.display(), e))?;

    info!(path = %config.rules.path.display(), "Watching rule file for changes");
    Ok(Some(handle))
}

/// `stream`：逐行读取交易并输出问题列表
pub async fn stream(config: &FincheckConfig) -> Result<()> {
    let shared = Arc::new(SharedEngine::new(load_engine(config)?));
    let reload = start_reload(config, &shared)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Transaction>(line) {
            Ok(tx) => {
                let issues = shared.current().check(&tx);
                println!("{}", serde_json::to_string(&issues)?);
            }
            Err(e) => warn!(error = %e, "Skipping invalid transaction line"),
        }
    }

    if let Some(handle) = reload {
        handle.abort();
    }
    Ok(())
}
