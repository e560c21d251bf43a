use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::context::RuleContext;
use crate::engine::PlausibilityEngine;
use crate::error::ConfigError;
use crate::loader::{LoadOptions, RuleLoader, RuleSet};
use crate::model::Issue;
use crate::watcher::RuleWatcher;

/// 可热重载的引擎句柄
///
/// 新规则集在旁边完整构建后通过一次指针交换发布；
/// 正在进行的求值持有旧的 `Arc`，只会看到完整的旧集合或完整的新集合。
pub struct SharedEngine {
    current: ArcSwap<PlausibilityEngine>,
}

impl SharedEngine {
    pub fn new(engine: PlausibilityEngine) -> Self {
        Self {
            current: ArcSwap::from_pointee(engine),
        }
    }

    /// 当前引擎快照
    pub fn current(&self) -> Arc<PlausibilityEngine> {
        self.current.load_full()
    }

    pub fn evaluate(&self, context: &RuleContext) -> Vec<Issue> {
        self.current.load().evaluate(context)
    }

    /// 整体替换规则集，返回旧引擎
    pub fn replace(&self, rules: RuleSet) -> Arc<PlausibilityEngine> {
        self.current.swap(Arc::new(PlausibilityEngine::new(rules)))
    }

    /// 从文件重新加载；失败时保留当前规则集
    pub fn reload_from(&self, path: &Path, options: LoadOptions) -> Result<usize, ConfigError> {
        let rules = RuleLoader::with_options(options).load_path(path)?;
        let count = rules.len();
        let previous = self.replace(rules);
        info!(
            path = %path.display(),
            previous = previous.rules().len(),
            current = count,
            "Rules reloaded"
        );
        Ok(count)
    }

    /// 监听规则文件并在变更时自动重载
    pub fn spawn_watcher(
        self: Arc<Self>,
        path: PathBuf,
        options: LoadOptions,
        debounce: Duration,
    ) -> notify::Result<JoinHandle<()>> {
        let mut watcher = RuleWatcher::watch(&path)?;

        Ok(tokio::spawn(async move {
            while watcher.recv().await.is_some() {
                // 等待写入完成，合并同一次保存产生的多个事件
                tokio::time::sleep(debounce).await;
                watcher.drain();

                if let Err(e) = self.reload_from(&path, options) {
                    warn!(path = %path.display(), error = %e, "Rule reload failed, keeping current rules");
                }
            }
        }))
    }
}
