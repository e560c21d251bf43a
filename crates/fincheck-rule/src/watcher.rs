use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// 规则文件监听器
///
/// 监听文件所在目录，编辑器"写临时文件再重命名"的保存方式也能被捕获。
pub struct RuleWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl RuleWatcher {
    pub fn watch(path: impl AsRef<Path>) -> notify::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (tx, rx) = mpsc::channel(16);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(Event { kind, paths, .. }) => {
                let relevant = matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
                    && paths.iter().any(|p| p.file_name() == file_name.as_deref());
                if relevant {
                    debug!("Rule file changed: {:?}", paths);
                    // 通道已满说明已有待处理的重载，直接丢弃
                    let _ = tx.try_send(());
                }
            }
            Err(e) => {
                error!("Watch error: {}", e);
            }
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!("File watcher started for: {:?}", path);

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// 等待下一次变更
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// 丢弃已排队的变更事件，返回丢弃数量
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}
