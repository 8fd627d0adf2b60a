use crate::constants::{
    MAX_SETTLE_PROBES, RETRIGGER_INTERVAL_MS, SETTLE_WAIT_MS, SIZE_PROBE_INTERVAL_MS,
    TEMP_FILE_EXTENSIONS, TEMP_FILE_PREFIXES,
};
use crate::models::{IndexTask, TaskKind};
use crate::utils;
use crate::watcher::FsEvent;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

/// Whether a path is hidden, a temp artifact, or outside the supported
/// extension set. Shared by the debouncer and the full-scan enumeration so
/// both paths into the index apply the same filter.
pub fn is_ignored(path: &Path, extensions: &HashSet<String>) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return true,
    };

    if name.starts_with('.') {
        return true;
    }
    if TEMP_FILE_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }

    match utils::get_extension(path) {
        Some(ext) => TEMP_FILE_EXTENSIONS.contains(&ext.as_str()) || !extensions.contains(&ext),
        None => true,
    }
}

/// Filters raw filesystem events down to index tasks.
///
/// Temp, hidden and unsupported files are dropped. A created file is left
/// alone until it stops growing (settle wait plus bounded size probing) so a
/// writer mid-flight is never indexed. Rapid modifications of the same path
/// coalesce into one task via a per-path minimum re-trigger interval. The
/// debouncer only emits tasks; it never touches the index itself.
pub struct Debouncer {
    extensions: HashSet<String>,
    settle: Duration,
    probe_interval: Duration,
    max_probes: usize,
    retrigger: Duration,
    last_emit: Mutex<HashMap<PathBuf, Instant>>,
    task_tx: mpsc::Sender<IndexTask>,
}

impl Debouncer {
    pub fn new(extensions: impl IntoIterator<Item = String>, task_tx: mpsc::Sender<IndexTask>) -> Self {
        Self::with_timing(
            extensions,
            task_tx,
            Duration::from_millis(SETTLE_WAIT_MS),
            Duration::from_millis(SIZE_PROBE_INTERVAL_MS),
            MAX_SETTLE_PROBES,
            Duration::from_millis(RETRIGGER_INTERVAL_MS),
        )
    }

    pub fn with_timing(
        extensions: impl IntoIterator<Item = String>,
        task_tx: mpsc::Sender<IndexTask>,
        settle: Duration,
        probe_interval: Duration,
        max_probes: usize,
        retrigger: Duration,
    ) -> Self {
        Self {
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            settle,
            probe_interval,
            max_probes,
            retrigger,
            last_emit: Mutex::new(HashMap::new()),
            task_tx,
        }
    }

    /// Whether a path should be ignored outright
    pub fn is_noise(&self, path: &Path) -> bool {
        is_ignored(path, &self.extensions)
    }

    /// Consume raw events until the channel closes. Created files get their
    /// settle wait on a separate task so event dispatch stays responsive.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<FsEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                FsEvent::Created(path) => {
                    if self.is_noise(&path) {
                        continue;
                    }
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.settle_and_emit(path).await;
                    });
                }
                FsEvent::Modified(path) => {
                    if self.is_noise(&path) {
                        continue;
                    }
                    if !self.mark_emitted(&path) {
                        debug!(path = %path.display(), "coalesced modify event");
                        continue;
                    }
                    self.emit(path, TaskKind::Modified).await;
                }
                FsEvent::Removed(path) => {
                    if self.is_noise(&path) {
                        continue;
                    }
                    self.last_emit
                        .lock()
                        .expect("debounce state poisoned")
                        .remove(&path);
                    self.emit(path, TaskKind::Removed).await;
                }
            }
        }
    }

    /// Wait for a created file to stop changing, then emit its task. The file
    /// is sampled twice per round; growth buys it another settle wait, up to
    /// a bounded number of rounds.
    async fn settle_and_emit(&self, path: PathBuf) {
        tokio::time::sleep(self.settle).await;

        let mut probes = 0;
        loop {
            let Ok(before) = tokio::fs::metadata(&path).await else {
                debug!(path = %path.display(), "file vanished during settle");
                return;
            };
            tokio::time::sleep(self.probe_interval).await;
            let Ok(after) = tokio::fs::metadata(&path).await else {
                return;
            };

            if before.len() == after.len() {
                break;
            }

            probes += 1;
            if probes >= self.max_probes {
                debug!(path = %path.display(), "file still growing after max probes, proceeding");
                break;
            }
            tokio::time::sleep(self.settle).await;
        }

        self.mark_emitted(&path);
        self.emit(path, TaskKind::Created).await;
    }

    /// Record an emission for the path unless one happened within the
    /// re-trigger interval. Returns false when the event should coalesce.
    fn mark_emitted(&self, path: &Path) -> bool {
        let mut map = self.last_emit.lock().expect("debounce state poisoned");
        let now = Instant::now();
        if let Some(last) = map.get(path) {
            if now.duration_since(*last) < self.retrigger {
                return false;
            }
        }
        map.insert(path.to_path_buf(), now);
        true
    }

    async fn emit(&self, path: PathBuf, kind: TaskKind) {
        debug!(path = %path.display(), ?kind, "emitting index task");
        let _ = self.task_tx.send(IndexTask::new(path, kind)).await;
    }
}
