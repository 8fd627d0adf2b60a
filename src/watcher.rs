use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{error, warn};

/// Raw filesystem event forwarded to the debouncer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

/// Filesystem watcher that monitors a directory tree and pushes discrete
/// events onto a channel.
///
/// Event delivery is decoupled from processing: the notify callback hands
/// events to a forwarding thread, which feeds the async channel the debouncer
/// consumes. The watcher tracks its own liveness so the owning process can
/// detect a dead observer and restart it.
pub struct FileWatcher {
    watch_dir: PathBuf,
    event_tx: tokio_mpsc::Sender<FsEvent>,
    alive: Arc<AtomicBool>,
    generation: Arc<AtomicUsize>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileWatcher {
    /// Create a new FileWatcher for the given directory
    pub fn new<P: AsRef<Path>>(watch_dir: P, event_tx: tokio_mpsc::Sender<FsEvent>) -> Result<Self> {
        let watch_dir = watch_dir
            .as_ref()
            .canonicalize()
            .context("Failed to canonicalize watch directory path")?;

        if !watch_dir.is_dir() {
            anyhow::bail!("Path is not a directory: {}", watch_dir.display());
        }

        Ok(Self {
            watch_dir,
            event_tx,
            alive: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicUsize::new(0)),
            watcher: Mutex::new(None),
        })
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// Start watching the directory recursively
    pub fn start(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let _ = tx.send(result);
            },
            Config::default(),
        )
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(&self.watch_dir, RecursiveMode::Recursive)
            .context("Failed to start watching directory")?;

        *self.watcher.lock().expect("watcher lock poisoned") = Some(watcher);
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.alive.store(true, Ordering::SeqCst);

        let watch_dir = self.watch_dir.clone();
        let event_tx = self.event_tx.clone();
        let alive = Arc::clone(&self.alive);
        let generation = Arc::clone(&self.generation);

        std::thread::spawn(move || {
            while let Ok(result) = rx.recv() {
                match result {
                    Ok(event) => Self::forward_event(&watch_dir, event, &event_tx),
                    Err(e) => warn!(error = %e, "watch backend reported an error"),
                }
            }
            // Sender side is gone; this watcher generation is dead. A newer
            // generation may already be running, in which case leave it alone.
            if generation.load(Ordering::SeqCst) == my_generation {
                error!("filesystem watcher stopped delivering events");
                alive.store(false, Ordering::SeqCst);
            }
        });

        Ok(())
    }

    fn forward_event(watch_dir: &Path, event: Event, tx: &tokio_mpsc::Sender<FsEvent>) {
        for path in event.paths {
            // Only forward paths within the watched directory
            if !path.starts_with(watch_dir) {
                continue;
            }

            let fs_event = match event.kind {
                EventKind::Create(_) if path.is_file() => FsEvent::Created(path),
                EventKind::Modify(_) if path.is_file() => FsEvent::Modified(path),
                EventKind::Remove(_) => FsEvent::Removed(path),
                _ => continue,
            };

            if tx.blocking_send(fs_event).is_err() {
                return;
            }
        }
    }

    /// Whether the watcher is still delivering events
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Tear down the current watch and establish a fresh one
    pub fn restart(&self) -> Result<()> {
        *self.watcher.lock().expect("watcher lock poisoned") = None;
        self.start()
    }
}
