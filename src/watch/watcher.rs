// src/watch/watcher.rs

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{DepwatchError, Result};
use crate::watch::backend::WatchBackend;
use crate::watch::events::{WatchEvent, WatchEventKind, WatchRoot};
use crate::watch::path_utils::normalize_path;

/// Observed path -> path as it was handed to `watch`.
type WatchedFiles = Arc<Mutex<HashMap<String, String>>>;

/// `notify`-backed watch set.
///
/// Files are watched through their parent directory (non-recursive), and
/// events for files outside the set are dropped. Watching the directory
/// rather than the file keeps the watch alive across editors' atomic saves,
/// which replace the file's inode. Directory watches are refcounted by the
/// number of watched files they hold.
///
/// Events are forwarded as [`WatchEvent`]s tagged with this root over an
/// unbounded channel, because the notify callback runs on its own thread and
/// must not block.
pub struct NotifyWatchRoot {
    root: WatchRoot,
    inner: Option<RecommendedWatcher>,
    files: WatchedFiles,
    /// Watched path -> (directory, observed path).
    locations: HashMap<String, (PathBuf, String)>,
    dirs: HashMap<PathBuf, usize>,
}

impl std::fmt::Debug for NotifyWatchRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatchRoot")
            .field("root", &self.root)
            .field("files", &self.locations.len())
            .field("dirs", &self.dirs.len())
            .field("closed", &self.inner.is_none())
            .finish()
    }
}

impl NotifyWatchRoot {
    pub fn new(root: WatchRoot, event_tx: mpsc::UnboundedSender<WatchEvent>) -> Result<Self> {
        let files: WatchedFiles = Arc::default();
        let filter = Arc::clone(&files);

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let watched = filter.lock().unwrap_or_else(PoisonError::into_inner);
                    for (path, kind) in classify(&event) {
                        let Some(path) = watched.get(&normalize_path(path)) else {
                            continue;
                        };
                        let forwarded = WatchEvent {
                            root,
                            kind,
                            path: path.clone(),
                        };
                        if let Err(err) = event_tx.send(forwarded) {
                            // No tracing subscriber guaranteed on notify's thread.
                            eprintln!("depwatch: failed to forward notify event: {err}");
                        }
                    }
                }
                Err(err) => {
                    eprintln!("depwatch: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .map_err(|e| DepwatchError::Watch(e.to_string()))?;

        info!(%root, "file watcher started");

        Ok(Self {
            root,
            inner: Some(watcher),
            files,
            locations: HashMap::new(),
            dirs: HashMap::new(),
        })
    }

    /// Number of directories currently under an OS-level watch.
    pub fn watched_dirs(&self) -> usize {
        self.dirs.len()
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&mut self, path: &str) -> std::result::Result<(), String> {
        if self.locations.contains_key(path) {
            return Ok(());
        }
        let Some(watcher) = self.inner.as_mut() else {
            return Ok(());
        };

        let (dir, observed) = locate(path).map_err(|e| e.to_string())?;
        let count = self.dirs.get(&dir).copied().unwrap_or(0);
        if count == 0 {
            watcher
                .watch(&dir, RecursiveMode::NonRecursive)
                .map_err(|e| e.to_string())?;
            debug!(root = %self.root, dir = %dir.display(), "directory watch added");
        }
        self.dirs.insert(dir.clone(), count + 1);

        self.lock_files().insert(observed.clone(), path.to_string());
        self.locations.insert(path.to_string(), (dir, observed));
        Ok(())
    }

    fn remove(&mut self, path: &str) -> std::result::Result<(), String> {
        let Some((dir, observed)) = self.locations.remove(path) else {
            return Ok(());
        };
        self.lock_files().remove(&observed);

        let count = self.dirs.get(&dir).copied().unwrap_or(0);
        if count > 1 {
            self.dirs.insert(dir, count - 1);
            return Ok(());
        }

        self.dirs.remove(&dir);
        debug!(root = %self.root, dir = %dir.display(), "directory watch released");
        match self.inner.as_mut() {
            Some(watcher) => watcher.unwatch(&dir).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    fn apply<F>(&mut self, paths: &[String], mut op: F) -> Result<()>
    where
        F: FnMut(&mut Self, &str) -> std::result::Result<(), String>,
    {
        if self.inner.is_none() {
            debug!(root = %self.root, "watch root already closed");
            return Ok(());
        }

        let failures: Vec<String> = paths
            .iter()
            .filter_map(|p| op(self, p.as_str()).err().map(|e| format!("{p}: {e}")))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DepwatchError::Watch(failures.join("; ")))
        }
    }
}

impl WatchBackend for NotifyWatchRoot {
    fn watch(&mut self, paths: &[String]) -> Result<()> {
        self.apply(paths, Self::add)
    }

    fn unwatch(&mut self, paths: &[String]) -> Result<()> {
        self.apply(paths, Self::remove)
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            self.lock_files().clear();
            self.locations.clear();
            self.dirs.clear();
            info!(root = %self.root, "file watcher closed");
        }
    }
}

/// Directory to watch for `path`, and the path events will report for it.
///
/// The directory is canonicalized so the observed path matches what the OS
/// reports even when `path` goes through a symlink.
fn locate(path: &str) -> io::Result<(PathBuf, String)> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = dir.canonicalize()?;
    let observed = normalize_path(&dir.join(name));
    Ok((dir, observed))
}

/// Map a notify event onto the two kinds the controller cares about, per
/// path.
///
/// A rename reports both ends: the source is gone, the target changed.
pub fn classify(event: &Event) -> Vec<(&Path, WatchEventKind)> {
    match event.kind {
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            tag(&event.paths, WatchEventKind::Removed)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = if i == 0 {
                    WatchEventKind::Removed
                } else {
                    WatchEventKind::Changed
                };
                (p.as_path(), kind)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            tag(&event.paths, WatchEventKind::Changed)
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                // Rename without a direction: decide by whether the file is still there.
                let kind = if p.exists() {
                    WatchEventKind::Changed
                } else {
                    WatchEventKind::Removed
                };
                (p.as_path(), kind)
            })
            .collect(),
        EventKind::Create(_) | EventKind::Modify(_) => {
            tag(&event.paths, WatchEventKind::Changed)
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn tag(paths: &[PathBuf], kind: WatchEventKind) -> Vec<(&Path, WatchEventKind)> {
    paths.iter().map(|p| (p.as_path(), kind)).collect()
}
