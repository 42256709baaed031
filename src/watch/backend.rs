// src/watch/backend.rs

//! Pluggable watch-service abstraction.
//!
//! The runtime talks to a [`WatchBackend`] per [`WatchRoot`] instead of a raw
//! `notify` watcher, so tests can record watch/unwatch calls without touching
//! the filesystem. Production code uses
//! [`NotifyWatchRoot`](crate::watch::watcher::NotifyWatchRoot).

use tracing::{debug, warn};

use crate::errors::Result;
use crate::watch::events::{WatchCommand, WatchRoot};

/// One watch set (entries or dependencies).
pub trait WatchBackend: Send {
    /// Start watching every path in `paths` (one batched call).
    fn watch(&mut self, paths: &[String]) -> Result<()>;

    /// Stop watching every path in `paths`.
    fn unwatch(&mut self, paths: &[String]) -> Result<()>;

    /// Release all OS-level handles. Further calls are no-ops.
    fn close(&mut self);
}

/// The pair of watch sets owned by a watch session.
pub struct WatchRoots {
    entries: Box<dyn WatchBackend>,
    dependencies: Box<dyn WatchBackend>,
}

impl std::fmt::Debug for WatchRoots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRoots").finish_non_exhaustive()
    }
}

impl WatchRoots {
    pub fn new(entries: Box<dyn WatchBackend>, dependencies: Box<dyn WatchBackend>) -> Self {
        Self {
            entries,
            dependencies,
        }
    }

    fn backend(&mut self, root: WatchRoot) -> &mut dyn WatchBackend {
        match root {
            WatchRoot::Entries => self.entries.as_mut(),
            WatchRoot::Dependencies => self.dependencies.as_mut(),
        }
    }

    /// Execute a controller command.
    ///
    /// Watch-service failures are logged and swallowed: the dependency graph
    /// has already been updated and stays authoritative.
    pub fn execute(&mut self, command: WatchCommand) {
        let (root, result, verb, count) = match command {
            WatchCommand::Watch { root, paths } => {
                (root, self.backend(root).watch(&paths), "watch", paths.len())
            }
            WatchCommand::Unwatch { root, paths } => {
                (root, self.backend(root).unwatch(&paths), "unwatch", paths.len())
            }
        };

        match result {
            Ok(()) => debug!(%root, verb, count, "watch command applied"),
            Err(err) => warn!(%root, verb, count, error = %err, "watch command failed"),
        }
    }

    pub fn close(&mut self) {
        self.entries.close();
        self.dependencies.close();
    }
}
