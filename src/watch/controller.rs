// src/watch/controller.rs

//! Translates dependency graph updates into watch-service calls.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::graph::DependencyGraph;
use crate::logging::watch_log;
use crate::types::WatchLogLevel;
use crate::watch::events::{WatchCommand, WatchRoot};
use crate::watch::path_utils::{display_relative, display_relative_list, is_virtual, normalize};

/// Owner of the dependency graph in watch mode.
///
/// The controller never talks to the filesystem itself: each method returns
/// the [`WatchCommand`]s the runtime shell has to execute. All methods run to
/// completion without suspending, so a graph update and the commands derived
/// from it are produced atomically with respect to other events.
///
/// Entries the host serves stay in the entry watch set for the whole session,
/// even before their first successful build and after their file is deleted,
/// so a fixed or re-created entry is picked up again.
#[derive(Debug)]
pub struct WatchController {
    graph: DependencyGraph,
    served: BTreeSet<String>,
    /// Entries deleted since their last change; late build reports for them
    /// are dropped.
    removed: BTreeSet<String>,
    log_level: WatchLogLevel,
    base_path: PathBuf,
}

impl WatchController {
    pub fn new(log_level: WatchLogLevel, base_path: impl Into<PathBuf>) -> Self {
        Self {
            graph: DependencyGraph::new(),
            served: BTreeSet::new(),
            removed: BTreeSet::new(),
            log_level,
            base_path: base_path.into(),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_tracking(&self, entry: &str) -> bool {
        self.graph.contains_entry(entry)
    }

    pub fn is_served(&self, entry: &str) -> bool {
        self.served.contains(&normalize(entry))
    }

    /// Whether `entry` was deleted and has not changed since.
    pub fn is_removed(&self, entry: &str) -> bool {
        self.removed.contains(&normalize(entry))
    }

    /// Whether a change on `entry` should re-bundle it.
    pub fn refreshes_on_change(&self, entry: &str) -> bool {
        let entry = normalize(entry);
        self.graph.contains_entry(&entry) || self.served.contains(&entry)
    }

    /// The host serves `entries`: watch the ones not watched yet.
    pub fn serve_entries(&mut self, entries: &[String]) -> Vec<WatchCommand> {
        let mut fresh = Vec::new();
        for entry in entries.iter().filter(|e| !is_virtual(e)).map(normalize) {
            let watched = self.graph.contains_entry(&entry);
            if self.served.insert(entry.clone()) && !watched {
                fresh.push(entry);
            }
        }

        if fresh.is_empty() {
            return Vec::new();
        }
        watch_log!(
            self.log_level,
            "Watching entries: {}",
            display_relative_list(&self.base_path, &fresh)
        );
        vec![WatchCommand::Watch {
            root: WatchRoot::Entries,
            paths: fresh,
        }]
    }

    /// The entry file exists again after a change event.
    pub fn entry_changed(&mut self, entry: &str) {
        let entry = normalize(entry);
        if self.removed.remove(&entry) {
            debug!(entry = %entry, "removed entry is back");
        }
    }

    /// A build of `entry` succeeded and touched `deps`.
    pub fn record_build(&mut self, entry: &str, deps: &[String]) -> Vec<WatchCommand> {
        if is_virtual(entry) {
            debug!("ignoring build report for virtual entry");
            return Vec::new();
        }

        let entry = normalize(entry);
        let mut commands = Vec::new();

        if !self.graph.contains_entry(&entry) && !self.served.contains(&entry) {
            watch_log!(
                self.log_level,
                "Watching entry: {}",
                display_relative(&self.base_path, &entry)
            );
            commands.push(WatchCommand::Watch {
                root: WatchRoot::Entries,
                paths: vec![entry.clone()],
            });
        }

        let diff = self.graph.set_dependencies(&entry, deps);

        if !diff.added.is_empty() {
            watch_log!(
                self.log_level,
                "Watching dependencies: {}",
                display_relative_list(&self.base_path, &diff.added)
            );
            commands.push(WatchCommand::Watch {
                root: WatchRoot::Dependencies,
                paths: diff.added,
            });
        }

        if !diff.released.is_empty() {
            watch_log!(
                self.log_level,
                "Unwatching dependencies: {}",
                display_relative_list(&self.base_path, &diff.released)
            );
            commands.push(WatchCommand::Unwatch {
                root: WatchRoot::Dependencies,
                paths: diff.released,
            });
        }

        commands
    }

    /// The entry file was deleted. Returns `None` if it was never tracked.
    ///
    /// A served entry keeps its own watch so that re-creating the file
    /// triggers a rebuild.
    pub fn remove_entry(&mut self, entry: &str) -> Option<Vec<WatchCommand>> {
        let entry = normalize(entry);
        self.removed.insert(entry.clone());
        if !self.graph.contains_entry(&entry) {
            debug!(entry = %entry, "removal of untracked entry ignored");
            return None;
        }

        let rel = display_relative(&self.base_path, &entry);
        info!("Removed entry file: {rel}");

        let diff = self.graph.drop_entry(&entry);
        let mut commands = Vec::new();

        if !diff.released.is_empty() {
            watch_log!(
                self.log_level,
                "Unwatching dependencies: {}",
                display_relative_list(&self.base_path, &diff.released)
            );
            commands.push(WatchCommand::Unwatch {
                root: WatchRoot::Dependencies,
                paths: diff.released,
            });
        }

        if !self.served.contains(&entry) {
            watch_log!(self.log_level, "Unwatching entry: {rel}");
            commands.push(WatchCommand::Unwatch {
                root: WatchRoot::Entries,
                paths: vec![entry],
            });
        }

        Some(commands)
    }

    /// Entries to refresh after `dep` settled on a change.
    pub fn owners_of_changed(&self, dep: &str) -> Vec<String> {
        let owners = self.graph.owners_of(dep);
        if owners.is_empty() {
            debug!(path = %normalize(dep), "change on a path no entry depends on");
        } else {
            info!(
                "Changed dependency file: {}",
                display_relative(&self.base_path, dep)
            );
        }
        owners
    }
}
