// src/watch/events.rs

//! Typed messages flowing between the watch roots, the controller and the
//! runtime shell.

use std::fmt;

/// The two independent watch sets.
///
/// Entries and dependencies are watched separately so that unwatching an
/// entry never drops a dependency that another entry still needs, and the
/// other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchRoot {
    Entries,
    Dependencies,
}

impl fmt::Display for WatchRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchRoot::Entries => f.write_str("entries"),
            WatchRoot::Dependencies => f.write_str("dependencies"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Changed,
    Removed,
}

/// A filesystem notification from one of the watch roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub root: WatchRoot,
    pub kind: WatchEventKind,
    /// Normalized path.
    pub path: String,
}

/// Watch-service call requested by the controller.
///
/// Paths of one build are always batched into a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Watch { root: WatchRoot, paths: Vec<String> },
    Unwatch { root: WatchRoot, paths: Vec<String> },
}
