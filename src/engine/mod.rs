// src/engine/mod.rs

//! Orchestration engine for watch mode.
//!
//! This module ties together:
//! - the watch controller (dependency graph -> watch commands)
//! - the refresh coalescer (at most one refresh cycle in flight)
//! - the runtime event loop that reacts to:
//!   - the host's list of served entries
//!   - build reports from the preprocessor
//!   - debounced filesystem events
//!   - refresh cycle completions
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

/// Events flowing into the runtime from preprocessors, watchers and refresh
/// cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// The host serves these entries: keep them watched for the whole
    /// session, whatever their build outcome.
    EntriesServed { entries: Vec<String> },
    /// A build of `entry` succeeded and read `dependencies`.
    EntryBuilt {
        entry: String,
        dependencies: Vec<String>,
    },
    /// The entry file itself changed (debounced).
    EntryChanged { entry: String },
    /// The entry file was deleted.
    EntryRemoved { entry: String },
    /// A dependency file changed or disappeared (debounced).
    DependencyChanged { path: String },
    /// The in-flight refresh cycle finished.
    RefreshCompleted,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Runtime options for the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Quiet window for filesystem events on the same path.
    pub batch_delay: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            batch_delay: Duration::from_millis(250),
        }
    }
}

pub mod coalescer;
pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use coalescer::{RefreshCoalescer, RefreshState};
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Runtime, RuntimeChannels};
