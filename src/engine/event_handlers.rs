// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::debug;

use crate::engine::coalescer::RefreshCoalescer;
use crate::watch::{WatchCommand, WatchController, normalize};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Apply a watch/unwatch call to one of the watch roots.
    Watch(WatchCommand),
    /// Start a refresh cycle: mark every entry changed, then report
    /// `RefreshCompleted`.
    StartRefresh(Vec<String>),
    /// Drop the incremental build cache of a removed entry.
    EvictCache(String),
    /// Close both watch roots (shutdown).
    CloseWatchers,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

fn watch_commands(commands: Vec<WatchCommand>) -> Vec<CoreCommand> {
    commands.into_iter().map(CoreCommand::Watch).collect()
}

fn refresh(snapshot: Option<Vec<String>>) -> Vec<CoreCommand> {
    snapshot.map(CoreCommand::StartRefresh).into_iter().collect()
}

/// The host announced its entries: watch them all up front.
pub fn handle_entries_served(controller: &mut WatchController, entries: &[String]) -> CoreStep {
    CoreStep::running(watch_commands(controller.serve_entries(entries)))
}

/// A build succeeded: sync watches with the reported dependency list.
///
/// A report that arrives after its entry was deleted only drops the cache
/// the build left behind.
pub fn handle_entry_built(
    controller: &mut WatchController,
    entry: &str,
    dependencies: &[String],
) -> CoreStep {
    if controller.is_removed(entry) {
        debug!(entry = %entry, "build report for a removed entry dropped");
        return CoreStep::running(vec![CoreCommand::EvictCache(normalize(entry))]);
    }
    CoreStep::running(watch_commands(controller.record_build(entry, dependencies)))
}

/// The entry file itself changed on disk.
///
/// Served entries are refreshed even if they never built successfully.
pub fn handle_entry_changed(
    controller: &mut WatchController,
    coalescer: &mut RefreshCoalescer,
    entry: &str,
) -> CoreStep {
    controller.entry_changed(entry);
    if !controller.refreshes_on_change(entry) {
        return CoreStep::running(Vec::new());
    }
    CoreStep::running(refresh(coalescer.request([normalize(entry)])))
}

/// The entry file was deleted: unwatch it and everything only it needed.
pub fn handle_entry_removed(
    controller: &mut WatchController,
    coalescer: &mut RefreshCoalescer,
    entry: &str,
) -> CoreStep {
    let Some(commands) = controller.remove_entry(entry) else {
        return CoreStep::running(Vec::new());
    };

    let entry = normalize(entry);
    coalescer.forget(&entry);

    let mut commands = watch_commands(commands);
    commands.push(CoreCommand::EvictCache(entry));
    CoreStep::running(commands)
}

/// A dependency settled after a change: refresh every entry that owns it.
pub fn handle_dependency_changed(
    controller: &WatchController,
    coalescer: &mut RefreshCoalescer,
    path: &str,
) -> CoreStep {
    let owners = controller.owners_of_changed(path);
    if owners.is_empty() {
        return CoreStep::running(Vec::new());
    }
    CoreStep::running(refresh(coalescer.request(owners)))
}

/// Every `mark_changed` of the running cycle finished.
pub fn handle_refresh_completed(coalescer: &mut RefreshCoalescer) -> CoreStep {
    CoreStep::running(refresh(coalescer.finish_cycle()))
}
