// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (dependency graph + refresh coalescer)
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels and debouncing filesystem events
//! - applying watch commands to the watch roots
//! - running refresh cycles against the file list
//! - handling shutdown
//!
//! Because `step` never suspends, each event's graph update is atomic with
//! respect to every other event.

use crate::engine::coalescer::RefreshCoalescer;
use crate::engine::event_handlers::{
    handle_dependency_changed, handle_entries_served, handle_entry_built, handle_entry_changed,
    handle_entry_removed, handle_refresh_completed, CoreCommand, CoreStep,
};
use crate::engine::RuntimeEvent;
use crate::watch::WatchController;

#[derive(Debug)]
pub struct CoreRuntime {
    controller: WatchController,
    coalescer: RefreshCoalescer,
}

impl CoreRuntime {
    pub fn new(controller: WatchController) -> Self {
        Self {
            controller,
            coalescer: RefreshCoalescer::new(),
        }
    }

    pub fn controller(&self) -> &WatchController {
        &self.controller
    }

    pub fn coalescer(&self) -> &RefreshCoalescer {
        &self.coalescer
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::EntriesServed { entries } => {
                handle_entries_served(&mut self.controller, &entries)
            }
            RuntimeEvent::EntryBuilt {
                entry,
                dependencies,
            } => handle_entry_built(&mut self.controller, &entry, &dependencies),
            RuntimeEvent::EntryChanged { entry } => {
                handle_entry_changed(&mut self.controller, &mut self.coalescer, &entry)
            }
            RuntimeEvent::EntryRemoved { entry } => {
                handle_entry_removed(&mut self.controller, &mut self.coalescer, &entry)
            }
            RuntimeEvent::DependencyChanged { path } => {
                handle_dependency_changed(&self.controller, &mut self.coalescer, &path)
            }
            RuntimeEvent::RefreshCompleted => handle_refresh_completed(&mut self.coalescer),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: vec![CoreCommand::CloseWatchers],
                keep_running: false,
            },
        }
    }
}
