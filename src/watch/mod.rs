// src/watch/mod.rs

//! File watching for entries and their dependencies.
//!
//! This module is responsible for:
//! - canonicalising paths and spotting virtual modules ([`path_utils`]),
//! - turning dependency graph diffs into watch/unwatch commands
//!   ([`controller`]),
//! - collapsing bursts of events per path ([`debounce`]),
//! - wiring up a cross-platform filesystem watcher (`notify`) behind the
//!   [`WatchBackend`] trait ([`backend`], [`watcher`]).
//!
//! It does **not** decide when entries are rebuilt; the engine does that.

pub mod backend;
pub mod controller;
pub mod debounce;
pub mod events;
pub mod path_utils;
pub mod watcher;

pub use backend::{WatchBackend, WatchRoots};
pub use controller::WatchController;
pub use debounce::Debouncer;
pub use events::{WatchCommand, WatchEvent, WatchEventKind, WatchRoot};
pub use path_utils::{is_virtual, normalize};
pub use watcher::NotifyWatchRoot;
