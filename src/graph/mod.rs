// src/graph/mod.rs

//! Entry / dependency bookkeeping.
//!
//! - [`dependencies`] holds the bidirectional entry <-> dependency index with
//!   per-dependency reference counts.
//! - [`diff`] describes what changed after an entry's dependency list was
//!   replaced, which the watch controller turns into watch/unwatch calls.

pub mod dependencies;
pub mod diff;

pub use dependencies::DependencyGraph;
pub use diff::DependencyDiff;
