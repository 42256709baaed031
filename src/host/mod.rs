// src/host/mod.rs

//! The host pipeline around the preprocessor.
//!
//! - [`FileList`] is how a refresh cycle tells the host that an entry must be
//!   re-acquired (and therefore re-bundled).
//! - [`entries`] resolves `[[entry]]` globs to concrete entry files.
//! - [`writer`] is the standalone host used by the `depwatch` binary: it
//!   preprocesses entries and writes the bundles to disk.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub mod entries;
pub mod writer;

pub use entries::{ResolvedEntry, resolve_entries};
pub use writer::BundleWriter;

/// The host's list of served files.
pub trait FileList: Send + Sync {
    /// Entry files the host serves. They are watched for the whole session.
    fn files(&self) -> Vec<String>;

    /// Mark `path` as changed so the host re-acquires (re-bundles) it.
    ///
    /// The returned future completes once the host has finished with the
    /// file, so a refresh cycle can wait for all of its entries.
    fn mark_changed<'a>(
        &'a self,
        path: &'a str,
        is_rebuild: bool,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
