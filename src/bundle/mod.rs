// src/bundle/mod.rs

//! Build invocation.
//!
//! The bundler itself is an external collaborator reached through the
//! [`Bundler`] trait:
//! - [`command`] provides `CommandBundler`, which runs an external bundler
//!   process and speaks JSON over stdin/stdout.
//! - [`cache`] stores the opaque incremental cache per entry.
//! - [`options`] merges global and per-profile build options.
//! - [`sourcemap`] renders source maps as inline data URLs.
//! - [`transform`] maps input paths to output paths.
//! - [`preprocess`] runs one build for one entry and picks the output.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod cache;
pub mod command;
pub mod options;
pub mod preprocess;
pub mod sourcemap;
pub mod transform;

pub use cache::CacheStore;
pub use command::CommandBundler;
pub use options::{BuildOptions, merge_options, wants_inline_source_map};
pub use preprocess::{FileDescriptor, Preprocessor, describe_build_error};
pub use sourcemap::SourceMap;
pub use transform::PathTransform;

/// Opaque incremental state handed from one build of an entry to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildCache(pub Value);

/// Input of a single build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    /// Normalized input path of the entry.
    pub input: String,
    /// Cache returned by the previous build of the same entry.
    pub cache: Option<BuildCache>,
    /// Merged user options (global + profile override).
    pub options: BuildOptions,
}

impl BuildRequest {
    /// The merged option set with `input` and `cache` injected, as handed to
    /// external bundlers.
    pub fn options_with_inputs(&self) -> BuildOptions {
        let mut options = self.options.clone();
        options.insert("input".to_string(), Value::String(self.input.clone()));
        match &self.cache {
            Some(cache) => {
                options.insert("cache".to_string(), cache.0.clone());
            }
            None => {
                options.remove("cache");
            }
        }
        options
    }
}

/// Result of [`Bundler::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub cache: Option<BuildCache>,
    /// Every file the build read. The first element is the entry itself, the
    /// rest are its dependencies in discovery order.
    pub watch_files: Vec<String>,
    /// Bundler-specific payload consumed by [`Bundler::generate`].
    pub artifact: Value,
}

/// One generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputChunk {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub map: Option<SourceMap>,
    /// Static assets are emitted alongside code chunks and never selected.
    #[serde(default)]
    pub is_asset: bool,
}

pub type BundlerFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// The opaque build operation.
///
/// Production code uses [`CommandBundler`]; tests provide in-memory fakes.
pub trait Bundler: Send + Sync {
    /// Build the module graph for `request.input`.
    fn build<'a>(&'a self, request: &'a BuildRequest) -> BundlerFuture<'a, Bundle>;

    /// Produce output artifacts from a successful build.
    fn generate<'a>(
        &'a self,
        bundle: &'a Bundle,
        options: &'a BuildOptions,
    ) -> BundlerFuture<'a, Vec<OutputChunk>>;
}
