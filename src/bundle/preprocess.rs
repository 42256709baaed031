// src/bundle/preprocess.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bundle::options::wants_inline_source_map;
use crate::bundle::sourcemap::append_inline_source_map;
use crate::bundle::{BuildOptions, BuildRequest, Bundler, CacheStore, PathTransform, SourceMap};
use crate::engine::RuntimeEvent;
use crate::errors::{DepwatchError, Result};
use crate::watch::path_utils::{display_relative, normalize_path};

/// The host's view of a file being preprocessed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    /// Path of the entry on disk.
    pub original_path: PathBuf,
    /// Path the processed output is served/written at (set by `preprocess`).
    pub path: PathBuf,
    /// Source map of the selected output, delivered out of band.
    pub source_map: Option<SourceMap>,
}

impl FileDescriptor {
    pub fn new(original_path: impl Into<PathBuf>) -> Self {
        let original_path = original_path.into();
        Self {
            path: original_path.clone(),
            original_path,
            source_map: None,
        }
    }
}

/// Text logged for a failed build: the message, then the cause chain when
/// there is one.
pub fn describe_build_error(err: &anyhow::Error) -> String {
    if err.chain().nth(1).is_some() {
        format!("{err:#}\n\n{err:?}\n")
    } else {
        format!("{err:#}")
    }
}

/// Runs the bundler for one entry at a time.
///
/// Cloning is cheap; clones share the bundler, the cache store and the
/// channel used to report touched files to the watch runtime.
#[derive(Clone)]
pub struct Preprocessor {
    bundler: Arc<dyn Bundler>,
    options: BuildOptions,
    transform: PathTransform,
    cache: Arc<Mutex<CacheStore>>,
    /// `None` in single-run mode: nothing is ever watched.
    reporter: Option<mpsc::Sender<RuntimeEvent>>,
    base_path: PathBuf,
}

impl std::fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preprocessor")
            .field("options", &self.options)
            .field("watching", &self.reporter.is_some())
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl Preprocessor {
    pub fn new(
        bundler: Arc<dyn Bundler>,
        options: BuildOptions,
        cache: Arc<Mutex<CacheStore>>,
        reporter: Option<mpsc::Sender<RuntimeEvent>>,
    ) -> Self {
        Self {
            bundler,
            options,
            transform: PathTransform::identity(),
            cache,
            reporter,
            base_path: PathBuf::from("."),
        }
    }

    pub fn with_transform(mut self, transform: PathTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Directory log paths are shown relative to.
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn inline_source_map(&self) -> bool {
        wants_inline_source_map(&self.options)
    }

    pub fn output_path(&self, input: &Path) -> PathBuf {
        self.transform.apply(input)
    }

    /// Bundle `file` and return the processed code.
    ///
    /// - An empty bundle (no non-asset output) is not an error: `original` is
    ///   returned unchanged.
    /// - A bundler failure is logged and returned as
    ///   [`DepwatchError::Build`]; the dependency graph is left untouched.
    pub async fn preprocess(&self, original: &str, file: &mut FileDescriptor) -> Result<String> {
        let input = normalize_path(&file.original_path);
        let location = display_relative(&self.base_path, &input);
        file.path = self.transform.apply(&file.original_path);

        let request = BuildRequest {
            cache: self.lock_cache().get(&input),
            input,
            options: self.options.clone(),
        };

        match self.run(&request, original, file, &location).await {
            Ok(processed) => Ok(processed),
            Err(err) => {
                error!(
                    "Generated bundle for {} with error: {}",
                    location,
                    describe_build_error(&err)
                );
                Err(DepwatchError::Build {
                    entry: location,
                    message: format!("{err:#}"),
                })
            }
        }
    }

    async fn run(
        &self,
        request: &BuildRequest,
        original: &str,
        file: &mut FileDescriptor,
        location: &str,
    ) -> anyhow::Result<String> {
        let bundle = self.bundler.build(request).await?;
        self.lock_cache().update(&request.input, bundle.cache.clone());

        self.report_watch_files(&bundle.watch_files).await;

        let outputs = self.bundler.generate(&bundle, &self.options).await?;

        info!("Generating bundle for {location}");

        let Some(chunk) = outputs.into_iter().find(|chunk| !chunk.is_asset) else {
            warn!("Generated empty bundle for {location}");
            return Ok(original.to_string());
        };

        let processed = match (&chunk.map, self.inline_source_map()) {
            (Some(map), true) => append_inline_source_map(&chunk.code, map)
                .context("serializing inline source map")?,
            _ => chunk.code,
        };
        file.source_map = chunk.map;

        info!("Generated bundle for {}: {}", location, file.path.display());
        Ok(processed)
    }

    /// Hand the touched files to the watch runtime (watch mode only).
    async fn report_watch_files(&self, watch_files: &[String]) {
        let Some(reporter) = &self.reporter else {
            return;
        };
        let Some((entry, dependencies)) = watch_files.split_first() else {
            debug!("bundler reported no watch files");
            return;
        };

        let event = RuntimeEvent::EntryBuilt {
            entry: entry.clone(),
            dependencies: dependencies.to_vec(),
        };
        if reporter.send(event).await.is_err() {
            debug!("watch runtime stopped; build report dropped");
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, CacheStore> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
