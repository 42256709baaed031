// src/session.rs

//! Wiring shared by the binary and embedders.
//!
//! A [`Session`] owns the incremental cache store and, in watch mode, the
//! channels and watch roots the runtime needs. In single-run mode it creates
//! no watch root at all and the preprocessors it hands out never report
//! touched files.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::bundle::{BuildOptions, Bundler, CacheStore, PathTransform, Preprocessor};
use crate::engine::{CoreRuntime, Runtime, RuntimeChannels, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::host::FileList;
use crate::types::{RunMode, WatchLogLevel};
use crate::watch::{NotifyWatchRoot, WatchController, WatchEvent, WatchRoot, WatchRoots};

/// Capacity of the runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

struct WatchParts {
    channels: RuntimeChannels,
    roots: WatchRoots,
}

pub struct Session {
    mode: RunMode,
    cache: Arc<Mutex<CacheStore>>,
    watch: Option<WatchParts>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("watching", &self.watch.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session; `make_roots` is only called in watch mode.
    pub fn new<R>(mode: RunMode, make_roots: R) -> Result<Self>
    where
        R: FnOnce(mpsc::UnboundedSender<WatchEvent>) -> Result<WatchRoots>,
    {
        let watch = match mode {
            RunMode::SingleRun => {
                debug!("single-run mode: watching disabled");
                None
            }
            RunMode::Watch => {
                let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
                let (watch_tx, watch_rx) = mpsc::unbounded_channel();
                let roots = make_roots(watch_tx)?;
                Some(WatchParts {
                    channels: RuntimeChannels {
                        event_tx,
                        event_rx,
                        watch_rx,
                    },
                    roots,
                })
            }
        };

        Ok(Self {
            mode,
            cache: Arc::new(Mutex::new(CacheStore::new())),
            watch,
        })
    }

    /// Session backed by `notify` watchers.
    pub fn with_notify(mode: RunMode) -> Result<Self> {
        Self::new(mode, |watch_tx| {
            let entries = NotifyWatchRoot::new(WatchRoot::Entries, watch_tx.clone())?;
            let dependencies = NotifyWatchRoot::new(WatchRoot::Dependencies, watch_tx)?;
            Ok(WatchRoots::new(Box::new(entries), Box::new(dependencies)))
        })
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    pub fn cache(&self) -> Arc<Mutex<CacheStore>> {
        Arc::clone(&self.cache)
    }

    /// Sender into the runtime (e.g. for `ShutdownRequested`), watch mode only.
    pub fn event_sender(&self) -> Option<mpsc::Sender<RuntimeEvent>> {
        self.watch.as_ref().map(|w| w.channels.event_tx.clone())
    }

    /// A preprocessor sharing this session's cache and build reporting.
    pub fn preprocessor(
        &self,
        bundler: Arc<dyn Bundler>,
        options: BuildOptions,
        transform: PathTransform,
        base_path: impl Into<PathBuf>,
    ) -> Preprocessor {
        Preprocessor::new(bundler, options, self.cache(), self.event_sender())
            .with_transform(transform)
            .with_base_path(base_path)
    }

    /// Build the watch runtime. `None` in single-run mode.
    pub fn into_runtime<F: FileList + 'static>(
        self,
        log_watch: WatchLogLevel,
        base_path: impl Into<PathBuf>,
        file_list: Arc<F>,
        options: RuntimeOptions,
    ) -> Option<Runtime<F>> {
        let WatchParts { channels, roots } = self.watch?;
        let core = CoreRuntime::new(WatchController::new(log_watch, base_path));
        Some(Runtime::new(
            core, channels, roots, self.cache, file_list, options,
        ))
    }
}
