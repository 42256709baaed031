#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use serde_json::json;
use tokio::sync::{Semaphore, mpsc};

use depwatch::bundle::{
    BuildCache, BuildOptions, BuildRequest, Bundle, Bundler, BundlerFuture, OutputChunk,
    SourceMap,
};
use depwatch::errors::{DepwatchError, Result};
use depwatch::host::FileList;
use depwatch::watch::{WatchBackend, WatchRoots};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A code chunk with no source map.
pub fn code_chunk(code: &str) -> OutputChunk {
    OutputChunk {
        file_name: "bundle.js".to_string(),
        code: code.to_string(),
        map: None,
        is_asset: false,
    }
}

/// A static asset chunk; never selected as the bundle.
pub fn asset_chunk(name: &str) -> OutputChunk {
    OutputChunk {
        file_name: name.to_string(),
        code: String::new(),
        map: None,
        is_asset: true,
    }
}

/// A minimal map pointing at `source`.
pub fn sample_map(source: &str) -> SourceMap {
    SourceMap {
        version: 3,
        file: Some("bundle.js".to_string()),
        sources: vec![source.to_string()],
        sources_content: Vec::new(),
        names: Vec::new(),
        mappings: "AAAA".to_string(),
    }
}

/// One call to [`FakeBundler::build`].
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub input: String,
    pub cache: Option<BuildCache>,
    pub options: BuildOptions,
}

#[derive(Default)]
struct FakeBundlerState {
    dependencies: HashMap<String, Vec<String>>,
    outputs: HashMap<String, Vec<OutputChunk>>,
    failures: HashMap<String, String>,
    builds: Vec<BuildRecord>,
}

/// Scripted in-memory bundler.
///
/// - `watch_files` is the input followed by whatever was set with
///   [`FakeBundler::set_dependencies`].
/// - Without scripted outputs, a build yields one code chunk
///   `/* bundled <input> */`.
/// - The returned cache records the input and how many times it was built,
///   so tests can check that the previous cache is handed back.
#[derive(Clone, Default)]
pub struct FakeBundler {
    state: Arc<Mutex<FakeBundlerState>>,
}

impl FakeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dependencies(&self, input: &str, deps: &[&str]) {
        lock(&self.state).dependencies.insert(
            input.to_string(),
            deps.iter().map(|d| d.to_string()).collect(),
        );
    }

    pub fn set_outputs(&self, input: &str, outputs: Vec<OutputChunk>) {
        lock(&self.state).outputs.insert(input.to_string(), outputs);
    }

    pub fn fail(&self, input: &str, message: &str) {
        lock(&self.state)
            .failures
            .insert(input.to_string(), message.to_string());
    }

    pub fn succeed(&self, input: &str) {
        lock(&self.state).failures.remove(input);
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        lock(&self.state).builds.clone()
    }

    pub fn builds_of(&self, input: &str) -> Vec<BuildRecord> {
        lock(&self.state)
            .builds
            .iter()
            .filter(|b| b.input == input)
            .cloned()
            .collect()
    }

    fn build_now(&self, request: &BuildRequest) -> anyhow::Result<Bundle> {
        let mut state = lock(&self.state);
        state.builds.push(BuildRecord {
            input: request.input.clone(),
            cache: request.cache.clone(),
            options: request.options.clone(),
        });
        let build_no = state
            .builds
            .iter()
            .filter(|b| b.input == request.input)
            .count();

        if let Some(message) = state.failures.get(&request.input) {
            return Err(anyhow!("{message}"));
        }

        let mut watch_files = vec![request.input.clone()];
        watch_files.extend(
            state
                .dependencies
                .get(&request.input)
                .cloned()
                .unwrap_or_default(),
        );

        let outputs = state
            .outputs
            .get(&request.input)
            .cloned()
            .unwrap_or_else(|| vec![code_chunk(&format!("/* bundled {} */", request.input))]);

        Ok(Bundle {
            cache: Some(BuildCache(json!({ "input": request.input, "build": build_no }))),
            watch_files,
            artifact: serde_json::to_value(outputs)?,
        })
    }
}

impl Bundler for FakeBundler {
    fn build<'a>(&'a self, request: &'a BuildRequest) -> BundlerFuture<'a, Bundle> {
        Box::pin(async move { self.build_now(request) })
    }

    fn generate<'a>(
        &'a self,
        bundle: &'a Bundle,
        _options: &'a BuildOptions,
    ) -> BundlerFuture<'a, Vec<OutputChunk>> {
        Box::pin(async move { Ok(serde_json::from_value(bundle.artifact.clone())?) })
    }
}

/// Call received by a [`RecordingWatchBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCall {
    Watch(Vec<String>),
    Unwatch(Vec<String>),
    Close,
}

/// Watch backend that only records calls. Clones share the log, so one clone
/// can be boxed into `WatchRoots` while the test keeps the other.
#[derive(Clone, Default)]
pub struct RecordingWatchBackend {
    calls: Arc<Mutex<Vec<WatchCall>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent watch/unwatch call fail (after recording it).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<WatchCall> {
        lock(&self.calls).clone()
    }

    /// Paths currently watched, replaying the recorded calls.
    pub fn watched(&self) -> BTreeSet<String> {
        let mut watched = BTreeSet::new();
        for call in lock(&self.calls).iter() {
            match call {
                WatchCall::Watch(paths) => watched.extend(paths.iter().cloned()),
                WatchCall::Unwatch(paths) => {
                    for p in paths {
                        watched.remove(p);
                    }
                }
                WatchCall::Close => watched.clear(),
            }
        }
        watched
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.calls).contains(&WatchCall::Close)
    }

    fn record(&self, call: WatchCall) -> Result<()> {
        lock(&self.calls).push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DepwatchError::Watch("recording backend set to fail".to_string()));
        }
        Ok(())
    }
}

impl WatchBackend for RecordingWatchBackend {
    fn watch(&mut self, paths: &[String]) -> Result<()> {
        self.record(WatchCall::Watch(paths.to_vec()))
    }

    fn unwatch(&mut self, paths: &[String]) -> Result<()> {
        self.record(WatchCall::Unwatch(paths.to_vec()))
    }

    fn close(&mut self) {
        if !self.is_closed() {
            lock(&self.calls).push(WatchCall::Close);
        }
    }
}

/// `WatchRoots` over two recording backends, plus handles to inspect them.
pub fn recording_roots() -> (WatchRoots, RecordingWatchBackend, RecordingWatchBackend) {
    let entries = RecordingWatchBackend::new();
    let dependencies = RecordingWatchBackend::new();
    let roots = WatchRoots::new(Box::new(entries.clone()), Box::new(dependencies.clone()));
    (roots, entries, dependencies)
}

/// File list that records `mark_changed` calls.
///
/// Each call is also sent on the channel returned by the constructor so
/// tests can wait for it. A held list blocks every call until
/// [`RecordingFileList::release`] hands out permits, which lets a test keep
/// a refresh cycle in flight.
pub struct RecordingFileList {
    files: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    notify: mpsc::UnboundedSender<String>,
    gate: Option<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingFileList {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::with_gate(None)
    }

    pub fn held() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::with_gate(Some(Semaphore::new(0)))
    }

    fn with_gate(gate: Option<Semaphore>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (notify, rx) = mpsc::unbounded_channel();
        let list = Arc::new(Self {
            files: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            notify,
            gate,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        (list, rx)
    }

    /// Set the entries reported by `files()`; read when the runtime starts.
    pub fn serve(&self, files: &[&str]) {
        *lock(&self.files) = files.iter().map(|f| f.to_string()).collect();
    }

    /// Let `n` blocked (or future) calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl FileList for RecordingFileList {
    fn files(&self) -> Vec<String> {
        lock(&self.files).clone()
    }

    fn mark_changed<'a>(
        &'a self,
        path: &'a str,
        _is_rebuild: bool,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            lock(&self.calls).push(path.to_string());
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            let _ = self.notify.send(path.to_string());

            if let Some(gate) = &self.gate {
                gate.acquire()
                    .await
                    .map_err(|e| DepwatchError::Other(e.into()))?
                    .forget();
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
