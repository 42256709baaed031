// src/engine/runtime.rs

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::bundle::CacheStore;
use crate::errors::Result;
use crate::host::FileList;
use crate::watch::{Debouncer, WatchEvent, WatchEventKind, WatchRoot, WatchRoots};

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, RuntimeOptions};

/// Channel ends the runtime owns.
///
/// `event_tx` is kept so refresh cycles can report `RefreshCompleted`;
/// preprocessors and signal handlers hold their own clones.
#[derive(Debug)]
pub struct RuntimeChannels {
    pub event_tx: mpsc::Sender<RuntimeEvent>,
    pub event_rx: mpsc::Receiver<RuntimeEvent>,
    pub watch_rx: mpsc::UnboundedReceiver<WatchEvent>,
}

enum Next {
    Event(Option<RuntimeEvent>),
    Watch(Option<WatchEvent>),
    Settled,
}

/// Drives the watch core in response to `RuntimeEvent`s and filesystem
/// events, and carries out the commands it returns.
///
/// All state changes happen in [`CoreRuntime::step`], called from this single
/// loop, so no two events are ever applied concurrently. Refresh cycles run
/// in a spawned task and report back with `RefreshCompleted`.
pub struct Runtime<F: FileList + 'static> {
    core: CoreRuntime,
    channels: RuntimeChannels,
    roots: WatchRoots,
    debouncer: Debouncer<(WatchRoot, String)>,
    /// Entries whose latest pending event was a removal.
    removals: HashSet<String>,
    cache: Arc<Mutex<CacheStore>>,
    file_list: Arc<F>,
    in_flight: Option<JoinHandle<()>>,
}

impl<F: FileList + 'static> fmt::Debug for Runtime<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl<F: FileList + 'static> Runtime<F> {
    pub fn new(
        core: CoreRuntime,
        channels: RuntimeChannels,
        roots: WatchRoots,
        cache: Arc<Mutex<CacheStore>>,
        file_list: Arc<F>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            core,
            channels,
            roots,
            debouncer: Debouncer::new(options.batch_delay),
            removals: HashSet::new(),
            cache,
            file_list,
            in_flight: None,
        }
    }

    /// Main event loop. Returns after `ShutdownRequested` once both watch
    /// roots are closed and any in-flight refresh cycle has finished.
    pub async fn run(mut self) -> Result<()> {
        info!(
            batch_delay_ms = self.debouncer.delay().as_millis() as u64,
            "watch runtime started"
        );

        let served = self.file_list.files();
        self.apply(RuntimeEvent::EntriesServed { entries: served });

        let mut watch_open = true;

        loop {
            let deadline = self.debouncer.next_deadline();
            // Far-future placeholder; the branch is disabled when nothing is pending.
            let wake_at = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            let next = tokio::select! {
                event = self.channels.event_rx.recv() => Next::Event(event),
                event = self.channels.watch_rx.recv(), if watch_open => Next::Watch(event),
                _ = sleep_until(wake_at), if deadline.is_some() => Next::Settled,
            };

            let keep_running = match next {
                Next::Event(Some(event)) => self.apply(event),
                Next::Event(None) => {
                    info!("runtime event channel closed; exiting");
                    false
                }
                Next::Watch(Some(event)) => self.on_watch_event(event),
                Next::Watch(None) => {
                    debug!("watch event channel closed");
                    watch_open = false;
                    true
                }
                Next::Settled => self.flush_settled(),
            };

            if !keep_running {
                break;
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Feed one event into the core and execute the resulting commands.
    fn apply(&mut self, event: RuntimeEvent) -> bool {
        debug!(?event, "runtime received event");
        let step = self.core.step(event);
        for command in step.commands {
            self.execute(command);
        }
        step.keep_running
    }

    fn execute(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::Watch(command) => self.roots.execute(command),
            CoreCommand::StartRefresh(entries) => self.spawn_refresh(entries),
            CoreCommand::EvictCache(entry) => {
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .evict(&entry);
            }
            CoreCommand::CloseWatchers => self.roots.close(),
        }
    }

    /// Every event waits for its path to go quiet. For entries the last
    /// event kind is remembered, since an editor's atomic save shows up as a
    /// removal followed by a re-creation.
    fn on_watch_event(&mut self, event: WatchEvent) -> bool {
        if event.root == WatchRoot::Entries {
            match event.kind {
                WatchEventKind::Removed => self.removals.insert(event.path.clone()),
                WatchEventKind::Changed => self.removals.remove(&event.path),
            };
        }
        self.debouncer.push((event.root, event.path), Instant::now());
        true
    }

    fn flush_settled(&mut self) -> bool {
        for (root, path) in self.debouncer.take_due(Instant::now()) {
            let event = match root {
                WatchRoot::Entries => self.settled_entry_event(path),
                WatchRoot::Dependencies => RuntimeEvent::DependencyChanged { path },
            };
            if !self.apply(event) {
                return false;
            }
        }
        true
    }

    /// A removal only counts if the file is still gone once the path is quiet.
    fn settled_entry_event(&mut self, entry: String) -> RuntimeEvent {
        if self.removals.remove(&entry) && !Path::new(&entry).exists() {
            RuntimeEvent::EntryRemoved { entry }
        } else {
            RuntimeEvent::EntryChanged { entry }
        }
    }

    /// Mark every entry of the snapshot changed, concurrently, then report
    /// completion back to the loop.
    fn spawn_refresh(&mut self, entries: Vec<String>) {
        let file_list = Arc::clone(&self.file_list);
        let done_tx = self.channels.event_tx.clone();

        self.in_flight = Some(tokio::spawn(async move {
            let mut set = JoinSet::new();
            for entry in entries {
                let file_list = Arc::clone(&file_list);
                set.spawn(async move {
                    debug!(entry = %entry, "Refresh entries");
                    let result = file_list.mark_changed(&entry, true).await;
                    (entry, result)
                });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => {}
                    Ok((entry, Err(err))) => {
                        warn!(entry = %entry, error = %err, "refresh of entry failed");
                    }
                    Err(err) => warn!(error = %err, "refresh task panicked"),
                }
            }

            if done_tx.send(RuntimeEvent::RefreshCompleted).await.is_err() {
                debug!("runtime gone before refresh completion was reported");
            }
        }));
    }

    async fn shutdown(self) {
        let Runtime {
            mut roots,
            channels,
            in_flight,
            ..
        } = self;

        // Idempotent; CloseWatchers has normally closed them already.
        roots.close();

        // Stop accepting events so late build reports fail fast instead of
        // filling the channel.
        drop(channels);

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("waiting for in-flight refresh to finish");
            }
            if let Err(err) = handle.await {
                warn!(error = %err, "in-flight refresh task failed");
            }
        }

        info!("watch runtime stopped");
    }
}
