// src/engine/coalescer.rs

use std::collections::BTreeSet;

use tracing::{debug, warn};

/// Whether a refresh cycle is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Serialises refresh cycles.
///
/// Semantics:
/// - Requests are merged into a single pending set (a set, so an entry that
///   changes several times before the next cycle starts is refreshed once).
/// - While idle, a request immediately becomes the snapshot for a new cycle.
/// - While refreshing, a request only grows the pending set. When the cycle
///   finishes, [`RefreshCoalescer::finish_cycle`] hands out whatever piled up
///   as the next snapshot, or returns to idle.
///
/// So at most one cycle is in flight, and every request is covered by a cycle
/// that starts after it was made.
#[derive(Debug)]
pub struct RefreshCoalescer {
    state: RefreshState,
    pending: BTreeSet<String>,
    cycles_started: u64,
}

impl Default for RefreshCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoalescer {
    pub fn new() -> Self {
        Self {
            state: RefreshState::Idle,
            pending: BTreeSet::new(),
            cycles_started: 0,
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RefreshState::Idle
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    /// Merge `entries` into the pending set.
    ///
    /// Returns the snapshot to dispatch if this request started a new cycle.
    pub fn request<I, S>(&mut self, entries: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(entries.into_iter().map(Into::into));

        match self.state {
            RefreshState::Refreshing => {
                debug!(pending = self.pending.len(), "refresh in flight; request merged");
                None
            }
            RefreshState::Idle => self.start_cycle(),
        }
    }

    /// Called once every entry of the current snapshot has been handled.
    ///
    /// Returns the next snapshot if requests arrived during the cycle.
    pub fn finish_cycle(&mut self) -> Option<Vec<String>> {
        if self.state == RefreshState::Idle {
            warn!("refresh cycle finished while coalescer was idle");
            return None;
        }

        let next = self.start_cycle();
        if next.is_none() {
            debug!("refresh settled; coalescer idle");
        }
        next
    }

    /// Drop `entry` from the pending set (e.g. its file was deleted).
    pub fn forget(&mut self, entry: &str) -> bool {
        self.pending.remove(entry)
    }

    fn start_cycle(&mut self) -> Option<Vec<String>> {
        if self.pending.is_empty() {
            self.state = RefreshState::Idle;
            return None;
        }

        self.state = RefreshState::Refreshing;
        self.cycles_started += 1;
        let snapshot: Vec<String> = std::mem::take(&mut self.pending).into_iter().collect();
        debug!(
            cycle = self.cycles_started,
            entries = snapshot.len(),
            "starting refresh cycle"
        );
        Some(snapshot)
    }
}
