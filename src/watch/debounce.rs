// src/watch/debounce.rs

//! Per-key debounce table.
//!
//! Every event for a key pushes that key's deadline to `now + delay`. The
//! owner polls [`Debouncer::next_deadline`] to know how long to sleep and
//! collects settled keys with [`Debouncer::take_due`]. A key that keeps
//! receiving events never fires until it has been quiet for a full window,
//! and then fires exactly once.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<K> {
    delay: Duration,
    deadlines: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an event for `key`, restarting its quiet window.
    pub fn push(&mut self, key: K, now: Instant) {
        self.deadlines.insert(key, now + self.delay);
    }

    /// Earliest pending deadline, if any key is waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every key whose window has elapsed, oldest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
