// src/graph/dependencies.rs

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::graph::diff::DependencyDiff;
use crate::watch::path_utils::{is_virtual, normalize};

/// Per-dependency record: which entries currently depend on this path.
///
/// The reference count is the size of the owner set; an entry that lists the
/// same dependency twice still owns it once.
#[derive(Debug, Clone, Default)]
struct DependencyRecord {
    owners: BTreeSet<String>,
}

/// Bidirectional index between entries and the files they were built from.
///
/// `entries` maps an entry to its ordered dependency list as last reported by
/// the bundler; `dependencies` maps each dependency back to its owners. Every
/// public method leaves the two maps as exact duals of each other, and none of
/// them suspends, so callers can treat an update as atomic.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    entries: HashMap<String, Vec<String>>,
    dependencies: HashMap<String, DependencyRecord>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dependency list of `entry` and report the difference.
    ///
    /// Paths are normalized, virtual modules are skipped and duplicates are
    /// collapsed keeping first-seen order.
    pub fn set_dependencies<I, S>(&mut self, entry: &str, new_deps: I) -> DependencyDiff
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = normalize(entry);
        let new_deps = dedup_real_paths(new_deps);
        let new_set: HashSet<&str> = new_deps.iter().map(String::as_str).collect();

        let old_deps = self.entries.get(&entry).cloned().unwrap_or_default();
        let old_set: HashSet<&str> = old_deps.iter().map(String::as_str).collect();

        let mut diff = DependencyDiff::default();

        for dep in old_deps.iter().filter(|d| !new_set.contains(d.as_str())) {
            diff.removed.push(dep.clone());
            if self.release(&entry, dep) {
                diff.released.push(dep.clone());
            }
        }

        for dep in new_deps.iter().filter(|d| !old_set.contains(d.as_str())) {
            let record = self.dependencies.entry(dep.clone()).or_default();
            record.owners.insert(entry.clone());
            if record.owners.len() == 1 {
                diff.added.push(dep.clone());
            }
        }

        debug!(
            entry = %entry,
            added = diff.added.len(),
            removed = diff.removed.len(),
            released = diff.released.len(),
            "updated dependency graph"
        );

        self.entries.insert(entry, new_deps);
        diff
    }

    /// Forget `entry` entirely, releasing all of its dependencies.
    pub fn drop_entry(&mut self, entry: &str) -> DependencyDiff {
        let diff = self.set_dependencies(entry, std::iter::empty::<&str>());
        self.entries.remove(&normalize(entry));
        diff
    }

    /// Drop `entry` from `dep`'s owners. Returns true when nobody owns `dep`
    /// any more and its record has been deleted.
    fn release(&mut self, entry: &str, dep: &str) -> bool {
        let Some(record) = self.dependencies.get_mut(dep) else {
            return false;
        };
        record.owners.remove(entry);
        if record.owners.is_empty() {
            self.dependencies.remove(dep);
            true
        } else {
            false
        }
    }

    pub fn contains_entry(&self, entry: &str) -> bool {
        self.entries.contains_key(&normalize(entry))
    }

    /// Current ordered dependency list of `entry`.
    pub fn dependencies_of(&self, entry: &str) -> &[String] {
        self.entries
            .get(&normalize(entry))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Entries that currently depend on `dep`, in sorted order.
    pub fn owners_of(&self, dep: &str) -> Vec<String> {
        self.dependencies
            .get(&normalize(dep))
            .map(|r| r.owners.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of entries depending on `dep` (0 if untracked).
    pub fn ref_count(&self, dep: &str) -> usize {
        self.dependencies
            .get(&normalize(dep))
            .map_or(0, |r| r.owners.len())
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dependencies.is_empty()
    }

    /// Check that the owner sets stored per dependency equal the owner sets
    /// reconstructed from the entry lists.
    pub fn is_consistent(&self) -> bool {
        let mut rebuilt: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for (entry, deps) in &self.entries {
            for dep in deps {
                rebuilt.entry(dep.as_str()).or_default().insert(entry.as_str());
            }
        }

        rebuilt.len() == self.dependencies.len()
            && self.dependencies.iter().all(|(dep, record)| {
                !record.owners.is_empty()
                    && rebuilt.get(dep.as_str()).is_some_and(|owners| {
                        owners.len() == record.owners.len()
                            && record.owners.iter().all(|o| owners.contains(o.as_str()))
                    })
            })
    }
}

fn dedup_real_paths<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| !is_virtual(p))
        .map(normalize)
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
