// src/graph/diff.rs

/// Result of replacing one entry's dependency list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDiff {
    /// Dependencies that had no owner before this update (need a watch).
    pub added: Vec<String>,
    /// Dependencies this entry no longer references.
    pub removed: Vec<String>,
    /// Subset of `removed` that no entry references any more (need an unwatch).
    pub released: Vec<String>,
}

impl DependencyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
