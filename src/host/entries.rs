// src/host/entries.rs

use std::collections::BTreeMap;
use std::path::Path;

use globset::Glob;
use tracing::debug;

use crate::config::model::EntryConfig;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::path_utils::normalize_path;

/// An entry file together with the profile it is bundled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Normalized absolute path.
    pub path: String,
    pub profile: Option<String>,
}

/// Expand `[[entry]]` patterns below `base`.
///
/// A file matched by several entries takes the profile of the last one, so
/// specific patterns listed after broad ones override them. The result is
/// sorted by path.
pub fn resolve_entries(
    fs: &dyn FileSystem,
    base: &Path,
    specs: &[EntryConfig],
) -> Result<Vec<ResolvedEntry>> {
    let matchers = specs
        .iter()
        .map(|spec| -> Result<_> { Ok((Glob::new(&spec.pattern)?.compile_matcher(), spec)) })
        .collect::<Result<Vec<_>>>()?;

    let mut resolved: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut stack = vec![base.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
                continue;
            }
            if !fs.is_file(&path) {
                continue;
            }
            let Ok(rel) = path.strip_prefix(base) else {
                continue;
            };
            let rel = normalize_path(rel);

            for (matcher, spec) in &matchers {
                if matcher.is_match(&rel) {
                    resolved.insert(normalize_path(&path), spec.profile.clone());
                }
            }
        }
    }

    debug!(count = resolved.len(), "resolved entry files");

    Ok(resolved
        .into_iter()
        .map(|(path, profile)| ResolvedEntry { path, profile })
        .collect())
}
